#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;

use flow_rpc_client::codec::{
    Address, Block, OnChainAccount, OnChainAccountKey, Transaction, TransactionResult,
    TransactionStatus, Value, ACCOUNT_CREATED_EVENT, ACCOUNT_KEY_WEIGHT_THRESHOLD,
};
use flow_rpc_client::codec::Event;
use flow_rpc_client::{Gateway, RpcError};
use piccolo_files::{FileLocation, FlowNetwork, NetworkManifest, ProjectManifest};
use serde_json::json;

pub const SERVICE_ADDRESS: &str = "0xf8d6e0586b0a20c7";
pub const NEW_ACCOUNT_ADDRESS: &str = "0x179b6b1cb6755e31";

pub fn load_fixture(name: &str) -> (ProjectManifest, NetworkManifest) {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(name);
    path.push("Piccolo.toml");

    let manifest = ProjectManifest::from_location(&FileLocation::from_path(path)).unwrap();
    let network_location = manifest
        .get_network_manifest_location(&FlowNetwork::Emulator)
        .unwrap();
    let network_manifest =
        NetworkManifest::from_location(&network_location, &FlowNetwork::Emulator).unwrap();
    (manifest, network_manifest)
}

pub fn default_account_key() -> OnChainAccountKey {
    OnChainAccountKey {
        index: 0,
        public_key: vec![0; 64],
        sequence_number: 0,
        weight: ACCOUNT_KEY_WEIGHT_THRESHOLD,
        revoked: false,
    }
}

/// In-memory access node: keeps per-account contract state, applies the
/// effect of each submitted transaction, and tracks every call so tests
/// can assert that validation failures never reach the network.
pub struct MockGateway {
    pub accounts: RefCell<BTreeMap<Address, OnChainAccount>>,
    pub sent: RefCell<Vec<Transaction>>,
    pub calls: RefCell<Vec<&'static str>>,
    results: RefCell<BTreeMap<String, TransactionResult>>,
    forced_error: RefCell<Option<String>>,
}

impl MockGateway {
    pub fn new() -> MockGateway {
        MockGateway {
            accounts: RefCell::new(BTreeMap::new()),
            sent: RefCell::new(vec![]),
            calls: RefCell::new(vec![]),
            results: RefCell::new(BTreeMap::new()),
            forced_error: RefCell::new(None),
        }
    }

    pub fn with_account(self, address: &str, contracts: &[(&str, &str)]) -> MockGateway {
        let address = Address::from_hex(address).unwrap();
        let mut contract_map = BTreeMap::new();
        for (name, code) in contracts.iter() {
            contract_map.insert(name.to_string(), code.as_bytes().to_vec());
        }
        self.accounts.borrow_mut().insert(
            address,
            OnChainAccount {
                address,
                balance: 0,
                keys: vec![default_account_key()],
                contracts: contract_map,
            },
        );
        self
    }

    pub fn contract_code(&self, address: &str, name: &str) -> Option<String> {
        let address = Address::from_hex(address).unwrap();
        self.accounts
            .borrow()
            .get(&address)
            .and_then(|account| account.contracts.get(name).cloned())
            .map(|code| String::from_utf8(code).unwrap())
    }

    pub fn set_contract_code(&self, address: &str, name: &str, code: &str) {
        let address = Address::from_hex(address).unwrap();
        let mut accounts = self.accounts.borrow_mut();
        let account = accounts.get_mut(&address).unwrap();
        account
            .contracts
            .insert(name.to_string(), code.as_bytes().to_vec());
    }

    pub fn force_execution_error(&self, message: &str) {
        *self.forced_error.borrow_mut() = Some(message.to_string());
    }

    pub fn sent_count(&self) -> usize {
        self.sent.borrow().len()
    }

    fn sealed_result() -> TransactionResult {
        TransactionResult {
            status: TransactionStatus::Sealed,
            error_message: None,
            events: vec![],
        }
    }

    fn apply_effects(&self, tx_id: &str, transaction: &Transaction) {
        let script = String::from_utf8_lossy(&transaction.script).to_string();
        let mut accounts = self.accounts.borrow_mut();

        if script.contains("AuthAccount(payer: signer)") {
            let address = Address::from_hex(NEW_ACCOUNT_ADDRESS).unwrap();
            let mut contracts = BTreeMap::new();
            if let Some(Value::Dictionary(entries)) = transaction.arguments.get(1) {
                for (name, code) in entries.iter() {
                    if let (Value::String(name), Value::String(code)) = (name, code) {
                        contracts.insert(name.clone(), hex::decode(code).unwrap());
                    }
                }
            }
            accounts.insert(
                address,
                OnChainAccount {
                    address,
                    balance: 0,
                    keys: vec![default_account_key()],
                    contracts,
                },
            );
            self.results.borrow_mut().insert(
                tx_id.to_string(),
                TransactionResult {
                    status: TransactionStatus::Sealed,
                    error_message: None,
                    events: vec![Event {
                        event_type: ACCOUNT_CREATED_EVENT.to_string(),
                        payload: json!({
                            "fields": [
                                { "name": "address", "value": { "type": "Address", "value": NEW_ACCOUNT_ADDRESS } }
                            ]
                        }),
                    }],
                },
            );
            return;
        }

        let account = match accounts.get_mut(&transaction.payer) {
            Some(account) => account,
            None => return,
        };

        if script.contains("contracts.remove") {
            if let Some(Value::String(name)) = transaction.arguments.first() {
                account.contracts.remove(name);
            }
        } else if script.contains("contracts.add") || script.contains("update__experimental") {
            if let (Some(Value::String(name)), Some(Value::String(code))) = (
                transaction.arguments.first(),
                transaction.arguments.get(1),
            ) {
                account
                    .contracts
                    .insert(name.clone(), hex::decode(code).unwrap());
            }
        }
    }
}

impl Gateway for MockGateway {
    fn get_account(&self, address: &Address) -> Result<OnChainAccount, RpcError> {
        self.calls.borrow_mut().push("get_account");
        self.accounts
            .borrow()
            .get(address)
            .cloned()
            .ok_or_else(|| RpcError::Message(format!("account {} not found", address)))
    }

    fn get_latest_block(&self) -> Result<Block, RpcError> {
        self.calls.borrow_mut().push("get_latest_block");
        Ok(Block {
            id: "0101010101010101".to_string(),
            height: 1,
        })
    }

    fn send_signed_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        self.calls.borrow_mut().push("send_signed_transaction");
        let tx_id = format!("tx-{}", self.sent.borrow().len());

        if let Some(proposal_key) = &transaction.proposal_key {
            let mut accounts = self.accounts.borrow_mut();
            if let Some(account) = accounts.get_mut(&proposal_key.address) {
                for key in account.keys.iter_mut() {
                    if key.index == proposal_key.key_index {
                        key.sequence_number += 1;
                    }
                }
            }
        }

        if let Some(message) = self.forced_error.borrow_mut().take() {
            self.results.borrow_mut().insert(
                tx_id.clone(),
                TransactionResult {
                    status: TransactionStatus::Sealed,
                    error_message: Some(message),
                    events: vec![],
                },
            );
        } else {
            self.apply_effects(&tx_id, transaction);
        }

        self.sent.borrow_mut().push(transaction.clone());
        Ok(tx_id)
    }

    fn get_transaction_result(
        &self,
        transaction_id: &str,
        _wait_for_seal: bool,
    ) -> Result<TransactionResult, RpcError> {
        self.calls.borrow_mut().push("get_transaction_result");
        Ok(self
            .results
            .borrow_mut()
            .remove(transaction_id)
            .unwrap_or_else(MockGateway::sealed_result))
    }

    fn execute_script(&self, _script: &str, _arguments: Vec<Value>) -> Result<Value, RpcError> {
        self.calls.borrow_mut().push("execute_script");
        Ok(Value::Bool(true))
    }
}
