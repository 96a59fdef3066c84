use flow_rpc_client::codec::{
    AccountKey, Address, HashAlgorithm, OnChainAccount, SignatureAlgorithm, Transaction,
    TransactionResult, Value, ACCOUNT_KEY_WEIGHT_THRESHOLD,
};
use flow_rpc_client::crypto::{parse_public_key, AccountSigner};
use flow_rpc_client::Gateway;
use piccolo_files::{AccountConfig, FlowNetwork, NetworkManifest, ProjectManifest};

use crate::program::Program;
use crate::types::Script;
use crate::{collect_network_contracts, DeploymentError, ImportReplacer};

const CREATE_ACCOUNT_TEMPLATE: &str = r#"
transaction(publicKeys: [String], contracts: {String: String}) {
    prepare(signer: AuthAccount) {
        let account = AuthAccount(payer: signer)
        for key in publicKeys {
            account.addPublicKey(key.decodeHex())
        }
        for name in contracts.keys {
            account.contracts.add(name: name, code: contracts[name]!.decodeHex())
        }
    }
}
"#;

const ADD_CONTRACT_TEMPLATE: &str = r#"
transaction(name: String, code: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.add(name: name, code: code.decodeHex())
    }
}
"#;

const UPDATE_CONTRACT_TEMPLATE: &str = r#"
transaction(name: String, code: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.update__experimental(name: name, code: code.decodeHex())
    }
}
"#;

const REMOVE_CONTRACT_TEMPLATE: &str = r#"
transaction(name: String) {
    prepare(signer: AuthAccount) {
        signer.contracts.remove(name: name)
    }
}
"#;

/// The write operations this tool issues, consumed by one
/// transaction-building stage so every variant shares the same
/// prepare/sign/submit/await sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountTransaction {
    CreateAccount {
        keys: Vec<AccountKey>,
        contracts: Vec<(String, String)>,
    },
    AddContract {
        name: String,
        source: String,
        args: Vec<Value>,
    },
    UpdateContract {
        name: String,
        source: String,
    },
    RemoveContract {
        name: String,
    },
}

impl AccountTransaction {
    pub fn into_transaction(self, signer: Address) -> Transaction {
        match self {
            AccountTransaction::CreateAccount { keys, contracts } => {
                let keys = Value::Array(
                    keys.iter()
                        .map(|key| Value::String(key.encoded()))
                        .collect(),
                );
                let contracts = Value::Dictionary(
                    contracts
                        .into_iter()
                        .map(|(name, source)| {
                            (Value::String(name), Value::String(hex::encode(source)))
                        })
                        .collect(),
                );
                Transaction::new(
                    CREATE_ACCOUNT_TEMPLATE.as_bytes().to_vec(),
                    vec![keys, contracts],
                    signer,
                    vec![signer],
                )
            }
            AccountTransaction::AddContract { name, source, args } => {
                let mut arguments = vec![
                    Value::String(name),
                    Value::String(hex::encode(source)),
                ];
                arguments.extend(args);
                Transaction::new(
                    ADD_CONTRACT_TEMPLATE.as_bytes().to_vec(),
                    arguments,
                    signer,
                    vec![signer],
                )
            }
            AccountTransaction::UpdateContract { name, source } => Transaction::new(
                UPDATE_CONTRACT_TEMPLATE.as_bytes().to_vec(),
                vec![Value::String(name), Value::String(hex::encode(source))],
                signer,
                vec![signer],
            ),
            AccountTransaction::RemoveContract { name } => Transaction::new(
                REMOVE_CONTRACT_TEMPLATE.as_bytes().to_vec(),
                vec![Value::String(name)],
                signer,
                vec![signer],
            ),
        }
    }
}

/// Account mutations for one network, driven through the shared
/// transaction pipeline. Every method blocks until its round trips
/// complete; nothing is retried.
pub struct AccountOperations<'a, G: Gateway> {
    gateway: &'a G,
    manifest: &'a ProjectManifest,
    network_manifest: &'a NetworkManifest,
    network: FlowNetwork,
}

impl<'a, G: Gateway> AccountOperations<'a, G> {
    pub fn new(
        gateway: &'a G,
        manifest: &'a ProjectManifest,
        network_manifest: &'a NetworkManifest,
        network: FlowNetwork,
    ) -> Self {
        AccountOperations {
            gateway,
            manifest,
            network_manifest,
            network,
        }
    }

    pub fn get_account(&self, address: &Address) -> Result<OnChainAccount, DeploymentError> {
        self.gateway
            .get_account(address)
            .map_err(DeploymentError::Rpc)
    }

    /// Creates a new account holding the given keys and optional initial
    /// contracts (`name:path` argument strings). Key material is
    /// validated before any network call. Returns the account fetched
    /// back from the chain.
    pub fn create_account(
        &self,
        signer: &AccountConfig,
        public_keys: Vec<String>,
        key_weights: Vec<u32>,
        signature_algorithms: Vec<SignatureAlgorithm>,
        hash_algorithms: Vec<HashAlgorithm>,
        contract_args: Vec<String>,
    ) -> Result<OnChainAccount, DeploymentError> {
        if !key_weights.is_empty() && public_keys.len() != key_weights.len() {
            return Err(DeploymentError::KeyCountMismatch {
                keys: public_keys.len(),
                weights: key_weights.len(),
            });
        }

        let mut keys = vec![];
        for (i, public_key) in public_keys.iter().enumerate() {
            let weight = key_weights
                .get(i)
                .copied()
                .unwrap_or(ACCOUNT_KEY_WEIGHT_THRESHOLD);
            let key = AccountKey {
                public_key: parse_public_key(public_key).map_err(DeploymentError::InvalidKey)?,
                signature_algorithm: signature_algorithms.get(i).copied().ok_or_else(|| {
                    DeploymentError::InvalidKey(format!("missing signature algorithm for key {}", i))
                })?,
                hash_algorithm: hash_algorithms.get(i).copied().ok_or_else(|| {
                    DeploymentError::InvalidKey(format!("missing hash algorithm for key {}", i))
                })?,
                weight,
            };
            key.validate().map_err(DeploymentError::InvalidKey)?;
            keys.push(key);
        }

        let mut contracts = vec![];
        if !contract_args.is_empty() {
            let base_location = self
                .manifest
                .get_project_root_location()
                .map_err(DeploymentError::Config)?;
            for contract_arg in contract_args.iter() {
                let (name, path) = contract_arg.split_once(':').ok_or_else(|| {
                    DeploymentError::MalformedContractArgument(contract_arg.clone())
                })?;
                let mut contract_location = base_location.clone();
                contract_location
                    .append_path(path)
                    .map_err(DeploymentError::Config)?;
                let source = contract_location
                    .read_content_as_utf8()
                    .map_err(DeploymentError::Config)?;
                contracts.push((name.to_string(), source));
            }
        }

        let signer_address = signer.parsed_address().map_err(DeploymentError::Config)?;
        let transaction =
            AccountTransaction::CreateAccount { keys, contracts }.into_transaction(signer_address);

        let account_signer = signer.signer().map_err(DeploymentError::Config)?;
        let transaction = self.prepare_transaction(transaction, &account_signer)?;
        let (_tx_id, result) = self.send_transaction(transaction)?;

        let created = result.created_addresses();
        let address = created.first().ok_or_else(|| {
            DeploymentError::Execution("new account address couldn't be fetched".to_string())
        })?;

        self.get_account(address)
    }

    /// Deploys a contract to the account, updating it when
    /// `update_existing` is set. Returns the transaction id and whether
    /// the contract was updated rather than created.
    pub fn add_contract(
        &self,
        account: &AccountConfig,
        script: &Script,
        update_existing: bool,
    ) -> Result<(String, bool), DeploymentError> {
        let mut program = Program::new(&script.location, &script.source);
        if program.has_imports() {
            let contracts =
                collect_network_contracts(self.manifest, self.network_manifest, &self.network)?;
            let aliases = self.manifest.aliases_for_network(&self.network);
            let import_replacer = ImportReplacer::new(&contracts, &aliases)?;
            program = import_replacer.replace(&program)?;
        }

        let name = program.name().map_err(DeploymentError::Config)?;
        let target_address = account.parsed_address().map_err(DeploymentError::Config)?;

        let on_chain_account = self.get_account(&target_address)?;
        let existing = on_chain_account.contracts.get(&name);
        match existing {
            Some(code) if code.as_slice() == program.source().as_bytes() => {
                return Err(DeploymentError::ContractNoDiff { name });
            }
            Some(_) if !update_existing => {
                return Err(DeploymentError::ContractAlreadyExists {
                    name,
                    account: account.label.clone(),
                });
            }
            _ => {}
        }
        let updating = existing.is_some();

        let operation = if updating {
            AccountTransaction::UpdateContract {
                name: name.clone(),
                source: program.source().to_string(),
            }
        } else {
            AccountTransaction::AddContract {
                name: name.clone(),
                source: program.source().to_string(),
                args: script.args.clone(),
            }
        };

        let account_signer = account.signer().map_err(DeploymentError::Config)?;
        let transaction = operation.into_transaction(target_address);
        let transaction = self.prepare_transaction(transaction, &account_signer)?;
        let (tx_id, _result) = self.send_transaction(transaction)?;

        Ok((tx_id, updating))
    }

    /// Removes a named contract from the account. Fails before any
    /// submission when the account does not hold it.
    pub fn remove_contract(
        &self,
        account: &AccountConfig,
        contract_name: &str,
    ) -> Result<String, DeploymentError> {
        let target_address = account.parsed_address().map_err(DeploymentError::Config)?;

        let on_chain_account = self.get_account(&target_address)?;
        if !on_chain_account.contracts.contains_key(contract_name) {
            return Err(DeploymentError::ContractNotFound {
                name: contract_name.to_string(),
                available: on_chain_account.contracts.keys().cloned().collect(),
            });
        }

        let account_signer = account.signer().map_err(DeploymentError::Config)?;
        let transaction = AccountTransaction::RemoveContract {
            name: contract_name.to_string(),
        }
        .into_transaction(target_address);
        let transaction = self.prepare_transaction(transaction, &account_signer)?;
        let (tx_id, _result) = self.send_transaction(transaction)?;

        Ok(tx_id)
    }

    /// Completes a transaction for submission: latest sealed block as
    /// reference, the proposer key's current sequence number, then the
    /// envelope signature. The sequence number is fetched fresh per
    /// transaction.
    pub fn prepare_transaction(
        &self,
        mut transaction: Transaction,
        signer: &AccountSigner,
    ) -> Result<Transaction, DeploymentError> {
        let block = self
            .gateway
            .get_latest_block()
            .map_err(DeploymentError::Rpc)?;
        let proposer = self
            .gateway
            .get_account(&signer.address)
            .map_err(DeploymentError::Rpc)?;

        let key = proposer.key_at_index(signer.key_index).ok_or_else(|| {
            DeploymentError::InvalidKey(format!(
                "account {} has no key at index {}",
                signer.address, signer.key_index
            ))
        })?;
        if key.revoked {
            return Err(DeploymentError::InvalidKey(format!(
                "key {} of account {} is revoked",
                signer.key_index, signer.address
            )));
        }

        transaction.set_reference_block(&block);
        transaction.set_proposal_key(signer.address, key.index, key.sequence_number);
        signer
            .sign_transaction(&mut transaction)
            .map_err(DeploymentError::InvalidKey)?;

        Ok(transaction)
    }

    /// Submits a signed envelope and blocks until it is sealed. A
    /// chain-reported execution error is surfaced as the pipeline's
    /// result.
    pub fn send_transaction(
        &self,
        transaction: Transaction,
    ) -> Result<(String, TransactionResult), DeploymentError> {
        let tx_id = self
            .gateway
            .send_signed_transaction(&transaction)
            .map_err(DeploymentError::Rpc)?;

        let result = self
            .gateway
            .get_transaction_result(&tx_id, true)
            .map_err(DeploymentError::Rpc)?;

        if let Some(error) = &result.error_message {
            return Err(DeploymentError::Execution(error.clone()));
        }

        Ok((tx_id, result))
    }
}
