use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value as JsonValue;

use crate::codec::{
    Address, Block, Event, OnChainAccount, OnChainAccountKey, Transaction, TransactionResult,
    TransactionStatus, Value,
};
use crate::Gateway;

/// Seconds between two status checks while waiting for a seal.
const DELAY_BETWEEN_SEAL_CHECKS: u64 = 1;

#[derive(Debug)]
pub enum RpcError {
    Generic,
    StatusCode(u16),
    Message(String),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self {
            RpcError::Message(e) => write!(f, "{}", e),
            RpcError::StatusCode(e) => write!(f, "error status code {}", e),
            RpcError::Generic => write!(f, "unknown error"),
        }
    }
}

pub struct FlowRpc {
    pub url: String,
    pub client: Client,
}

#[derive(Debug)]
pub struct PostTransactionResult {
    pub tx_id: String,
}

#[derive(Deserialize, Debug)]
struct AccountResponse {
    address: String,
    balance: String,
    keys: Vec<AccountKeyResponse>,
    #[serde(default)]
    contracts: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct AccountKeyResponse {
    index: String,
    public_key: String,
    sequence_number: String,
    weight: String,
    #[serde(default)]
    revoked: bool,
}

#[derive(Deserialize, Debug)]
struct BlockResponse {
    header: BlockHeaderResponse,
}

#[derive(Deserialize, Debug)]
struct BlockHeaderResponse {
    id: String,
    height: String,
}

#[derive(Deserialize, Debug)]
struct TransactionResultResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    events: Vec<EventResponse>,
}

#[derive(Deserialize, Debug)]
struct EventResponse {
    #[serde(rename = "type")]
    event_type: String,
    payload: String,
}

#[derive(Deserialize, Debug)]
struct SendTransactionResponse {
    id: String,
}

#[derive(Deserialize, Debug)]
struct ExecuteScriptResponse {
    value: String,
}

impl FlowRpc {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.into(),
            client: Client::builder().build().unwrap(),
        }
    }

    pub fn get_account(&self, address: &Address) -> Result<OnChainAccount, RpcError> {
        let request_url = format!(
            "{}/v1/accounts/{}?expand=contracts,keys",
            self.url, address
        );

        let res: AccountResponse = self
            .client
            .get(request_url)
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?
            .json()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        let mut keys = vec![];
        for key in res.keys.iter() {
            keys.push(OnChainAccountKey {
                index: parse_number(&key.index)? as u32,
                public_key: hex::decode(key.public_key.trim_start_matches("0x"))
                    .map_err(|e| RpcError::Message(e.to_string()))?,
                sequence_number: parse_number(&key.sequence_number)?,
                weight: parse_number(&key.weight)? as u32,
                revoked: key.revoked,
            });
        }

        let mut contracts = BTreeMap::new();
        for (name, code) in res.contracts.iter() {
            let decoded = base64::decode(code).map_err(|e| RpcError::Message(e.to_string()))?;
            contracts.insert(name.clone(), decoded);
        }

        Ok(OnChainAccount {
            address: Address::from_hex(&res.address).map_err(RpcError::Message)?,
            balance: parse_number(&res.balance)?,
            keys,
            contracts,
        })
    }

    pub fn get_latest_block(&self) -> Result<Block, RpcError> {
        let request_url = format!("{}/v1/blocks?height=sealed", self.url);

        let res: Vec<BlockResponse> = self
            .client
            .get(request_url)
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?
            .json()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        let block = res.into_iter().next().ok_or(RpcError::Generic)?;
        Ok(Block {
            id: block.header.id,
            height: parse_number(&block.header.height)?,
        })
    }

    pub fn post_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<PostTransactionResult, RpcError> {
        let payload = transaction_to_payload(transaction);
        let path = format!("{}/v1/transactions", self.url);
        let res = self
            .client
            .post(path)
            .json(&payload)
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let err = match res.text() {
                Ok(message) if !message.is_empty() => RpcError::Message(message),
                _ => RpcError::StatusCode(status),
            };
            return Err(err);
        }

        let response: SendTransactionResponse =
            res.json().map_err(|e| RpcError::Message(e.to_string()))?;
        Ok(PostTransactionResult { tx_id: response.id })
    }

    pub fn get_transaction_result(
        &self,
        transaction_id: &str,
        wait_for_seal: bool,
    ) -> Result<TransactionResult, RpcError> {
        loop {
            let request_url = format!("{}/v1/transaction_results/{}", self.url, transaction_id);

            let res: TransactionResultResponse = self
                .client
                .get(request_url)
                .send()
                .map_err(|e| RpcError::Message(e.to_string()))?
                .json()
                .map_err(|e| RpcError::Message(e.to_string()))?;

            let status = TransactionStatus::from_str(&res.status).map_err(RpcError::Message)?;
            if wait_for_seal
                && !matches!(status, TransactionStatus::Sealed | TransactionStatus::Expired)
            {
                std::thread::sleep(Duration::from_secs(DELAY_BETWEEN_SEAL_CHECKS));
                continue;
            }

            let mut events = vec![];
            for event in res.events.iter() {
                let decoded =
                    base64::decode(&event.payload).map_err(|e| RpcError::Message(e.to_string()))?;
                let payload: JsonValue = serde_json::from_slice(&decoded)
                    .map_err(|e| RpcError::Message(e.to_string()))?;
                events.push(Event {
                    event_type: event.event_type.clone(),
                    payload,
                });
            }

            return Ok(TransactionResult {
                status,
                error_message: res.error_message.filter(|m| !m.is_empty()),
                events,
            });
        }
    }

    pub fn execute_script(&self, script: &str, arguments: Vec<Value>) -> Result<Value, RpcError> {
        let path = format!("{}/v1/scripts", self.url);
        let encoded_arguments = arguments
            .iter()
            .map(|a| base64::encode(a.to_json().to_string()))
            .collect::<Vec<_>>();

        let res = self
            .client
            .post(path)
            .json(&json!({
                "script": base64::encode(script),
                "arguments": encoded_arguments,
            }))
            .send()
            .map_err(|e| RpcError::Message(e.to_string()))?;

        if !res.status().is_success() {
            let error = match res.text() {
                Ok(message) => RpcError::Message(message),
                _ => RpcError::Generic,
            };
            return Err(error);
        }

        let response: ExecuteScriptResponse =
            res.json().map_err(|e| RpcError::Message(e.to_string()))?;
        let decoded = base64::decode(&response.value).map_err(|e| RpcError::Message(e.to_string()))?;
        let json: JsonValue =
            serde_json::from_slice(&decoded).map_err(|e| RpcError::Message(e.to_string()))?;
        Value::from_json(&json).map_err(RpcError::Message)
    }
}

fn parse_number(raw: &str) -> Result<u64, RpcError> {
    raw.parse::<u64>()
        .map_err(|e| RpcError::Message(format!("unable to parse number {} ({})", raw, e)))
}

fn transaction_to_payload(transaction: &Transaction) -> JsonValue {
    let arguments = transaction
        .arguments
        .iter()
        .map(|a| base64::encode(a.to_json().to_string()))
        .collect::<Vec<_>>();

    let proposal_key = transaction.proposal_key.as_ref().map(|p| {
        json!({
            "address": p.address.to_string(),
            "key_index": p.key_index.to_string(),
            "sequence_number": p.sequence_number.to_string(),
        })
    });

    let envelope_signatures = transaction
        .envelope_signatures
        .iter()
        .map(|s| {
            json!({
                "address": s.address.to_string(),
                "key_index": s.key_index.to_string(),
                "signature": base64::encode(&s.signature),
            })
        })
        .collect::<Vec<_>>();

    json!({
        "script": base64::encode(&transaction.script),
        "arguments": arguments,
        "reference_block_id": transaction.reference_block_id,
        "gas_limit": transaction.gas_limit.to_string(),
        "proposal_key": proposal_key,
        "payer": transaction.payer.to_string(),
        "authorizers": transaction
            .authorizers
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>(),
        "envelope_signatures": envelope_signatures,
    })
}

impl Gateway for FlowRpc {
    fn get_account(&self, address: &Address) -> Result<OnChainAccount, RpcError> {
        FlowRpc::get_account(self, address)
    }

    fn get_latest_block(&self) -> Result<Block, RpcError> {
        FlowRpc::get_latest_block(self)
    }

    fn send_signed_transaction(&self, transaction: &Transaction) -> Result<String, RpcError> {
        FlowRpc::post_transaction(self, transaction).map(|res| res.tx_id)
    }

    fn get_transaction_result(
        &self,
        transaction_id: &str,
        wait_for_seal: bool,
    ) -> Result<TransactionResult, RpcError> {
        FlowRpc::get_transaction_result(self, transaction_id, wait_for_seal)
    }

    fn execute_script(&self, script: &str, arguments: Vec<Value>) -> Result<Value, RpcError> {
        FlowRpc::execute_script(self, script, arguments)
    }
}
