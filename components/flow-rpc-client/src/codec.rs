use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use sha3::Sha3_256;

/// Domain separation tag mixed into every transaction envelope before
/// hashing, padded to 32 bytes.
pub const TRANSACTION_DOMAIN_TAG: &str = "FLOW-V0.0-transaction";

pub const ACCOUNT_CREATED_EVENT: &str = "flow.AccountCreated";

pub const ACCOUNT_KEY_WEIGHT_THRESHOLD: u32 = 1000;

pub const DEFAULT_GAS_LIMIT: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 8]);

impl Address {
    pub fn from_hex(hex_str: &str) -> Result<Address, String> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)
            .map_err(|e| format!("unable to parse address {} ({})", hex_str, e))?;
        if bytes.len() != 8 {
            return Err(format!(
                "unable to parse address {} (expected 8 bytes, got {})",
                hex_str,
                bytes.len()
            ));
        }
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes);
        Ok(Address(buf))
    }

    pub fn to_bytes(self) -> [u8; 8] {
        self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Address, D::Error>
    where
        D: Deserializer<'de>,
    {
        let container: String = serde::Deserialize::deserialize(deserializer)?;
        Address::from_hex(&container).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    pub fn from_str(value: &str) -> Result<SignatureAlgorithm, String> {
        match value {
            "secp256k1" | "ECDSA_secp256k1" => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            _ => Err(format!(
                "unable to parse signature algorithm {} (value supported: secp256k1)",
                value
            )),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::EcdsaSecp256k1 => write!(f, "secp256k1"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha3_256,
}

impl HashAlgorithm {
    pub fn from_str(value: &str) -> Result<HashAlgorithm, String> {
        match value {
            "sha2-256" | "SHA2_256" => Ok(HashAlgorithm::Sha2_256),
            "sha3-256" | "SHA3_256" => Ok(HashAlgorithm::Sha3_256),
            _ => Err(format!(
                "unable to parse hash algorithm {} (values supported: sha2-256, sha3-256)",
                value
            )),
        }
    }

    pub fn digest(&self, message: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha2_256 => {
                let mut hasher = Sha256::new();
                hasher.update(message);
                hasher.finalize().to_vec()
            }
            HashAlgorithm::Sha3_256 => {
                let mut hasher = Sha3_256::new();
                hasher.update(message);
                hasher.finalize().to_vec()
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha2_256 => write!(f, "sha2-256"),
            HashAlgorithm::Sha3_256 => write!(f, "sha3-256"),
        }
    }
}

/// An account key to be registered on-chain.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountKey {
    pub public_key: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub hash_algorithm: HashAlgorithm,
    pub weight: u32,
}

impl AccountKey {
    pub fn validate(&self) -> Result<(), String> {
        if self.public_key.len() != 64 {
            return Err(format!(
                "public key must be 64 bytes, got {}",
                self.public_key.len()
            ));
        }
        if self.weight > ACCOUNT_KEY_WEIGHT_THRESHOLD {
            return Err(format!(
                "key weight {} exceeds the weight threshold {}",
                self.weight, ACCOUNT_KEY_WEIGHT_THRESHOLD
            ));
        }
        Ok(())
    }

    /// Hex blob consumed by the account creation transaction: raw public
    /// key followed by algorithm identifiers and the weight.
    pub fn encoded(&self) -> String {
        let mut buf = self.public_key.clone();
        buf.push(match self.signature_algorithm {
            SignatureAlgorithm::EcdsaSecp256k1 => 2,
        });
        buf.push(match self.hash_algorithm {
            HashAlgorithm::Sha2_256 => 1,
            HashAlgorithm::Sha3_256 => 3,
        });
        buf.extend_from_slice(&self.weight.to_be_bytes());
        hex::encode(buf)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnChainAccountKey {
    pub index: u32,
    pub public_key: Vec<u8>,
    pub sequence_number: u64,
    pub weight: u32,
    pub revoked: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnChainAccount {
    pub address: Address,
    pub balance: u64,
    pub keys: Vec<OnChainAccountKey>,
    pub contracts: BTreeMap<String, Vec<u8>>,
}

impl OnChainAccount {
    pub fn key_at_index(&self, index: u32) -> Option<&OnChainAccountKey> {
        self.keys.iter().find(|k| k.index == index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalKey {
    pub address: Address,
    pub key_index: u32,
    pub sequence_number: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSignature {
    pub address: Address,
    pub key_index: u32,
    pub signature: Vec<u8>,
}

/// A transaction envelope. Built once, then mutated through a fixed
/// sequence (reference block, proposal key, signature) before submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub script: Vec<u8>,
    pub arguments: Vec<Value>,
    pub reference_block_id: String,
    pub gas_limit: u64,
    pub proposal_key: Option<ProposalKey>,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl Transaction {
    pub fn new(
        script: Vec<u8>,
        arguments: Vec<Value>,
        payer: Address,
        authorizers: Vec<Address>,
    ) -> Transaction {
        Transaction {
            script,
            arguments,
            reference_block_id: String::new(),
            gas_limit: DEFAULT_GAS_LIMIT,
            proposal_key: None,
            payer,
            authorizers,
            envelope_signatures: vec![],
        }
    }

    pub fn set_reference_block(&mut self, block: &Block) {
        self.reference_block_id = block.id.clone();
    }

    pub fn set_proposal_key(&mut self, address: Address, key_index: u32, sequence_number: u64) {
        self.proposal_key = Some(ProposalKey {
            address,
            key_index,
            sequence_number,
        });
    }

    /// Canonical byte encoding of the envelope, hashed and signed by the
    /// proposer. The proposal key must be assigned first.
    pub fn signable_message(&self) -> Result<Vec<u8>, String> {
        let proposal_key = self
            .proposal_key
            .as_ref()
            .ok_or("transaction proposal key must be set before signing")?;

        let mut buf = vec![];
        buf.extend_from_slice(&padded_domain_tag());
        write_bytes(&mut buf, &self.script);
        write_u32(&mut buf, self.arguments.len() as u32);
        for argument in self.arguments.iter() {
            write_bytes(&mut buf, argument.to_json().to_string().as_bytes());
        }
        write_bytes(&mut buf, self.reference_block_id.as_bytes());
        write_u64(&mut buf, self.gas_limit);
        buf.extend_from_slice(&proposal_key.address.to_bytes());
        write_u32(&mut buf, proposal_key.key_index);
        write_u64(&mut buf, proposal_key.sequence_number);
        buf.extend_from_slice(&self.payer.to_bytes());
        write_u32(&mut buf, self.authorizers.len() as u32);
        for authorizer in self.authorizers.iter() {
            buf.extend_from_slice(&authorizer.to_bytes());
        }
        Ok(buf)
    }
}

fn padded_domain_tag() -> [u8; 32] {
    let mut tag = [0u8; 32];
    tag[..TRANSACTION_DOMAIN_TAG.len()].copy_from_slice(TRANSACTION_DOMAIN_TAG.as_bytes());
    tag
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(buf, bytes.len() as u32);
    buf.extend_from_slice(bytes);
}

fn write_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn write_u64(buf: &mut Vec<u8>, value: u64) {
    buf.extend_from_slice(&value.to_be_bytes());
}

/// A Cadence value, encoded on the wire in the JSON interchange format
/// (`{"type": ..., "value": ...}`, numbers carried as strings).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Bool(bool),
    Int(i64),
    UInt64(u64),
    Address(Address),
    Array(Vec<Value>),
    Dictionary(Vec<(Value, Value)>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::UInt64(_) => "UInt64",
            Value::Address(_) => "Address",
            Value::Array(_) => "Array",
            Value::Dictionary(_) => "Dictionary",
        }
    }

    pub fn to_json(&self) -> JsonValue {
        let value = match self {
            Value::String(s) => JsonValue::String(s.clone()),
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(i) => JsonValue::String(i.to_string()),
            Value::UInt64(u) => JsonValue::String(u.to_string()),
            Value::Address(a) => JsonValue::String(a.to_string()),
            Value::Array(values) => {
                JsonValue::Array(values.iter().map(|v| v.to_json()).collect())
            }
            Value::Dictionary(entries) => JsonValue::Array(
                entries
                    .iter()
                    .map(|(k, v)| json!({ "key": k.to_json(), "value": v.to_json() }))
                    .collect(),
            ),
        };
        json!({ "type": self.type_name(), "value": value })
    }

    pub fn from_json(json: &JsonValue) -> Result<Value, String> {
        let value_type = json
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or("unable to parse value (missing type)")?;
        let value = json
            .get("value")
            .ok_or("unable to parse value (missing value)")?;

        match value_type {
            "String" => Ok(Value::String(
                value
                    .as_str()
                    .ok_or("unable to parse String value")?
                    .to_string(),
            )),
            "Bool" => Ok(Value::Bool(
                value.as_bool().ok_or("unable to parse Bool value")?,
            )),
            "Int" => {
                let raw = value.as_str().ok_or("unable to parse Int value")?;
                raw.parse::<i64>()
                    .map(Value::Int)
                    .map_err(|e| format!("unable to parse Int value {} ({})", raw, e))
            }
            "UInt64" => {
                let raw = value.as_str().ok_or("unable to parse UInt64 value")?;
                raw.parse::<u64>()
                    .map(Value::UInt64)
                    .map_err(|e| format!("unable to parse UInt64 value {} ({})", raw, e))
            }
            "Address" => {
                let raw = value.as_str().ok_or("unable to parse Address value")?;
                Address::from_hex(raw).map(Value::Address)
            }
            "Array" => {
                let entries = value.as_array().ok_or("unable to parse Array value")?;
                let mut values = vec![];
                for entry in entries.iter() {
                    values.push(Value::from_json(entry)?);
                }
                Ok(Value::Array(values))
            }
            "Dictionary" => {
                let entries = value.as_array().ok_or("unable to parse Dictionary value")?;
                let mut values = vec![];
                for entry in entries.iter() {
                    let key = entry
                        .get("key")
                        .ok_or("unable to parse Dictionary entry (missing key)")?;
                    let value = entry
                        .get("value")
                        .ok_or("unable to parse Dictionary entry (missing value)")?;
                    values.push((Value::from_json(key)?, Value::from_json(value)?));
                }
                Ok(Value::Dictionary(values))
            }
            _ => Err(format!("unsupported value type {}", value_type)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Finalized,
    Executed,
    Sealed,
    Expired,
}

impl TransactionStatus {
    pub fn from_str(value: &str) -> Result<TransactionStatus, String> {
        match value {
            "Pending" => Ok(TransactionStatus::Pending),
            "Finalized" => Ok(TransactionStatus::Finalized),
            "Executed" => Ok(TransactionStatus::Executed),
            "Sealed" => Ok(TransactionStatus::Sealed),
            "Expired" => Ok(TransactionStatus::Expired),
            _ => Err(format!("unable to parse transaction status {}", value)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub payload: JsonValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionResult {
    pub status: TransactionStatus,
    pub error_message: Option<String>,
    pub events: Vec<Event>,
}

impl TransactionResult {
    /// Addresses emitted by account creation events in this result.
    pub fn created_addresses(&self) -> Vec<Address> {
        let mut addresses = vec![];
        for event in self.events.iter() {
            if event.event_type != ACCOUNT_CREATED_EVENT {
                continue;
            }
            let fields = match event.payload.get("fields").and_then(|f| f.as_array()) {
                Some(fields) => fields,
                None => continue,
            };
            for field in fields.iter() {
                if field.get("name").and_then(|n| n.as_str()) != Some("address") {
                    continue;
                }
                if let Some(raw) = field
                    .get("value")
                    .and_then(|v| v.get("value"))
                    .and_then(|v| v.as_str())
                {
                    if let Ok(address) = Address::from_hex(raw) {
                        addresses.push(address);
                    }
                }
            }
        }
        addresses
    }
}
