use std::collections::BTreeMap;
use std::fmt;

use flow_rpc_client::codec::{Address, HashAlgorithm, SignatureAlgorithm};
use flow_rpc_client::crypto::AccountSigner;
use toml::Value;

use super::FileLocation;

pub const DEFAULT_EMULATOR_RPC_ADDRESS: &str = "http://127.0.0.1:8888";
pub const DEFAULT_TESTNET_RPC_ADDRESS: &str = "https://rest-testnet.onflow.org";
pub const DEFAULT_MAINNET_RPC_ADDRESS: &str = "https://rest-mainnet.onflow.org";

pub const DEFAULT_SIGNATURE_ALGORITHM: &str = "secp256k1";
pub const DEFAULT_HASH_ALGORITHM: &str = "sha3-256";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowNetwork {
    Emulator,
    Testnet,
    Mainnet,
}

impl FlowNetwork {
    pub fn from_str(value: &str) -> Result<FlowNetwork, String> {
        match value {
            "emulator" => Ok(FlowNetwork::Emulator),
            "testnet" => Ok(FlowNetwork::Testnet),
            "mainnet" => Ok(FlowNetwork::Mainnet),
            _ => Err(format!(
                "unable to parse network {} (values supported: emulator, testnet, mainnet)",
                value
            )),
        }
    }

    pub fn default_rpc_address(&self) -> &'static str {
        match self {
            FlowNetwork::Emulator => DEFAULT_EMULATOR_RPC_ADDRESS,
            FlowNetwork::Testnet => DEFAULT_TESTNET_RPC_ADDRESS,
            FlowNetwork::Mainnet => DEFAULT_MAINNET_RPC_ADDRESS,
        }
    }
}

impl fmt::Display for FlowNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowNetwork::Emulator => write!(f, "emulator"),
            FlowNetwork::Testnet => write!(f, "testnet"),
            FlowNetwork::Mainnet => write!(f, "mainnet"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NetworkManifestFile {
    network: NetworkConfigFile,
    accounts: Option<Value>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NetworkConfigFile {
    name: String,
    rpc_address: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetworkConfig {
    pub name: String,
    pub rpc_address: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountConfig {
    pub label: String,
    pub address: String,
    pub private_key: String,
    #[serde(default)]
    pub key_index: u32,
    #[serde(default = "default_signature_algorithm")]
    pub signature_algorithm: String,
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
}

fn default_signature_algorithm() -> String {
    DEFAULT_SIGNATURE_ALGORITHM.to_string()
}

fn default_hash_algorithm() -> String {
    DEFAULT_HASH_ALGORITHM.to_string()
}

impl AccountConfig {
    pub fn parsed_address(&self) -> Result<Address, String> {
        Address::from_hex(&self.address)
    }

    /// Builds the signing capability for this account's configured key.
    pub fn signer(&self) -> Result<AccountSigner, String> {
        let address = self.parsed_address()?;
        let signature_algorithm = SignatureAlgorithm::from_str(&self.signature_algorithm)?;
        let hash_algorithm = HashAlgorithm::from_str(&self.hash_algorithm)?;
        AccountSigner::new(
            address,
            self.key_index,
            signature_algorithm,
            hash_algorithm,
            &self.private_key,
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetworkManifest {
    pub network: NetworkConfig,
    #[serde(with = "accounts_serde")]
    pub accounts: BTreeMap<String, AccountConfig>,
}

pub mod accounts_serde {
    use std::collections::BTreeMap;

    use serde::ser::SerializeSeq;
    use serde::{Deserializer, Serializer};

    use crate::AccountConfig;

    pub fn serialize<S>(
        target: &BTreeMap<String, AccountConfig>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(target.len()))?;
        for account in target.values() {
            seq.serialize_element(account)?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, AccountConfig>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut res: BTreeMap<String, AccountConfig> = BTreeMap::new();
        let container: Vec<AccountConfig> = serde::Deserialize::deserialize(deserializer)?;
        for account in container {
            res.insert(account.label.clone(), account);
        }
        Ok(res)
    }
}

impl NetworkManifest {
    pub fn from_location(
        location: &FileLocation,
        network: &FlowNetwork,
    ) -> Result<NetworkManifest, String> {
        let content = location.read_content()?;
        let manifest_file: NetworkManifestFile = toml::from_slice(&content[..])
            .map_err(|e| format!("{} file malformatted {:?}", location, e))?;
        NetworkManifest::from_network_manifest_file(manifest_file, network)
    }

    pub fn from_network_manifest_file(
        manifest_file: NetworkManifestFile,
        network: &FlowNetwork,
    ) -> Result<NetworkManifest, String> {
        let rpc_address = manifest_file
            .network
            .rpc_address
            .unwrap_or(network.default_rpc_address().to_string());

        let mut accounts = BTreeMap::new();
        if let Some(Value::Array(entries)) = manifest_file.accounts {
            for entry in entries.into_iter() {
                let account: AccountConfig = entry
                    .try_into()
                    .map_err(|e| format!("account entry malformatted {:?}", e))?;
                accounts.insert(account.label.clone(), account);
            }
        }

        Ok(NetworkManifest {
            network: NetworkConfig {
                name: manifest_file.network.name,
                rpc_address,
            },
            accounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST_FIXTURE: &str = r#"
[network]
name = "emulator"

[[accounts]]
label = "emulator-account"
address = "0xf8d6e0586b0a20c7"
private_key = "7287ba251d44a4d3fd9276c88ce34c5c52a038955511cccaf77e61068649c178"
"#;

    #[test]
    fn test_parse_network_manifest() {
        let file: NetworkManifestFile = toml::from_slice(MANIFEST_FIXTURE.as_bytes()).unwrap();
        let manifest =
            NetworkManifest::from_network_manifest_file(file, &FlowNetwork::Emulator).unwrap();

        assert_eq!(manifest.network.name, "emulator");
        assert_eq!(manifest.network.rpc_address, DEFAULT_EMULATOR_RPC_ADDRESS);

        let account = manifest.accounts.get("emulator-account").unwrap();
        assert_eq!(account.key_index, 0);
        assert_eq!(account.signature_algorithm, DEFAULT_SIGNATURE_ALGORITHM);
        assert_eq!(account.hash_algorithm, DEFAULT_HASH_ALGORITHM);
        assert!(account.signer().is_ok());
        assert_eq!(
            account.parsed_address().unwrap().to_string(),
            "0xf8d6e0586b0a20c7"
        );
    }
}
