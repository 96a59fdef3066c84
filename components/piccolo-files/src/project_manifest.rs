use std::collections::BTreeMap;

use flow_rpc_client::codec::Value;
use serde_json::Value as JsonValue;
use toml::Value as TomlValue;

use super::network_manifest::FlowNetwork;
use super::{clean_path, FileLocation};

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectManifestFile {
    project: ProjectConfigFile,
    contracts: Option<TomlValue>,
    deployments: Option<TomlValue>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectConfigFile {
    name: String,
    authors: Option<Vec<String>>,
    description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ProjectConfig {
    pub name: String,
    pub authors: Vec<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractConfig {
    pub name: String,
    pub path: String,
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeploymentConfig {
    pub name: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentConfig {
    pub account: String,
    pub contracts: Vec<ContractDeploymentConfig>,
}

#[derive(Debug, Clone)]
pub struct ProjectManifest {
    pub project: ProjectConfig,
    pub contracts: BTreeMap<String, ContractConfig>,
    pub deployments: BTreeMap<String, Vec<DeploymentConfig>>,
    pub location: FileLocation,
}

impl ProjectManifest {
    pub fn from_location(location: &FileLocation) -> Result<ProjectManifest, String> {
        let project_manifest_file_content = location.read_content()?;
        let project_manifest_file: ProjectManifestFile =
            match toml::from_slice(&project_manifest_file_content[..]) {
                Ok(s) => s,
                Err(e) => {
                    return Err(format!("Piccolo.toml file malformatted {:?}", e));
                }
            };

        ProjectManifest::from_project_manifest_file(project_manifest_file, location)
    }

    pub fn from_project_manifest_file(
        project_manifest_file: ProjectManifestFile,
        manifest_location: &FileLocation,
    ) -> Result<ProjectManifest, String> {
        let project = ProjectConfig {
            name: project_manifest_file.project.name,
            description: project_manifest_file
                .project
                .description
                .unwrap_or("".into()),
            authors: project_manifest_file.project.authors.unwrap_or_default(),
        };

        let mut config = ProjectManifest {
            project,
            contracts: BTreeMap::new(),
            deployments: BTreeMap::new(),
            location: manifest_location.clone(),
        };

        let mut config_contracts = BTreeMap::new();
        if let Some(TomlValue::Table(contracts)) = project_manifest_file.contracts {
            for (contract_name, contract_settings) in contracts.iter() {
                let contract_settings = match contract_settings {
                    TomlValue::Table(contract_settings) => contract_settings,
                    _ => continue,
                };
                let contract_path = match contract_settings.get("path") {
                    Some(TomlValue::String(path)) => path.to_string(),
                    _ => {
                        return Err(format!(
                            "contract {} is missing the path field",
                            contract_name
                        ))
                    }
                };

                let mut aliases = BTreeMap::new();
                if let Some(TomlValue::Table(entries)) = contract_settings.get("aliases") {
                    for (network, address) in entries.iter() {
                        let address = match address {
                            TomlValue::String(address) => address.to_string(),
                            _ => {
                                return Err(format!(
                                    "alias for contract {} on network {} must be an address string",
                                    contract_name, network
                                ))
                            }
                        };
                        aliases.insert(network.to_string(), address);
                    }
                }

                config_contracts.insert(
                    contract_name.to_string(),
                    ContractConfig {
                        name: contract_name.to_string(),
                        path: contract_path,
                        aliases,
                    },
                );
            }
        }

        let mut config_deployments = BTreeMap::new();
        if let Some(TomlValue::Table(deployments)) = project_manifest_file.deployments {
            for (network, entries) in deployments.iter() {
                let entries = match entries {
                    TomlValue::Array(entries) => entries,
                    _ => {
                        return Err(format!(
                            "deployments for network {} must be an array of tables",
                            network
                        ))
                    }
                };
                let mut network_deployments = vec![];
                for entry in entries.iter() {
                    let entry = match entry {
                        TomlValue::Table(entry) => entry,
                        _ => {
                            return Err(format!(
                                "deployments for network {} must be an array of tables",
                                network
                            ))
                        }
                    };
                    let account = match entry.get("account") {
                        Some(TomlValue::String(account)) => account.to_string(),
                        _ => {
                            return Err(format!(
                                "deployment entry for network {} is missing the account field",
                                network
                            ))
                        }
                    };
                    let contracts = match entry.get("contracts") {
                        Some(TomlValue::Array(contracts)) => contracts,
                        _ => {
                            return Err(format!(
                                "deployment entry for network {} is missing the contracts field",
                                network
                            ))
                        }
                    };

                    let mut deployment_contracts = vec![];
                    for contract_entry in contracts.iter() {
                        deployment_contracts.push(parse_contract_deployment(contract_entry)?);
                    }

                    network_deployments.push(DeploymentConfig {
                        account,
                        contracts: deployment_contracts,
                    });
                }
                config_deployments.insert(network.to_string(), network_deployments);
            }
        }

        config.contracts = config_contracts;
        config.deployments = config_deployments;
        Ok(config)
    }

    pub fn get_project_root_location(&self) -> Result<FileLocation, String> {
        self.location.get_parent_location()
    }

    pub fn get_network_manifest_location(
        &self,
        network: &FlowNetwork,
    ) -> Result<FileLocation, String> {
        let mut network_manifest_location = self.get_project_root_location()?;
        network_manifest_location.append_path("settings")?;
        network_manifest_location.append_path(match network {
            FlowNetwork::Emulator => "Emulator.toml",
            FlowNetwork::Testnet => "Testnet.toml",
            FlowNetwork::Mainnet => "Mainnet.toml",
        })?;
        Ok(network_manifest_location)
    }

    /// Externally deployed contracts for this network: cleaned source
    /// location mapped to the configured address string.
    pub fn aliases_for_network(&self, network: &FlowNetwork) -> BTreeMap<String, String> {
        let mut aliases = BTreeMap::new();
        for contract in self.contracts.values() {
            if let Some(address) = contract.aliases.get(&network.to_string()) {
                aliases.insert(clean_path(&contract.path), address.to_string());
            }
        }
        aliases
    }
}

fn parse_contract_deployment(entry: &TomlValue) -> Result<ContractDeploymentConfig, String> {
    match entry {
        TomlValue::String(name) => Ok(ContractDeploymentConfig {
            name: name.to_string(),
            args: vec![],
        }),
        TomlValue::Table(table) => {
            let name = match table.get("name") {
                Some(TomlValue::String(name)) => name.to_string(),
                _ => return Err("deployment contract entry is missing the name field".into()),
            };
            let mut args = vec![];
            if let Some(TomlValue::Array(entries)) = table.get("args") {
                for arg in entries.iter() {
                    let json = toml_to_json(arg);
                    let value = Value::from_json(&json).map_err(|e| {
                        format!("unable to parse argument for contract {} ({})", name, e)
                    })?;
                    args.push(value);
                }
            }
            Ok(ContractDeploymentConfig { name, args })
        }
        _ => Err("deployment contract entry must be a name or a table".into()),
    }
}

// Numbers are carried as strings, matching the JSON interchange format of
// argument values.
fn toml_to_json(value: &TomlValue) -> JsonValue {
    match value {
        TomlValue::String(s) => JsonValue::String(s.to_string()),
        TomlValue::Integer(i) => JsonValue::String(i.to_string()),
        TomlValue::Float(f) => JsonValue::String(f.to_string()),
        TomlValue::Boolean(b) => JsonValue::Bool(*b),
        TomlValue::Array(entries) => JsonValue::Array(entries.iter().map(toml_to_json).collect()),
        TomlValue::Table(entries) => JsonValue::Object(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), toml_to_json(v)))
                .collect(),
        ),
        TomlValue::Datetime(d) => JsonValue::String(d.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST_FIXTURE: &str = r#"
[project]
name = "my-project"

[contracts.Hello]
path = "contracts/hello.cdc"

[contracts.FungibleToken]
path = "contracts/utility/FungibleToken.cdc"
aliases = { emulator = "0xee82856bf20e2aa6", testnet = "9a0766d93b6608b7" }

[[deployments.emulator]]
account = "emulator-account"
contracts = [
    "Hello",
    { name = "Greeter", args = [{ type = "String", value = "foo" }] },
]
"#;

    fn parse_fixture() -> ProjectManifest {
        let file: ProjectManifestFile = toml::from_slice(MANIFEST_FIXTURE.as_bytes()).unwrap();
        ProjectManifest::from_project_manifest_file(
            file,
            &FileLocation::from_path_string("/tmp/project/Piccolo.toml").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_contracts_and_aliases() {
        let manifest = parse_fixture();
        assert_eq!(manifest.project.name, "my-project");
        assert_eq!(manifest.contracts.len(), 2);
        assert_eq!(
            manifest.contracts.get("Hello").unwrap().path,
            "contracts/hello.cdc"
        );

        let aliases = manifest.aliases_for_network(&FlowNetwork::Emulator);
        assert_eq!(
            aliases.get("contracts/utility/FungibleToken.cdc"),
            Some(&"0xee82856bf20e2aa6".to_string())
        );
        assert!(manifest
            .aliases_for_network(&FlowNetwork::Mainnet)
            .is_empty());
    }

    #[test]
    fn test_parse_deployments_with_args() {
        let manifest = parse_fixture();
        let deployments = manifest.deployments.get("emulator").unwrap();
        assert_eq!(deployments.len(), 1);
        assert_eq!(deployments[0].account, "emulator-account");
        assert_eq!(
            deployments[0].contracts,
            vec![
                ContractDeploymentConfig {
                    name: "Hello".to_string(),
                    args: vec![],
                },
                ContractDeploymentConfig {
                    name: "Greeter".to_string(),
                    args: vec![Value::String("foo".to_string())],
                },
            ]
        );
    }
}
