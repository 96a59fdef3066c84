use std::collections::{BTreeMap, HashSet};
use std::fmt;

use flow_rpc_client::codec::Address;
use flow_rpc_client::{Gateway, RpcError};
use piccolo_files::{clean_path, FlowNetwork, NetworkManifest, ProjectManifest};

pub mod onchain;
pub mod program;
pub mod types;

use self::onchain::AccountOperations;
use self::program::Program;
use self::types::{
    Contract, ContractDeploymentResult, ContractDeploymentStatus, DeploymentPlan, Script,
};

#[derive(Debug)]
pub enum DeploymentError {
    Config(String),
    UnresolvedImport { import: String, location: String },
    KeyCountMismatch { keys: usize, weights: usize },
    InvalidKey(String),
    MalformedContractArgument(String),
    ContractAlreadyExists { name: String, account: String },
    /// Identical code is already on-chain. A skip signal, not a failure.
    ContractNoDiff { name: String },
    ContractNotFound { name: String, available: Vec<String> },
    Rpc(RpcError),
    Execution(String),
}

impl fmt::Display for DeploymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentError::Config(e) => write!(f, "{}", e),
            DeploymentError::UnresolvedImport { import, location } => write!(
                f,
                "import {} in {} could not be resolved from the configuration",
                import, location
            ),
            DeploymentError::KeyCountMismatch { keys, weights } => write!(
                f,
                "number of keys and weights provided must match, number of provided keys: {}, number of provided key weights: {}",
                keys, weights
            ),
            DeploymentError::InvalidKey(e) => write!(f, "invalid account key: {}", e),
            DeploymentError::MalformedContractArgument(arg) => write!(
                f,
                "wrong format for contract argument, expected name:path, got: {}",
                arg
            ),
            DeploymentError::ContractAlreadyExists { name, account } => {
                write!(f, "contract {} exists in account {}", name, account)
            }
            DeploymentError::ContractNoDiff { name } => write!(
                f,
                "contract {} already exists with identical code, nothing to update",
                name
            ),
            DeploymentError::ContractNotFound { name, available } => write!(
                f,
                "can not remove a non-existing contract named '{}', account only contains the contracts: {}",
                name,
                available.join(", ")
            ),
            DeploymentError::Rpc(e) => write!(f, "{}", e),
            DeploymentError::Execution(e) => write!(f, "transaction execution failed: {}", e),
        }
    }
}

impl From<RpcError> for DeploymentError {
    fn from(e: RpcError) -> DeploymentError {
        DeploymentError::Rpc(e)
    }
}

/// Rewrites a program's import paths into resolved addresses, using the
/// locations of the project contracts plus the configured aliases. The
/// table is built once per deployment run and never mutated.
pub struct ImportReplacer {
    contracts_locations: BTreeMap<String, Address>,
}

impl ImportReplacer {
    pub fn new(
        contracts: &[Contract],
        aliases: &BTreeMap<String, String>,
    ) -> Result<ImportReplacer, DeploymentError> {
        let mut contracts_locations = BTreeMap::new();
        for contract in contracts.iter() {
            contracts_locations.insert(clean_path(&contract.location), contract.account_address);
        }
        // Aliases come in as hex strings, canonicalized here so lookups
        // and rewrites share one address representation.
        for (location, address) in aliases.iter() {
            let address = Address::from_hex(address).map_err(DeploymentError::Config)?;
            contracts_locations.insert(clean_path(location), address);
        }
        Ok(ImportReplacer {
            contracts_locations,
        })
    }

    /// Returns the program with every import rewritten, or fails on the
    /// first unresolvable path, leaving the caller's program untouched.
    pub fn replace(&self, program: &Program) -> Result<Program, DeploymentError> {
        let mut resolved = program.clone();
        for import in program.imports() {
            let import_location = piccolo_files::canonicalize_location(program.location(), &import);
            let target = match self.contracts_locations.get(&import_location) {
                Some(target) => target,
                None => {
                    return Err(DeploymentError::UnresolvedImport {
                        import,
                        location: program.location().to_string(),
                    })
                }
            };
            resolved.replace_import(&import, target);
        }
        Ok(resolved)
    }
}

/// Expands the network's deployment configuration into concrete contracts:
/// reads each source, attaches the target account address and arguments.
/// Sources are returned unresolved.
fn collect_network_contracts(
    manifest: &ProjectManifest,
    network_manifest: &NetworkManifest,
    network: &FlowNetwork,
) -> Result<Vec<Contract>, DeploymentError> {
    let network_deployments = match manifest.deployments.get(&network.to_string()) {
        Some(deployments) => deployments,
        None => {
            return Err(DeploymentError::Config(format!(
                "no deployments configured for network {}",
                network
            )))
        }
    };

    let base_location = manifest
        .get_project_root_location()
        .map_err(DeploymentError::Config)?;

    let mut contracts = vec![];
    let mut seen = HashSet::new();
    for deployment in network_deployments.iter() {
        let account = network_manifest
            .accounts
            .get(&deployment.account)
            .ok_or_else(|| {
                DeploymentError::Config(format!(
                    "unable to retrieve account '{}'",
                    deployment.account
                ))
            })?;
        let account_address = account.parsed_address().map_err(DeploymentError::Config)?;

        for contract_deployment in deployment.contracts.iter() {
            let contract_config = manifest
                .contracts
                .get(&contract_deployment.name)
                .ok_or_else(|| {
                    DeploymentError::Config(format!(
                        "contract {} is not defined in the project manifest",
                        contract_deployment.name
                    ))
                })?;

            if !seen.insert((contract_deployment.name.clone(), deployment.account.clone())) {
                return Err(DeploymentError::Config(format!(
                    "contract {} is listed twice for account {}",
                    contract_deployment.name, deployment.account
                )));
            }

            let mut contract_location = base_location.clone();
            contract_location
                .append_path(&contract_config.path)
                .map_err(DeploymentError::Config)?;
            let source = contract_location
                .read_content_as_utf8()
                .map_err(DeploymentError::Config)?;

            contracts.push(Contract {
                name: contract_deployment.name.clone(),
                location: clean_path(&contract_config.path),
                network: *network,
                account_address,
                account_label: deployment.account.clone(),
                source,
                args: contract_deployment.args.clone(),
            });
        }
    }

    Ok(contracts)
}

/// Builds the deployment plan for a network: every configured contract in
/// configuration order, imports substituted. Target addresses are fully
/// config-driven, so the whole table is known before anything is
/// submitted, and circular imports between project contracts resolve.
pub fn generate_default_deployment(
    manifest: &ProjectManifest,
    network_manifest: &NetworkManifest,
    network: &FlowNetwork,
) -> Result<DeploymentPlan, DeploymentError> {
    let mut contracts = collect_network_contracts(manifest, network_manifest, network)?;

    let aliases = manifest.aliases_for_network(network);
    let import_replacer = ImportReplacer::new(&contracts, &aliases)?;

    for contract in contracts.iter_mut() {
        let program = Program::new(&contract.location, &contract.source);
        if program.has_imports() {
            let resolved = import_replacer.replace(&program)?;
            contract.source = resolved.source().to_string();
        }
    }

    Ok(DeploymentPlan {
        network: *network,
        contracts,
    })
}

/// Pushes every contract of the plan through the transaction pipeline, in
/// order. Contracts sharing a target account are never reordered or
/// parallelized: each transaction advances that account's proposer
/// sequence number. The first hard error aborts the remaining
/// deployments; identical-code contracts are recorded as skipped.
pub fn apply_on_chain_deployment<G: Gateway>(
    gateway: &G,
    manifest: &ProjectManifest,
    network_manifest: &NetworkManifest,
    plan: DeploymentPlan,
    update_existing: bool,
) -> Result<Vec<ContractDeploymentResult>, DeploymentError> {
    let operations = AccountOperations::new(gateway, manifest, network_manifest, plan.network);

    let mut results = vec![];
    for contract in plan.contracts.into_iter() {
        let account = network_manifest
            .accounts
            .get(&contract.account_label)
            .ok_or_else(|| {
                DeploymentError::Config(format!(
                    "unable to retrieve account '{}'",
                    contract.account_label
                ))
            })?;

        let script = Script {
            source: contract.source.clone(),
            location: contract.location.clone(),
            args: contract.args.clone(),
        };

        let status = match operations.add_contract(account, &script, update_existing) {
            Ok((tx_id, true)) => ContractDeploymentStatus::Updated { tx_id },
            Ok((tx_id, false)) => ContractDeploymentStatus::Created { tx_id },
            Err(DeploymentError::ContractNoDiff { .. }) => ContractDeploymentStatus::Skipped,
            Err(e) => return Err(e),
        };

        results.push(ContractDeploymentResult { contract, status });
    }

    Ok(results)
}
