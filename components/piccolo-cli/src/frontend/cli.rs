use std::process;

use clap::{Parser, Subcommand};
use flow_rpc_client::codec::{Address, HashAlgorithm, SignatureAlgorithm, Value};
use flow_rpc_client::FlowRpc;
use piccolo_deployments::onchain::AccountOperations;
use piccolo_deployments::types::{ContractDeploymentStatus, Script};
use piccolo_deployments::{apply_on_chain_deployment, generate_default_deployment};
use piccolo_files::{
    clean_path, FileLocation, FlowNetwork, NetworkManifest, ProjectManifest,
    DEFAULT_PROJECT_MANIFEST_NAME,
};

/// Piccolo is a command line tool for deploying Cadence smart contracts
/// to Flow-compatible networks.
#[derive(Parser, PartialEq, Clone, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), name = "piccolo", bin_name = "piccolo")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Manage contract deployments on Emulator/Testnet/Mainnet
    #[clap(subcommand, name = "deployments", aliases = &["deployment"])]
    Deployments(Deployments),
    /// Subcommands for working with accounts
    #[clap(subcommand, name = "accounts", aliases = &["account"])]
    Accounts(Accounts),
    /// Subcommands for working with contracts
    #[clap(subcommand, name = "contracts", aliases = &["contract"])]
    Contracts(Contracts),
    /// Subcommands for working with scripts
    #[clap(subcommand, name = "scripts", aliases = &["script"])]
    Scripts(Scripts),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Deployments {
    /// Apply the deployments configured for a network
    #[clap(name = "apply", bin_name = "apply")]
    ApplyDeployment(ApplyDeployment),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Accounts {
    /// Create a new account on the selected network
    #[clap(name = "create", bin_name = "create")]
    CreateAccount(CreateAccount),
    /// Fetch an account by address
    #[clap(name = "get", bin_name = "get")]
    GetAccount(GetAccount),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Contracts {
    /// Deploy a single contract to an account
    #[clap(name = "add", bin_name = "add")]
    AddContract(AddContract),
    /// Remove a contract from an account
    #[clap(name = "rm", bin_name = "rm")]
    RemoveContract(RemoveContract),
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Scripts {
    /// Execute a read-only script against the selected network
    #[clap(name = "execute", bin_name = "execute")]
    ExecuteScript(ExecuteScript),
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct NetworkOpts {
    /// Target the emulator network, using settings/Emulator.toml (default)
    #[clap(long = "emulator", conflicts_with = "testnet", conflicts_with = "mainnet")]
    pub emulator: bool,
    /// Target the testnet network, using settings/Testnet.toml
    #[clap(long = "testnet", conflicts_with = "emulator", conflicts_with = "mainnet")]
    pub testnet: bool,
    /// Target the mainnet network, using settings/Mainnet.toml
    #[clap(long = "mainnet", conflicts_with = "emulator", conflicts_with = "testnet")]
    pub mainnet: bool,
}

impl NetworkOpts {
    fn network(&self) -> FlowNetwork {
        if self.mainnet {
            FlowNetwork::Mainnet
        } else if self.testnet {
            FlowNetwork::Testnet
        } else {
            FlowNetwork::Emulator
        }
    }
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct ApplyDeployment {
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Update contracts already deployed with different code
    #[clap(long = "update")]
    pub update: bool,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct CreateAccount {
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Account label paying for the creation, from the network settings
    #[clap(long = "signer", short = 's')]
    pub signer: String,
    /// Public key (64 bytes, hex), repeatable
    #[clap(long = "key", short = 'k', required = true)]
    pub keys: Vec<String>,
    /// Key weight, one per key; defaults to the full-weight threshold
    #[clap(long = "weight", short = 'w')]
    pub weights: Vec<u32>,
    /// Signature algorithm, one per key (default: secp256k1)
    #[clap(long = "sig-algo")]
    pub signature_algorithms: Vec<String>,
    /// Hash algorithm, one per key (default: sha3-256)
    #[clap(long = "hash-algo")]
    pub hash_algorithms: Vec<String>,
    /// Contract to deploy on the new account, as name:path, repeatable
    #[clap(long = "contract", short = 'c')]
    pub contracts: Vec<String>,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct GetAccount {
    /// Account address (0x-prefixed hex)
    pub address: String,
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct AddContract {
    /// Contract source path, relative to the project root
    pub path: String,
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Account label signing the deployment, from the network settings
    #[clap(long = "signer", short = 's')]
    pub signer: String,
    /// Update the contract if it is already deployed with different code
    #[clap(long = "update")]
    pub update: bool,
    /// Constructor argument, as Type:value (e.g. String:foo), repeatable
    #[clap(long = "arg")]
    pub args: Vec<String>,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct RemoveContract {
    /// Contract name
    pub name: String,
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Account label signing the removal, from the network settings
    #[clap(long = "signer", short = 's')]
    pub signer: String,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct ExecuteScript {
    /// Script source path, relative to the project root
    pub path: String,
    #[clap(flatten)]
    pub network: NetworkOpts,
    /// Script argument, as Type:value (e.g. String:foo), repeatable
    #[clap(long = "arg")]
    pub args: Vec<String>,
    /// Path to Piccolo.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

pub fn main() {
    let opts: Opts = Opts::parse();

    match opts.command {
        Command::Deployments(subcommand) => match subcommand {
            Deployments::ApplyDeployment(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);

                let plan = match generate_default_deployment(
                    &manifest,
                    &network_manifest,
                    &network,
                ) {
                    Ok(plan) => plan,
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                };

                println!(
                    "Deploying {} to {}",
                    pluralize_contracts(plan.contracts.len()),
                    network
                );

                let results = match apply_on_chain_deployment(
                    &rpc,
                    &manifest,
                    &network_manifest,
                    plan,
                    cmd.update,
                ) {
                    Ok(results) => results,
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                };

                for result in results.iter() {
                    match &result.status {
                        ContractDeploymentStatus::Created { tx_id } => println!(
                            "{} Contract '{}' created on account '{}' ({})",
                            green!("✔"),
                            result.contract.name,
                            result.contract.account_address,
                            tx_id
                        ),
                        ContractDeploymentStatus::Updated { tx_id } => println!(
                            "{} Contract '{}' updated on account '{}' ({})",
                            green!("✔"),
                            result.contract.name,
                            result.contract.account_address,
                            tx_id
                        ),
                        ContractDeploymentStatus::Skipped => println!(
                            "{} Contract '{}' already deployed with identical code, skipped",
                            yellow!("-"),
                            result.contract.name
                        ),
                    }
                }
            }
        },
        Command::Accounts(subcommand) => match subcommand {
            Accounts::CreateAccount(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);
                let operations =
                    AccountOperations::new(&rpc, &manifest, &network_manifest, network);

                let signer = signer_or_exit(&network_manifest, &cmd.signer);
                let signature_algorithms = parse_signature_algorithms_or_exit(
                    &cmd.signature_algorithms,
                    cmd.keys.len(),
                );
                let hash_algorithms =
                    parse_hash_algorithms_or_exit(&cmd.hash_algorithms, cmd.keys.len());

                match operations.create_account(
                    signer,
                    cmd.keys,
                    cmd.weights,
                    signature_algorithms,
                    hash_algorithms,
                    cmd.contracts,
                ) {
                    Ok(account) => {
                        println!("{} Account {} created", green!("✔"), account.address);
                        for key in account.keys.iter() {
                            println!("  key {} (weight {})", key.index, key.weight);
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                }
            }
            Accounts::GetAccount(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);
                let operations =
                    AccountOperations::new(&rpc, &manifest, &network_manifest, network);

                let address = match Address::from_hex(&cmd.address) {
                    Ok(address) => address,
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                };

                match operations.get_account(&address) {
                    Ok(account) => {
                        println!("Address: {}", account.address);
                        println!("Balance: {}", account.balance);
                        println!("Contracts:");
                        for name in account.contracts.keys() {
                            println!("  {}", name);
                        }
                    }
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                }
            }
        },
        Command::Contracts(subcommand) => match subcommand {
            Contracts::AddContract(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);
                let operations =
                    AccountOperations::new(&rpc, &manifest, &network_manifest, network);

                let signer = signer_or_exit(&network_manifest, &cmd.signer);
                let source = read_project_file_or_exit(&manifest, &cmd.path);
                let script = Script {
                    source,
                    location: clean_path(&cmd.path),
                    args: parse_values_or_exit(&cmd.args),
                };

                match operations.add_contract(signer, &script, cmd.update) {
                    Ok((tx_id, updated)) => println!(
                        "{} Contract {} on account '{}' ({})",
                        green!("✔"),
                        if updated { "updated" } else { "created" },
                        signer.address,
                        tx_id
                    ),
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                }
            }
            Contracts::RemoveContract(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);
                let operations =
                    AccountOperations::new(&rpc, &manifest, &network_manifest, network);

                let signer = signer_or_exit(&network_manifest, &cmd.signer);
                match operations.remove_contract(signer, &cmd.name) {
                    Ok(tx_id) => println!(
                        "{} Contract {} removed from account '{}' ({})",
                        green!("✔"),
                        cmd.name,
                        signer.address,
                        tx_id
                    ),
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                }
            }
        },
        Command::Scripts(subcommand) => match subcommand {
            Scripts::ExecuteScript(cmd) => {
                let network = cmd.network.network();
                let (manifest, network_manifest) =
                    load_manifests_or_exit(cmd.manifest_path, &network);
                let rpc = FlowRpc::new(&network_manifest.network.rpc_address);

                let source = read_project_file_or_exit(&manifest, &cmd.path);
                let arguments = parse_values_or_exit(&cmd.args);

                match rpc.execute_script(&source, arguments) {
                    Ok(value) => println!("{}", value.to_json()),
                    Err(e) => {
                        eprintln!("{}", format_err!("{}", e));
                        process::exit(1);
                    }
                }
            }
        },
    }
}

fn get_manifest_location(path: Option<String>) -> Option<FileLocation> {
    if let Some(path) = path {
        let manifest_location = FileLocation::from_path_string(&path).ok()?;
        if manifest_location.exists() {
            return Some(manifest_location);
        }
        return None;
    }
    let mut current_dir = std::env::current_dir().ok()?;
    loop {
        let mut candidate = FileLocation::from_path(current_dir.clone());
        candidate.append_path(DEFAULT_PROJECT_MANIFEST_NAME).ok()?;
        if candidate.exists() {
            return Some(candidate);
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

fn load_manifests_or_exit(
    manifest_path: Option<String>,
    network: &FlowNetwork,
) -> (ProjectManifest, NetworkManifest) {
    let manifest_location = match get_manifest_location(manifest_path) {
        Some(location) => location,
        None => {
            eprintln!(
                "{}",
                format_err!("could not find {} in the current directory or its parents", DEFAULT_PROJECT_MANIFEST_NAME)
            );
            process::exit(1);
        }
    };

    let manifest = match ProjectManifest::from_location(&manifest_location) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("{}", format_err!("{}", e));
            process::exit(1);
        }
    };

    let network_manifest_location = match manifest.get_network_manifest_location(network) {
        Ok(location) => location,
        Err(e) => {
            eprintln!("{}", format_err!("{}", e));
            process::exit(1);
        }
    };
    let network_manifest =
        match NetworkManifest::from_location(&network_manifest_location, network) {
            Ok(network_manifest) => network_manifest,
            Err(e) => {
                eprintln!("{}", format_err!("{}", e));
                process::exit(1);
            }
        };

    (manifest, network_manifest)
}

fn signer_or_exit<'a>(
    network_manifest: &'a NetworkManifest,
    label: &str,
) -> &'a piccolo_files::AccountConfig {
    match network_manifest.accounts.get(label) {
        Some(account) => account,
        None => {
            eprintln!(
                "{}",
                format_err!("unable to retrieve account '{}' from the network settings", label)
            );
            process::exit(1);
        }
    }
}

fn read_project_file_or_exit(manifest: &ProjectManifest, path: &str) -> String {
    let mut location = match manifest.get_project_root_location() {
        Ok(location) => location,
        Err(e) => {
            eprintln!("{}", format_err!("{}", e));
            process::exit(1);
        }
    };
    if let Err(e) = location.append_path(path) {
        eprintln!("{}", format_err!("{}", e));
        process::exit(1);
    }
    match location.read_content_as_utf8() {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{}", format_err!("{}", e));
            process::exit(1);
        }
    }
}

// Arguments come in as Type:value pairs, e.g. String:foo, UInt64:42,
// Address:0xf8d6e0586b0a20c7, Bool:true.
fn parse_values_or_exit(args: &[String]) -> Vec<Value> {
    let mut values = vec![];
    for arg in args.iter() {
        let parsed = match arg.split_once(':') {
            Some(("String", value)) => Ok(Value::String(value.to_string())),
            Some(("Bool", value)) => value
                .parse::<bool>()
                .map(Value::Bool)
                .map_err(|_| format!("unable to parse Bool argument {}", arg)),
            Some(("Int", value)) => value
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("unable to parse Int argument {}", arg)),
            Some(("UInt64", value)) => value
                .parse::<u64>()
                .map(Value::UInt64)
                .map_err(|_| format!("unable to parse UInt64 argument {}", arg)),
            Some(("Address", value)) => Address::from_hex(value).map(Value::Address),
            _ => Err(format!(
                "wrong format for argument, expected Type:value, got: {}",
                arg
            )),
        };
        match parsed {
            Ok(value) => values.push(value),
            Err(e) => {
                eprintln!("{}", format_err!("{}", e));
                process::exit(1);
            }
        }
    }
    values
}

fn parse_signature_algorithms_or_exit(
    raw: &[String],
    key_count: usize,
) -> Vec<SignatureAlgorithm> {
    let mut algorithms = vec![];
    for i in 0..key_count {
        let algorithm = match raw.get(i) {
            Some(value) => SignatureAlgorithm::from_str(value),
            None => SignatureAlgorithm::from_str(piccolo_files::DEFAULT_SIGNATURE_ALGORITHM),
        };
        match algorithm {
            Ok(algorithm) => algorithms.push(algorithm),
            Err(e) => {
                eprintln!("{}", format_err!("{}", e));
                process::exit(1);
            }
        }
    }
    algorithms
}

fn parse_hash_algorithms_or_exit(raw: &[String], key_count: usize) -> Vec<HashAlgorithm> {
    let mut algorithms = vec![];
    for i in 0..key_count {
        let algorithm = match raw.get(i) {
            Some(value) => HashAlgorithm::from_str(value),
            None => HashAlgorithm::from_str(piccolo_files::DEFAULT_HASH_ALGORITHM),
        };
        match algorithm {
            Ok(algorithm) => algorithms.push(algorithm),
            Err(e) => {
                eprintln!("{}", format_err!("{}", e));
                process::exit(1);
            }
        }
    }
    algorithms
}

fn pluralize_contracts(count: usize) -> String {
    if count > 1 {
        format!("{} contracts", count)
    } else {
        format!("{} contract", count)
    }
}
