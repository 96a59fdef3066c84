mod common;

use std::path::PathBuf;

use common::{load_fixture, SERVICE_ADDRESS};
use flow_rpc_client::codec::Value;
use piccolo_deployments::types::DeploymentPlan;
use piccolo_deployments::{generate_default_deployment, DeploymentError};
use piccolo_files::{FileLocation, FlowNetwork, ProjectManifest, ProjectManifestFile};

fn fixture_source(fixture: &str, relative_path: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(fixture);
    path.push(relative_path);
    FileLocation::from_path(path).read_content_as_utf8().unwrap()
}

fn generate(fixture: &str, network: &FlowNetwork) -> Result<DeploymentPlan, DeploymentError> {
    let (manifest, network_manifest) = load_fixture(fixture);
    generate_default_deployment(&manifest, &network_manifest, network)
}

#[test]
fn test_generate_hello_plan() {
    let plan = generate("hello", &FlowNetwork::Emulator).unwrap();

    assert_eq!(plan.contracts.len(), 1);
    let contract = &plan.contracts[0];
    assert_eq!(contract.name, "Hello");
    assert_eq!(contract.account_address.to_string(), SERVICE_ADDRESS);
    assert_eq!(contract.source, fixture_source("hello", "contracts/hello.cdc"));
    assert!(contract.args.is_empty());
}

#[test]
fn test_generate_complex_plan_resolves_every_import() {
    let plan = generate("complex", &FlowNetwork::Emulator).unwrap();

    assert_eq!(plan.contracts.len(), 3);
    assert_eq!(
        plan.contracts.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
        vec!["ContractA", "ContractB", "ContractC"]
    );

    for (contract, file) in plan.contracts.iter().zip([
        "contracts/contractA.cdc",
        "contracts/contractB.cdc",
        "contracts/contractC.cdc",
    ]) {
        let expected = fixture_source("complex", file)
            .replace("\"./contractA.cdc\"", SERVICE_ADDRESS)
            .replace("\"./contractB.cdc\"", SERVICE_ADDRESS);
        assert_eq!(contract.source, expected);
    }

    assert_eq!(
        plan.contracts[2].args,
        vec![Value::String("foo".to_string())]
    );
}

#[test]
fn test_generate_fails_without_deployments_for_network() {
    let err = generate("hello", &FlowNetwork::Testnet).unwrap_err();
    match err {
        DeploymentError::Config(message) => {
            assert!(message.contains("no deployments configured for network testnet"))
        }
        e => panic!("unexpected error {:?}", e),
    }
}

fn hello_manifest_with(deployments: &str) -> ProjectManifest {
    let toml_str = format!(
        r#"
[project]
name = "hello-project"

[contracts.Hello]
path = "contracts/hello.cdc"

[contracts.Orphan]
path = "contracts/orphan.cdc"

{}
"#,
        deployments
    );
    let file: ProjectManifestFile = toml::from_slice(toml_str.as_bytes()).unwrap();
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures/hello/Piccolo.toml");
    ProjectManifest::from_project_manifest_file(file, &FileLocation::from_path(path)).unwrap()
}

#[test]
fn test_generate_fails_on_unresolved_import() {
    let manifest = hello_manifest_with(
        r#"
[[deployments.emulator]]
account = "emulator-account"
contracts = ["Orphan"]
"#,
    );
    let (_, network_manifest) = load_fixture("hello");

    let err = generate_default_deployment(&manifest, &network_manifest, &FlowNetwork::Emulator)
        .unwrap_err();
    match err {
        DeploymentError::UnresolvedImport { import, .. } => {
            assert_eq!(import, "./missing.cdc")
        }
        e => panic!("unexpected error {:?}", e),
    }
}

#[test]
fn test_generate_fails_on_duplicate_contract_for_account() {
    let manifest = hello_manifest_with(
        r#"
[[deployments.emulator]]
account = "emulator-account"
contracts = ["Hello", "Hello"]
"#,
    );
    let (_, network_manifest) = load_fixture("hello");

    let err = generate_default_deployment(&manifest, &network_manifest, &FlowNetwork::Emulator)
        .unwrap_err();
    match err {
        DeploymentError::Config(message) => {
            assert!(message.contains("listed twice"))
        }
        e => panic!("unexpected error {:?}", e),
    }
}
