use flow_rpc_client::codec::{Address, Value};
use piccolo_files::FlowNetwork;

/// A contract scheduled for deployment: source already read, target
/// account and constructor arguments attached. Built by the planner,
/// consumed once by the transaction pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: String,
    pub location: String,
    pub network: FlowNetwork,
    pub account_address: Address,
    pub account_label: String,
    pub source: String,
    pub args: Vec<Value>,
}

/// A standalone script to push to an account, outside of any configured
/// deployment (`piccolo contracts add`).
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub source: String,
    pub location: String,
    pub args: Vec<Value>,
}

/// The ordered set of contracts to push to one network, imports already
/// resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentPlan {
    pub network: FlowNetwork,
    pub contracts: Vec<Contract>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContractDeploymentStatus {
    Created { tx_id: String },
    Updated { tx_id: String },
    /// Identical code already on-chain, no transaction submitted.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractDeploymentResult {
    pub contract: Contract,
    pub status: ContractDeploymentStatus,
}
