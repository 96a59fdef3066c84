#![allow(unused_imports)]

extern crate serde;

#[macro_use]
extern crate serde_derive;

#[macro_use]
extern crate serde_json;

pub mod codec;
pub mod crypto;
pub mod rpc_client;

#[cfg(feature = "mock")]
pub mod mock_flow_rpc;

pub use rpc_client::{FlowRpc, RpcError};

use codec::{Address, Block, OnChainAccount, Transaction, TransactionResult, Value};

/// Capability consumed by every write operation: the blocking round trips
/// to an access node. `FlowRpc` is the HTTP implementation; tests provide
/// in-memory ones.
pub trait Gateway {
    fn get_account(&self, address: &Address) -> Result<OnChainAccount, RpcError>;
    fn get_latest_block(&self) -> Result<Block, RpcError>;
    fn send_signed_transaction(&self, transaction: &Transaction) -> Result<String, RpcError>;
    fn get_transaction_result(
        &self,
        transaction_id: &str,
        wait_for_seal: bool,
    ) -> Result<TransactionResult, RpcError>;
    fn execute_script(&self, script: &str, arguments: Vec<Value>) -> Result<Value, RpcError>;
}
