//! Process-bridge protocol client
//!
//! Owns worker subprocesses that speak line-delimited JSON-RPC 2.0 and
//! exposes them through the [`RpcWorker`] contract.

mod error;
pub mod messages;
pub mod transport;

pub use error::TransportError;
pub use messages::{ToolCallResult, ToolContent, ToolInfo};
pub use transport::{ProcessWorker, RpcWorker, WorkerSpec};
