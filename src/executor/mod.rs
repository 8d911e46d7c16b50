//! Node dispatch and the remote task client it dispatches through.

pub mod node_executor;
pub mod remote_task;
pub mod retry;

pub use node_executor::{execute_node, ExecutionContext, NodeOutcome};
pub use remote_task::{trigger_and_poll, HttpRemoteTaskRunner, LocalFallbackTaskRunner, RemoteTaskRunner};
