//! Graph model, handle typing, and scheduling algorithms.

pub mod algorithms;
pub mod model;
pub mod registry;

pub use algorithms::{execution_levels, subgraph_for_scope, validate_dag};
pub use model::{DataType, Edge, ExecutionScope, Node, NodeKind, WorkflowGraph};
pub use registry::HandleRegistry;
