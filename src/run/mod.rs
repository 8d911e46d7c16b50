//! Run Orchestrator: preflight validation, atomic bootstrap, level-parallel
//! execution, and finalization.

pub mod models;
pub mod orchestrator;

pub use models::{ExecuteRequest, NodeRunSummary, RunSummary};
pub use orchestrator::RunOrchestrator;
