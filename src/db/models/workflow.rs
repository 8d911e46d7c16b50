//! Workflow and workflow-version rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A workflow owned by a user. `run_counter` backs the atomic `run_number`
/// increment performed at run bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowRecord {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub run_counter: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// An immutable snapshot of a workflow's nodes/edges. Only the highest
/// `version_number` for a workflow is ever executed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowVersionRecord {
    pub id: String,
    pub workflow_id: String,
    pub version_number: i64,
    pub nodes_json: String,
    pub edges_json: String,
    pub viewport_json: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
