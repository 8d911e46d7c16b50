//! Per-node execution record rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeRunStatus {
    Queued,
    Running,
    Success,
    Failed,
    Skipped,
}

impl NodeRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRunStatus::Queued => "QUEUED",
            NodeRunStatus::Running => "RUNNING",
            NodeRunStatus::Success => "SUCCESS",
            NodeRunStatus::Failed => "FAILED",
            NodeRunStatus::Skipped => "SKIPPED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NodeRunRecord {
    pub id: String,
    pub run_id: String,
    pub node_id: String,
    pub node_kind: String,
    pub status: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<i64>,
    pub inputs_json: Option<String>,
    pub outputs_json: Option<String>,
    pub error_message: Option<String>,
    pub error_details_json: Option<String>,
    pub task_name: Option<String>,
    pub remote_run_id: Option<String>,
}
