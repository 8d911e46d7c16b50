//! Run-facing DTOs, decoupled from the row representation in `db::models`.

use crate::db::models::{NodeRunRecord, WorkflowRunRecord};
use crate::graph::model::ExecutionScope;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    pub workflow_id: String,
    pub scope: ExecutionScope,
    #[serde(default)]
    pub selected_node_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodeRunSummary {
    pub id: String,
    pub node_id: String,
    pub node_kind: String,
    pub status: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_ms: Option<i64>,
    pub inputs: Option<Value>,
    pub outputs: Option<Value>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub id: String,
    pub workflow_id: String,
    pub run_number: i64,
    pub status: String,
    pub duration_ms: Option<i64>,
    pub error_summary: Option<String>,
    pub node_runs: Vec<NodeRunSummary>,
}

impl NodeRunSummary {
    pub fn from_record(record: &NodeRunRecord) -> Self {
        Self {
            id: record.id.clone(),
            node_id: record.node_id.clone(),
            node_kind: record.node_kind.clone(),
            status: record.status.clone(),
            started_at: record.started_at,
            finished_at: record.finished_at,
            duration_ms: record.duration_ms,
            inputs: record.inputs_json.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            outputs: record.outputs_json.as_deref().and_then(|s| serde_json::from_str(s).ok()),
            error_message: record.error_message.clone(),
        }
    }
}

impl RunSummary {
    pub fn from_records(run: &WorkflowRunRecord, node_runs: &[NodeRunRecord]) -> Self {
        Self {
            id: run.id.clone(),
            workflow_id: run.workflow_id.clone(),
            run_number: run.run_number,
            status: run.status.clone(),
            duration_ms: run.duration_ms,
            error_summary: run.error_summary.clone(),
            node_runs: node_runs.iter().map(NodeRunSummary::from_record).collect(),
        }
    }
}
