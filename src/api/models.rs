//! API-facing request/response DTOs that don't already live in
//! [`crate::run::models`].

use crate::assets::persister::AssetKind;
use crate::run::models::RunSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub run_id: String,
    pub run_number: i64,
    pub status: String,
    pub duration_ms: Option<i64>,
    pub run: RunSummary,
}

impl ExecuteResponse {
    pub fn from_run(run: RunSummary) -> Self {
        Self {
            run_id: run.id.clone(),
            run_number: run.run_number,
            status: run.status.clone(),
            duration_ms: run.duration_ms,
            run,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    /// Opaque pagination cursor. Carries a run's `run_number`, not its
    /// `id` — `run_number` is what the storage layer orders and filters
    /// on, so round-tripping it avoids a second lookup to translate an id
    /// into a sort position. Clients should treat this as opaque and pass
    /// back whatever `pagination.nextCursor` returned.
    pub cursor: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunListItem {
    pub id: String,
    pub run_number: i64,
    pub status: String,
    pub duration_ms: Option<i64>,
    pub error_summary: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    /// Same unit as [`HistoryQuery::cursor`]: a `run_number`, not an `id`.
    pub next_cursor: Option<i64>,
    pub has_more: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub runs: Vec<RunListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyResolveRequest {
    pub assembly_id: String,
    #[serde(rename = "type")]
    pub output_type: AssetKind,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyResolveResponse {
    pub assembly_id: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub output_type: AssetKind,
    pub is_temp_url: bool,
    pub provider: String,
    pub asset_id: String,
    pub public_id: String,
}
