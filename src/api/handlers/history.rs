//! GET /api/v1/runs/:id and GET /api/v1/workflows/:id/runs

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;

use crate::api::error::ApiResult;
use crate::api::handlers::execute::caller_id;
use crate::api::models::{HistoryQuery, HistoryResponse, Pagination, RunListItem};
use crate::api::response;
use crate::api::routes::AppState;
use crate::db::repositories::{NodeRunRepository, RunRepository};
use crate::run::models::RunSummary;
use crate::WorkflowError;

pub async fn get_run(
    State(app_state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<impl axum::response::IntoResponse> {
    let user_id = caller_id(&headers)?;
    let run = RunRepository::find_owned(app_state.db.pool(), &run_id, &user_id)
        .await
        .map_err(WorkflowError::from)?;
    let node_runs = NodeRunRepository::list_for_run(app_state.db.pool(), &run_id)
        .await
        .map_err(WorkflowError::from)?;
    Ok(response::ok(RunSummary::from_records(&run, &node_runs)))
}

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

pub async fn list_runs_for_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let user_id = caller_id(&headers)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    // Fetch one extra row to know whether another page follows.
    let records = RunRepository::list_for_workflow(
        app_state.db.pool(),
        &workflow_id,
        &user_id,
        limit + 1,
        query.cursor,
    )
    .await
    .map_err(WorkflowError::from)?;

    let has_more = records.len() as i64 > limit;
    let page: Vec<_> = records.into_iter().take(limit as usize).collect();
    let next_cursor = if has_more { page.last().map(|r| r.run_number) } else { None };

    let runs = page
        .into_iter()
        .map(|r| RunListItem {
            id: r.id,
            run_number: r.run_number,
            status: r.status,
            duration_ms: r.duration_ms,
            error_summary: r.error_summary,
        })
        .collect();

    Ok(response::ok(HistoryResponse { runs, pagination: Pagination { next_cursor, has_more } }))
}
