//! POST /api/v1/workflows/:id/execute

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::ExecuteResponse;
use crate::api::response;
use crate::api::routes::AppState;
use crate::run::models::ExecuteRequest;
use crate::run::orchestrator::RunOrchestrator;
use crate::WorkflowError;

pub(crate) fn caller_id(headers: &HeaderMap) -> ApiResult<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError(WorkflowError::Validation("missing x-user-id header".into())))
}

pub async fn execute_workflow(
    State(app_state): State<AppState>,
    Path(workflow_id): Path<String>,
    headers: HeaderMap,
    Json(mut request): Json<ExecuteRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let user_id = caller_id(&headers)?;
    request.workflow_id = workflow_id;

    let orchestrator = RunOrchestrator::new(
        app_state.db.pool().clone(),
        app_state.runner.as_ref(),
        app_state.persister.as_ref(),
        app_state.settings.as_ref(),
    );

    let run = orchestrator.execute(request, &user_id).await?;
    Ok(response::ok(ExecuteResponse::from_run(run)))
}
