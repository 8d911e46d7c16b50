//! POST /api/v1/assemblies/resolve

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use crate::api::error::ApiResult;
use crate::api::handlers::execute::caller_id;
use crate::api::models::{AssemblyResolveRequest, AssemblyResolveResponse};
use crate::api::response;
use crate::api::routes::AppState;
use crate::assets::assembly::{fetch_assembly, resolve_assembly_output};

pub async fn resolve_assembly(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<AssemblyResolveRequest>,
) -> ApiResult<impl axum::response::IntoResponse> {
    let user_id = request.user_id.clone().unwrap_or(caller_id(&headers)?);

    let assembly = fetch_assembly(
        app_state.http_client(),
        &app_state.settings.assembly_base_url,
        &request.assembly_id,
    )
    .await?;

    let resolution =
        resolve_assembly_output(&assembly, &request.assembly_id, request.output_type, false)?;

    let asset = app_state
        .persister
        .persist_from_url(
            &user_id,
            request.output_type,
            &resolution.url,
            Some(&request.assembly_id),
            resolution.mime_type.as_deref(),
        )
        .await?;

    Ok(response::ok(AssemblyResolveResponse {
        assembly_id: request.assembly_id,
        url: asset.url.clone(),
        mime_type: asset.mime_type.clone(),
        output_type: request.output_type,
        is_temp_url: false,
        provider: asset.provider.clone(),
        asset_id: asset.id.clone(),
        public_id: asset.id,
    }))
}
