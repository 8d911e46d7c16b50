//! Router assembly and shared application state.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::api::{handlers, middleware};
use crate::assets::persister::AssetPersister;
use crate::config::Settings;
use crate::db::connection::DatabaseConnection;
use crate::executor::remote_task::RemoteTaskRunner;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub runner: Arc<dyn RemoteTaskRunner>,
    pub persister: Arc<AssetPersister>,
    pub settings: Arc<Settings>,
    http_client: reqwest::Client,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        runner: Arc<dyn RemoteTaskRunner>,
        persister: Arc<AssetPersister>,
        settings: Arc<Settings>,
    ) -> Self {
        Self { db, runner, persister, settings, http_client: reqwest::Client::new() }
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }
}

/// Builds the full API router: execute, history, assembly resolution, and
/// health checks, with CORS and request tracing layered on top.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/system/health", get(handlers::health_detailed))
        .route("/api/v1/workflows/:id/execute", post(handlers::execute_workflow))
        .route("/api/v1/workflows/:id/runs", get(handlers::list_runs_for_workflow))
        .route("/api/v1/runs/:id", get(handlers::get_run))
        .route("/api/v1/assemblies/resolve", post(handlers::resolve_assembly))
        .layer(middleware::logging_layer())
        .layer(middleware::cors_layer())
        .with_state(state)
}

#[cfg(test)]
pub async fn create_test_router() -> Router {
    let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
    db.run_migrations().await.unwrap();
    let runner: Arc<dyn RemoteTaskRunner> = Arc::new(crate::executor::remote_task::LocalFallbackTaskRunner);
    let persister = Arc::new(AssetPersister::unconfigured());
    let settings = Arc::new(Settings::from_env());
    create_router(AppState::new(db, runner, persister, settings))
}
