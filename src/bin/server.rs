//! Standalone HTTP server binary for the workflow execution core.

use std::net::SocketAddr;
use std::sync::Arc;

use workflow_core::api::routes::{create_router, AppState};
use workflow_core::assets::persister::AssetPersister;
use workflow_core::config::Settings;
use workflow_core::db::DatabaseConnection;
use workflow_core::executor::remote_task::{HttpRemoteTaskRunner, LocalFallbackTaskRunner, RemoteTaskRunner};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    let settings = Settings::from_env();

    tracing::info!("connecting to database: {}", settings.database_url);
    let db = DatabaseConnection::new(&settings.database_url).await?;

    tracing::info!("running database migrations");
    db.run_migrations().await?;

    tracing::info!("performing database health check");
    db.health_check().await?;

    let runner: Arc<dyn RemoteTaskRunner> = if settings.trigger_enabled {
        Arc::new(HttpRemoteTaskRunner::new(settings.remote_task_base_url.clone()))
    } else {
        tracing::warn!("TRIGGER_ENABLED=false, dispatching nodes through the local fallback runner");
        Arc::new(LocalFallbackTaskRunner)
    };

    let persister = Arc::new(AssetPersister::new(db.pool().clone(), settings.durable_provider.clone()));
    let host = settings.host.clone();
    let port = settings.port;
    let settings = Arc::new(settings);

    let app = create_router(AppState::new(db, runner, persister, settings));

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("starting workflow server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("workflow server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
