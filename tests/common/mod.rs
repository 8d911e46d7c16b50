//! Shared fixtures for end-to-end run scenarios: an in-memory database
//! seeded with a single workflow and version, ready for
//! `RunOrchestrator::execute`.

use workflow_core::db::connection::DatabaseConnection;
use workflow_core::graph::model::{Edge, Node};

pub const USER_ID: &str = "user-1";
pub const WORKFLOW_ID: &str = "wf-1";

/// Boots an in-memory, migrated database with one workflow owned by
/// [`USER_ID`] and one version holding `nodes`/`edges`.
pub async fn seed_workflow(nodes: &[Node], edges: &[Edge]) -> DatabaseConnection {
    let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
    conn.run_migrations().await.unwrap();

    sqlx::query("INSERT INTO workflows (id, user_id, name) VALUES (?, ?, 'demo')")
        .bind(WORKFLOW_ID)
        .bind(USER_ID)
        .execute(conn.pool())
        .await
        .unwrap();

    let nodes_json = serde_json::to_string(nodes).unwrap();
    let edges_json = serde_json::to_string(edges).unwrap();
    sqlx::query(
        "INSERT INTO workflow_versions (id, workflow_id, version_number, nodes_json, edges_json)
         VALUES ('v1', ?, 1, ?, ?)",
    )
    .bind(WORKFLOW_ID)
    .bind(&nodes_json)
    .bind(&edges_json)
    .execute(conn.pool())
    .await
    .unwrap();

    conn
}

pub fn edge(id: &str, source: &str, source_handle: &str, target: &str, target_handle: &str) -> Edge {
    Edge {
        id: id.to_string(),
        source_node: source.to_string(),
        source_handle: source_handle.to_string(),
        target_node: target.to_string(),
        target_handle: target_handle.to_string(),
    }
}
