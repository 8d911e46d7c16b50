//! End-to-end run scenarios, exercised through `RunOrchestrator::execute`
//! against an in-memory database and a deterministic task runner.

mod common;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use workflow_core::assets::persister::AssetPersister;
use workflow_core::config::Settings;
use workflow_core::db::repositories::RunRepository;
use workflow_core::executor::remote_task::{LocalFallbackTaskRunner, PollOutcome, RemoteTaskRunner};
use workflow_core::graph::model::{ExecutionScope, Node, NodeKind};
use workflow_core::run::models::ExecuteRequest;
use workflow_core::run::orchestrator::RunOrchestrator;
use workflow_core::{Result, WorkflowError};

use common::{edge, seed_workflow, USER_ID, WORKFLOW_ID};

fn fast_settings() -> Settings {
    Settings {
        database_url: "sqlite::memory:".into(),
        host: "0.0.0.0".into(),
        port: 0,
        task_timeout: Duration::from_millis(50),
        poll_interval: Duration::from_millis(5),
        trigger_enabled: true,
        remote_task_base_url: String::new(),
        assembly_base_url: String::new(),
        durable_provider: None,
        default_llm_model: "gpt-test".into(),
        default_image_model: "diffusion-test".into(),
    }
}

fn request(scope: ExecutionScope, selected_node_ids: Vec<String>) -> ExecuteRequest {
    ExecuteRequest { workflow_id: WORKFLOW_ID.to_string(), scope, selected_node_ids }
}

/// A runner where every task whose name is in `failing` fails terminally
/// on its first poll, and everything else succeeds immediately.
struct SelectiveFailureRunner {
    failing: &'static [&'static str],
    message: &'static str,
}

#[async_trait]
impl RemoteTaskRunner for SelectiveFailureRunner {
    async fn submit(&self, task_name: &str, _payload: serde_json::Value) -> Result<String> {
        Ok(format!("handle-{task_name}"))
    }

    async fn poll(&self, handle_id: &str) -> Result<PollOutcome> {
        let failed = self.failing.iter().any(|name| handle_id.starts_with(&format!("handle-{name}")));
        if failed {
            Ok(PollOutcome { terminal: true, success: false, error: Some(self.message.to_string()), output: None })
        } else {
            Ok(PollOutcome {
                terminal: true,
                success: true,
                error: None,
                output: Some(json!({ "text": "ok" })),
            })
        }
    }
}

/// A runner that completes every task immediately with a plausible
/// per-task-name output, for scenarios that exercise multiple remote
/// task kinds and need each to produce a real, usable result.
struct HappyPathRunner;

#[async_trait]
impl RemoteTaskRunner for HappyPathRunner {
    async fn submit(&self, task_name: &str, _payload: serde_json::Value) -> Result<String> {
        Ok(format!("handle-{task_name}"))
    }

    async fn poll(&self, handle_id: &str) -> Result<PollOutcome> {
        let output = if handle_id.contains("crop-image") {
            json!({ "croppedUrl": "https://cdn.example.com/cropped.png" })
        } else if handle_id.contains("llm-execute") {
            json!({ "text": "generated text" })
        } else if handle_id.contains("generate-image") {
            json!({ "imageUrl": "https://cdn.example.com/generated.png" })
        } else if handle_id.contains("extract-frame") {
            json!({ "frameUrl": "https://cdn.example.com/frame.png" })
        } else {
            json!({})
        };
        Ok(PollOutcome { terminal: true, success: true, error: None, output: Some(output) })
    }
}

/// A runner where tasks in `hanging` never reach a terminal poll outcome
/// (forcing the orchestrator's timeout), and everything else succeeds.
struct SelectiveHangRunner {
    hanging: &'static [&'static str],
}

#[async_trait]
impl RemoteTaskRunner for SelectiveHangRunner {
    async fn submit(&self, task_name: &str, _payload: serde_json::Value) -> Result<String> {
        Ok(format!("handle-{task_name}"))
    }

    async fn poll(&self, handle_id: &str) -> Result<PollOutcome> {
        let hangs = self.hanging.iter().any(|name| handle_id.starts_with(&format!("handle-{name}")));
        if hangs {
            Ok(PollOutcome { terminal: false, success: false, error: None, output: None })
        } else {
            Ok(PollOutcome {
                terminal: true,
                success: true,
                error: None,
                output: Some(json!({ "croppedUrl": "https://cdn.example.com/ok.png" })),
            })
        }
    }
}

#[tokio::test]
async fn s1_smallest_passing_full_run() {
    let nodes = vec![
        Node::new("text", NodeKind::Text).with_data("value", json!("hello")),
        Node::new("export", NodeKind::ExportText),
    ];
    let edges = vec![edge("e1", "text", "text", "export", "text")];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = LocalFallbackTaskRunner;
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let summary = orchestrator
        .execute(request(ExecutionScope::Full, vec![]), USER_ID)
        .await
        .unwrap();

    assert_eq!(summary.status, "SUCCESS");
    assert_eq!(summary.run_number, 1);
    assert_eq!(summary.node_runs.len(), 2);
    assert!(summary.node_runs.iter().all(|n| n.status == "SUCCESS"));

    let export = summary.node_runs.iter().find(|n| n.node_id == "export").unwrap();
    assert_eq!(export.outputs.as_ref().unwrap().get("text"), Some(&json!("hello")));
}

#[tokio::test]
async fn s2_full_rejects_graph_without_export() {
    let nodes = vec![Node::new("text", NodeKind::Text).with_data("value", json!("x")), Node::new("llm", NodeKind::Llm)];
    let edges = vec![edge("e1", "text", "text", "llm", "user_message")];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = LocalFallbackTaskRunner;
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let err = orchestrator
        .execute(request(ExecutionScope::Full, vec![]), USER_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::MissingExportNode));
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM workflow_runs")
        .fetch_one(conn.pool())
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn s3_cycle_is_rejected() {
    let nodes = vec![Node::new("a", NodeKind::Text), Node::new("b", NodeKind::Text)];
    let edges = vec![edge("e1", "a", "value", "b", "value"), edge("e2", "b", "value", "a", "value")];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = LocalFallbackTaskRunner;
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let err = orchestrator
        .execute(request(ExecutionScope::Selected, vec!["a".to_string(), "b".to_string()]), USER_ID)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::InvalidDag));
}

#[tokio::test]
async fn s4_selected_scope_includes_ancestors_and_orders_levels() {
    let nodes = vec![
        Node::new("t1", NodeKind::Text).with_data("value", json!("p1")),
        Node::new("c", NodeKind::CropImage),
        Node::new("t2", NodeKind::Text).with_data("value", json!("p2")),
        Node::new("t3", NodeKind::Text).with_data("value", json!("p3")),
        Node::new("l", NodeKind::Llm),
    ];
    let edges = vec![
        edge("e1", "t1", "value", "c", "image"),
        edge("e2", "c", "croppedUrl", "t2", "value"),
        edge("e3", "t2", "value", "l", "user_message"),
        edge("e4", "t3", "value", "l", "user_message"),
    ];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = HappyPathRunner;
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let summary = orchestrator
        .execute(request(ExecutionScope::Selected, vec!["l".to_string()]), USER_ID)
        .await
        .unwrap();

    assert_eq!(summary.status, "SUCCESS");
    let ids: std::collections::HashSet<&str> = summary.node_runs.iter().map(|n| n.node_id.as_str()).collect();
    assert_eq!(ids, std::collections::HashSet::from(["t1", "c", "t2", "t3", "l"]));
}

#[tokio::test]
async fn s5_partial_run_on_remote_failure() {
    let nodes = vec![
        Node::new("text", NodeKind::Text).with_data("value", json!("p")),
        Node::new("llm", NodeKind::Llm),
        Node::new("export", NodeKind::ExportText),
    ];
    let edges = vec![
        edge("e1", "text", "value", "llm", "user_message"),
        edge("e2", "llm", "text", "export", "text"),
    ];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = SelectiveFailureRunner { failing: &["llm-execute"], message: "content policy violation" };
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let summary = orchestrator
        .execute(request(ExecutionScope::Full, vec![]), USER_ID)
        .await
        .unwrap();

    assert_eq!(summary.status, "PARTIAL");
    assert!(summary.error_summary.as_ref().unwrap().starts_with("llm:"));

    let text = summary.node_runs.iter().find(|n| n.node_id == "text").unwrap();
    let llm = summary.node_runs.iter().find(|n| n.node_id == "llm").unwrap();
    let export = summary.node_runs.iter().find(|n| n.node_id == "export").unwrap();
    assert_eq!(text.status, "SUCCESS");
    assert_eq!(llm.status, "FAILED");
    assert!(llm.error_message.as_deref().unwrap().contains("content policy violation"));
    assert_eq!(export.status, "FAILED");
    assert!(export.error_message.as_deref().unwrap().contains("missing required input"));
}

#[tokio::test]
async fn s6_timeout_isolated_to_its_own_node() {
    let nodes = vec![
        Node::new("img", NodeKind::UploadImage).with_data("imageUrl", json!("https://cdn.example.com/in.png")),
        Node::new("crop", NodeKind::CropImage),
        Node::new("prompt", NodeKind::Text).with_data("value", json!("caption this")),
        Node::new("export", NodeKind::ExportText),
    ];
    let edges = vec![
        edge("e1", "img", "imageUrl", "crop", "image"),
        edge("e2", "prompt", "value", "export", "text"),
    ];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = SelectiveHangRunner { hanging: &["crop-image"] };
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let summary = orchestrator
        .execute(request(ExecutionScope::Full, vec![]), USER_ID)
        .await
        .unwrap();

    assert_eq!(summary.status, "PARTIAL");
    let crop = summary.node_runs.iter().find(|n| n.node_id == "crop").unwrap();
    let export = summary.node_runs.iter().find(|n| n.node_id == "export").unwrap();
    assert_eq!(crop.status, "FAILED");
    assert!(crop.error_message.as_deref().unwrap().contains("timed out"));
    assert_eq!(export.status, "SUCCESS");
}

#[tokio::test]
async fn history_is_scoped_to_the_owning_user() {
    let nodes = vec![
        Node::new("text", NodeKind::Text).with_data("value", json!("hi")),
        Node::new("export", NodeKind::ExportText),
    ];
    let edges = vec![edge("e1", "text", "text", "export", "text")];
    let conn = seed_workflow(&nodes, &edges).await;

    let settings = fast_settings();
    let runner = LocalFallbackTaskRunner;
    let persister = AssetPersister::unconfigured();
    let orchestrator = RunOrchestrator::new(conn.pool().clone(), &runner, &persister, &settings);

    let summary = orchestrator
        .execute(request(ExecutionScope::Full, vec![]), USER_ID)
        .await
        .unwrap();

    assert!(RunRepository::find_owned(conn.pool(), &summary.id, USER_ID).await.is_ok());
    assert!(RunRepository::find_owned(conn.pool(), &summary.id, "someone-else").await.is_err());
}
