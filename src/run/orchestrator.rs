//! Run Orchestrator: the `execute` entry point. Validates and scopes the
//! graph, bootstraps a run record, dispatches nodes level by level, and
//! finalizes the aggregate run status.

use crate::assets::persister::AssetPersister;
use crate::config::Settings;
use crate::db::connection::DatabasePool;
use crate::db::models::WorkflowRunRecord;
use crate::db::repositories::{NewRun, NodeRunRepository, RunRepository, WorkflowRepository};
use crate::executor::node_executor::{execute_node, ExecutionContext};
use crate::executor::remote_task::RemoteTaskRunner;
use crate::graph::algorithms::{execution_levels, subgraph_for_scope, validate_dag};
use crate::graph::model::{Edge, ExecutionScope, Node, WorkflowGraph};
use crate::resolver::{resolve_inputs, OutputMap};
use crate::run::models::{ExecuteRequest, NodeRunSummary, RunSummary};
use crate::{Result, WorkflowError};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub struct RunOrchestrator<'a> {
    pool: DatabasePool,
    runner: &'a dyn RemoteTaskRunner,
    persister: &'a AssetPersister,
    settings: &'a Settings,
}

impl<'a> RunOrchestrator<'a> {
    pub fn new(
        pool: DatabasePool,
        runner: &'a dyn RemoteTaskRunner,
        persister: &'a AssetPersister,
        settings: &'a Settings,
    ) -> Self {
        Self { pool, runner, persister, settings }
    }

    pub async fn execute(&self, request: ExecuteRequest, user_id: &str) -> Result<RunSummary> {
        let workflow = WorkflowRepository::find_owned(&self.pool, &request.workflow_id, user_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("workflow {}", request.workflow_id)))?;

        let version = WorkflowRepository::latest_version(&self.pool, &workflow.id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("version for workflow {}", workflow.id)))?;

        let all_nodes: Vec<Node> = serde_json::from_str(&version.nodes_json)?;
        let all_edges: Vec<Edge> = serde_json::from_str(&version.edges_json)?;

        let scoped = subgraph_for_scope(&all_nodes, &all_edges, request.scope, &request.selected_node_ids)?;

        if request.scope == ExecutionScope::Full && !scoped.nodes.iter().any(|n| n.kind.is_export()) {
            return Err(WorkflowError::MissingExportNode);
        }

        if !validate_dag(&scoped.nodes, &scoped.edges) {
            return Err(WorkflowError::InvalidDag);
        }
        let levels = execution_levels(&scoped.nodes, &scoped.edges)?;

        let (run, node_run_ids) = self.bootstrap_run(&workflow.id, &version.id, &request, user_id, &scoped).await?;

        let start = Instant::now();
        let mut node_summaries = self.run_levels(&scoped, &levels, &node_run_ids, user_id).await?;
        let duration_ms = start.elapsed().as_millis() as i64;

        let status = aggregate_status(&node_summaries);
        let error_summary = build_error_summary(&node_summaries);

        RunRepository::finalize(&self.pool, &run.id, status.as_str(), duration_ms, error_summary.as_deref()).await?;

        node_summaries.sort_by(|a, b| (a.started_at, &a.id).cmp(&(b.started_at, &b.id)));

        info!(run_id = run.id, status = status.as_str(), duration_ms, "run finalized");

        Ok(RunSummary {
            id: run.id,
            workflow_id: workflow.id,
            run_number: run.run_number,
            status: status.as_str().to_string(),
            duration_ms: Some(duration_ms),
            error_summary,
            node_runs: node_summaries,
        })
    }

    async fn bootstrap_run(
        &self,
        workflow_id: &str,
        version_id: &str,
        request: &ExecuteRequest,
        user_id: &str,
        scoped: &WorkflowGraph,
    ) -> Result<(WorkflowRunRecord, HashMap<String, String>)> {
        let mut tx = self.pool.begin().await.map_err(crate::db::DbError::from)?;

        let run_number = WorkflowRepository::increment_run_counter(&mut *tx, workflow_id).await?;

        let run_id = Uuid::new_v4().to_string();
        let selected_json = serde_json::to_string(&request.selected_node_ids)?;
        let run = RunRepository::create(
            &mut *tx,
            NewRun {
                id: &run_id,
                workflow_id,
                version_id,
                run_number,
                user_id,
                scope: scope_str(request.scope),
                selected_node_ids_json: &selected_json,
            },
        )
        .await?;

        let mut node_run_ids = HashMap::new();
        for node in &scoped.nodes {
            let node_run_id = Uuid::new_v4().to_string();
            NodeRunRepository::create_queued(&mut *tx, &node_run_id, &run.id, &node.id, node.kind.as_str()).await?;
            node_run_ids.insert(node.id.clone(), node_run_id);
        }

        tx.commit().await.map_err(crate::db::DbError::from)?;
        Ok((run, node_run_ids))
    }

    /// Runs each level to completion before advancing. Within a level,
    /// nodes run concurrently and a failure is captured, not propagated:
    /// it never cancels its siblings or aborts the run.
    async fn run_levels(
        &self,
        scoped: &WorkflowGraph,
        levels: &[Vec<Node>],
        node_run_ids: &HashMap<String, String>,
        user_id: &str,
    ) -> Result<Vec<NodeRunSummary>> {
        let nodes_by_id: HashMap<String, &Node> = scoped.nodes.iter().map(|n| (n.id.clone(), n)).collect();
        let mut outputs_so_far: HashMap<String, OutputMap> = HashMap::new();
        let mut summaries = Vec::new();

        for level in levels {
            let tasks = level.iter().map(|node| {
                let node_run_id = node_run_ids.get(&node.id).expect("bootstrap created every scoped node");
                self.run_one_node(node, &scoped.edges, &outputs_so_far, &nodes_by_id, node_run_id, user_id)
            });

            let results = join_all(tasks).await;

            // Published only after the whole level finishes: intra-level
            // writes touch disjoint node ids and are never read until here.
            for (node, (summary, outputs)) in level.iter().zip(results) {
                if let Some(outputs) = outputs {
                    outputs_so_far.insert(node.id.clone(), outputs);
                }
                summaries.push(summary);
            }
        }

        Ok(summaries)
    }

    async fn run_one_node(
        &self,
        node: &Node,
        edges: &[Edge],
        outputs_so_far: &HashMap<String, OutputMap>,
        nodes_by_id: &HashMap<String, &Node>,
        node_run_id: &str,
        user_id: &str,
    ) -> (NodeRunSummary, Option<OutputMap>) {
        let inputs = resolve_inputs(node, edges, outputs_so_far, nodes_by_id);
        let inputs_value = Value::Object(inputs.clone());
        let inputs_json = serde_json::to_string(&inputs_value).unwrap_or_default();
        if let Err(e) = NodeRunRepository::mark_running(&self.pool, node_run_id, &inputs_json).await {
            warn!(node_id = node.id, error = %e, "failed to persist running state");
        }

        let ctx = ExecutionContext {
            runner: self.runner,
            persister: self.persister,
            task_timeout: self.settings.task_timeout,
            poll_interval: self.settings.poll_interval,
            default_llm_model: &self.settings.default_llm_model,
            default_image_model: &self.settings.default_image_model,
            user_id,
        };

        let started_at = chrono::Utc::now();
        let outcome = execute_node(node, &inputs, &ctx).await;
        let finished_at = chrono::Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds();

        match outcome {
            Ok(node_outcome) => {
                let outputs_value = Value::Object(node_outcome.outputs.clone());
                let outputs_json = serde_json::to_string(&outputs_value).unwrap_or_default();
                let _ = NodeRunRepository::mark_succeeded(
                    &self.pool,
                    node_run_id,
                    &outputs_json,
                    duration_ms,
                    node_outcome.task_name.as_deref(),
                    node_outcome.remote_run_id.as_deref(),
                )
                .await;

                let mut outputs_map: OutputMap = HashMap::new();
                for (k, v) in node_outcome.outputs.iter() {
                    outputs_map.insert(k.clone(), v.clone());
                }

                (
                    NodeRunSummary {
                        id: node_run_id.to_string(),
                        node_id: node.id.clone(),
                        node_kind: node.kind.as_str().to_string(),
                        status: "SUCCESS".to_string(),
                        started_at: Some(started_at),
                        finished_at: Some(finished_at),
                        duration_ms: Some(duration_ms),
                        inputs: Some(inputs_value),
                        outputs: Some(outputs_value),
                        error_message: None,
                    },
                    Some(outputs_map),
                )
            }
            Err(err) => {
                let details = serde_json::json!({ "code": err.code(), "status": err.status_code() });
                let _ = NodeRunRepository::mark_failed(
                    &self.pool,
                    node_run_id,
                    &err.to_string(),
                    Some(&details.to_string()),
                    duration_ms,
                )
                .await;

                (
                    NodeRunSummary {
                        id: node_run_id.to_string(),
                        node_id: node.id.clone(),
                        node_kind: node.kind.as_str().to_string(),
                        status: "FAILED".to_string(),
                        started_at: Some(started_at),
                        finished_at: Some(finished_at),
                        duration_ms: Some(duration_ms),
                        inputs: Some(inputs_value),
                        outputs: None,
                        error_message: Some(err.to_string()),
                    },
                    None,
                )
            }
        }
    }
}

fn scope_str(scope: ExecutionScope) -> &'static str {
    match scope {
        ExecutionScope::Full => "FULL",
        ExecutionScope::Selected => "SELECTED",
        ExecutionScope::Single => "SINGLE",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AggregateStatus {
    Success,
    Failed,
    Partial,
}

impl AggregateStatus {
    fn as_str(&self) -> &'static str {
        match self {
            AggregateStatus::Success => "SUCCESS",
            AggregateStatus::Failed => "FAILED",
            AggregateStatus::Partial => "PARTIAL",
        }
    }
}

fn aggregate_status(summaries: &[NodeRunSummary]) -> AggregateStatus {
    let total = summaries.len();
    let succeeded = summaries.iter().filter(|s| s.status == "SUCCESS").count();
    if succeeded == total {
        AggregateStatus::Success
    } else if succeeded == 0 {
        AggregateStatus::Failed
    } else {
        AggregateStatus::Partial
    }
}

fn build_error_summary(summaries: &[NodeRunSummary]) -> Option<String> {
    let failures: Vec<String> = summaries
        .iter()
        .filter(|s| s.status == "FAILED")
        .take(3)
        .map(|s| format!("{}: {}", s.node_id, s.error_message.clone().unwrap_or_default()))
        .collect();
    if failures.is_empty() {
        None
    } else {
        Some(failures.join(" | "))
    }
}
