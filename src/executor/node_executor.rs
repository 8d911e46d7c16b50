//! Node Executor: per-kind dispatch. Passthrough kinds resolve locally;
//! compute kinds dispatch a named remote task; export/generate kinds
//! additionally persist a durable asset.

use crate::assets::persister::AssetPersister;
use crate::executor::remote_task::{trigger_and_poll, RemoteTaskRunner};
use crate::graph::model::{Node, NodeKind};
use crate::resolver::coerce_number;
use crate::{Result, WorkflowError};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Everything a single node execution needs beyond its resolved inputs.
pub struct ExecutionContext<'a> {
    pub runner: &'a dyn RemoteTaskRunner,
    pub persister: &'a AssetPersister,
    pub task_timeout: Duration,
    pub poll_interval: Duration,
    pub default_llm_model: &'a str,
    pub default_image_model: &'a str,
    pub user_id: &'a str,
}

/// Result of executing one node.
#[derive(Debug)]
pub struct NodeOutcome {
    pub outputs: Map<String, Value>,
    pub task_name: Option<String>,
    pub remote_run_id: Option<String>,
}

fn require_str<'a>(inputs: &'a Map<String, Value>, node_id: &str, key: &str) -> Result<&'a str> {
    inputs
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| WorkflowError::MissingInput {
            node_id: node_id.to_string(),
            handle: key.to_string(),
        })
}

/// Executes `node` against its resolved `inputs`.
pub async fn execute_node(
    node: &Node,
    inputs: &Map<String, Value>,
    ctx: &ExecutionContext<'_>,
) -> Result<NodeOutcome> {
    match node.kind {
        NodeKind::Text => {
            let value = node
                .data
                .get("value")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let mut outputs = Map::new();
            outputs.insert("text".into(), json!(value));
            outputs.insert("value".into(), json!(value));
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }

        NodeKind::UploadImage => {
            let url = node
                .data
                .get("imageUrl")
                .and_then(Value::as_str)
                .ok_or_else(|| WorkflowError::MissingInput {
                    node_id: node.id.clone(),
                    handle: "imageUrl".into(),
                })?;
            let mut outputs = Map::new();
            outputs.insert("imageUrl".into(), json!(url));
            outputs.insert("url".into(), json!(url));
            for key in ["assetId", "mimeType", "width", "height"] {
                if let Some(v) = node.data.get(key) {
                    outputs.insert(key.into(), v.clone());
                }
            }
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }

        NodeKind::UploadVideo => {
            let url = node
                .data
                .get("videoUrl")
                .and_then(Value::as_str)
                .ok_or_else(|| WorkflowError::MissingInput {
                    node_id: node.id.clone(),
                    handle: "videoUrl".into(),
                })?;
            let mut outputs = Map::new();
            outputs.insert("videoUrl".into(), json!(url));
            outputs.insert("url".into(), json!(url));
            for key in ["assetId", "mimeType", "durationMs", "width", "height"] {
                if let Some(v) = node.data.get(key) {
                    outputs.insert(key.into(), v.clone());
                }
            }
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }

        NodeKind::Llm => {
            let user_message = require_str(inputs, &node.id, "user_message")?;
            let system_prompt = inputs.get("system_prompt").and_then(Value::as_str).unwrap_or("");
            let images = inputs.get("images").cloned().unwrap_or(Value::Array(vec![]));
            let model = node
                .data
                .get("selectedModel")
                .and_then(Value::as_str)
                .unwrap_or(ctx.default_llm_model);

            let payload = json!({
                "model": model,
                "systemPrompt": system_prompt,
                "userMessage": user_message,
                "imageUrls": images,
            });
            let (remote_run_id, output) =
                trigger_and_poll(ctx.runner, "llm-execute", payload, ctx.task_timeout, ctx.poll_interval).await?;

            let text = output.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
            let mut outputs = Map::new();
            outputs.insert("text".into(), json!(text));
            outputs.insert("response".into(), json!(text));
            outputs.insert("model".into(), json!(model));
            Ok(NodeOutcome {
                outputs,
                task_name: Some("llm-execute".into()),
                remote_run_id: Some(remote_run_id),
            })
        }

        NodeKind::CropImage => {
            let image_url = require_str(inputs, &node.id, "image")?;
            let x = coerce_number(inputs, "x_percent", 0.0);
            let y = coerce_number(inputs, "y_percent", 0.0);
            let w = coerce_number(inputs, "width_percent", 100.0);
            let h = coerce_number(inputs, "height_percent", 100.0);

            let payload = json!({
                "imageUrl": image_url,
                "xPercent": x,
                "yPercent": y,
                "widthPercent": w,
                "heightPercent": h,
            });
            let (remote_run_id, output) =
                trigger_and_poll(ctx.runner, "crop-image", payload, ctx.task_timeout, ctx.poll_interval).await?;

            let cropped_url = output
                .get("croppedUrl")
                .and_then(Value::as_str)
                .ok_or(WorkflowError::InvalidGenerationOutput)?
                .to_string();
            let mut outputs = Map::new();
            outputs.insert("croppedUrl".into(), json!(cropped_url));
            outputs.insert("imageUrl".into(), json!(cropped_url));
            Ok(NodeOutcome {
                outputs,
                task_name: Some("crop-image".into()),
                remote_run_id: Some(remote_run_id),
            })
        }

        NodeKind::ExtractFrame => {
            let video_url = require_str(inputs, &node.id, "video")?;
            let timestamp = inputs.get("timestamp").cloned().unwrap_or(json!(0));

            let payload = json!({ "videoUrl": video_url, "timestamp": timestamp });
            let (remote_run_id, output) =
                trigger_and_poll(ctx.runner, "extract-frame", payload, ctx.task_timeout, ctx.poll_interval).await?;

            let frame_url = output
                .get("frameUrl")
                .and_then(Value::as_str)
                .ok_or(WorkflowError::InvalidGenerationOutput)?
                .to_string();
            let mut outputs = Map::new();
            outputs.insert("frameUrl".into(), json!(frame_url));
            outputs.insert("extractedFrameUrl".into(), json!(frame_url.clone()));
            outputs.insert("imageUrl".into(), json!(frame_url));
            Ok(NodeOutcome {
                outputs,
                task_name: Some("extract-frame".into()),
                remote_run_id: Some(remote_run_id),
            })
        }

        NodeKind::GenerateImage => {
            let prompt = require_str(inputs, &node.id, "prompt")?;
            let model = node
                .data
                .get("selectedModel")
                .and_then(Value::as_str)
                .unwrap_or(ctx.default_image_model);
            let reference_a = inputs.get("reference_a").cloned();
            let reference_b = inputs.get("reference_b").cloned();

            let payload = json!({
                "model": model,
                "prompt": prompt,
                "referenceA": reference_a,
                "referenceB": reference_b,
            });
            let (remote_run_id, output) =
                trigger_and_poll(ctx.runner, "generate-image", payload, ctx.task_timeout, ctx.poll_interval).await?;

            let source_url = output
                .get("imageUrl")
                .and_then(Value::as_str)
                .ok_or(WorkflowError::InvalidGenerationOutput)?;

            let asset = ctx
                .persister
                .persist_from_url(ctx.user_id, crate::assets::persister::AssetKind::Image, source_url, None, None)
                .await?;

            let mut outputs = Map::new();
            outputs.insert("imageUrl".into(), json!(asset.url));
            outputs.insert("url".into(), json!(asset.url));
            outputs.insert("assetId".into(), json!(asset.id));
            outputs.insert("provider".into(), json!(asset.provider));
            Ok(NodeOutcome {
                outputs,
                task_name: Some("generate-image".into()),
                remote_run_id: Some(remote_run_id),
            })
        }

        NodeKind::ExportText => {
            let text = require_str(inputs, &node.id, "text")?.to_string();
            let mut outputs = Map::new();
            outputs.insert("text".into(), json!(text));
            outputs.insert("value".into(), json!(text));
            outputs.insert("format".into(), json!("txt"));
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }

        NodeKind::ExportImage => {
            let url = require_str(inputs, &node.id, "image")?;
            if !looks_like(url, &["image", ".png", ".jpg", ".jpeg", ".webp", ".gif"]) {
                return Err(WorkflowError::InvalidMediaType {
                    node_id: node.id.clone(),
                    expected: "image".into(),
                });
            }
            let asset = ctx
                .persister
                .persist_from_url(ctx.user_id, crate::assets::persister::AssetKind::Image, url, None, None)
                .await?;
            let mut outputs = Map::new();
            outputs.insert("imageUrl".into(), json!(asset.url));
            outputs.insert("url".into(), json!(asset.url));
            outputs.insert("assetId".into(), json!(asset.id));
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }

        NodeKind::ExportVideo => {
            let url = require_str(inputs, &node.id, "video")?;
            if !looks_like(url, &["video", ".mp4", ".mov", ".webm"]) {
                return Err(WorkflowError::InvalidMediaType {
                    node_id: node.id.clone(),
                    expected: "video".into(),
                });
            }
            let asset = ctx
                .persister
                .persist_from_url(ctx.user_id, crate::assets::persister::AssetKind::Video, url, None, None)
                .await?;
            let mut outputs = Map::new();
            outputs.insert("videoUrl".into(), json!(asset.url));
            outputs.insert("url".into(), json!(asset.url));
            outputs.insert("assetId".into(), json!(asset.id));
            Ok(NodeOutcome { outputs, task_name: None, remote_run_id: None })
        }
    }
}

fn looks_like(url: &str, needles: &[&str]) -> bool {
    let lower = url.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::persister::AssetPersister;
    use crate::executor::remote_task::LocalFallbackTaskRunner;

    fn ctx<'a>(runner: &'a LocalFallbackTaskRunner, persister: &'a AssetPersister) -> ExecutionContext<'a> {
        ExecutionContext {
            runner,
            persister,
            task_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            default_llm_model: "gpt",
            default_image_model: "diffusion",
            user_id: "user-1",
        }
    }

    #[tokio::test]
    async fn text_node_outputs_literal_value() {
        let node = Node::new("a", NodeKind::Text).with_data("value", json!("hello"));
        let runner = LocalFallbackTaskRunner;
        let persister = AssetPersister::unconfigured();
        let outcome = execute_node(&node, &Map::new(), &ctx(&runner, &persister)).await.unwrap();
        assert_eq!(outcome.outputs.get("text"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn llm_requires_user_message() {
        let node = Node::new("a", NodeKind::Llm);
        let runner = LocalFallbackTaskRunner;
        let persister = AssetPersister::unconfigured();
        let err = execute_node(&node, &Map::new(), &ctx(&runner, &persister)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingInput { .. }));
    }

    #[tokio::test]
    async fn export_image_rejects_video_url() {
        let node = Node::new("a", NodeKind::ExportImage);
        let mut inputs = Map::new();
        inputs.insert("image".into(), json!("https://cdn.example.com/clip.mp4"));
        let runner = LocalFallbackTaskRunner;
        let persister = AssetPersister::unconfigured();
        let err = execute_node(&node, &inputs, &ctx(&runner, &persister)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidMediaType { .. }));
    }
}
