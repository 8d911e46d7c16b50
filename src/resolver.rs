//! Input Resolver: wires a producer's primary output into a consumer's
//! typed input slots, merging defaults and handling multi-connection
//! fan-in.
//!
//! The resolver is pure: it never fails on a missing value, it only
//! produces whatever can be produced from what is wired. Executors are
//! the ones who decide that an empty required slot is a [`crate::WorkflowError::MissingInput`].

use crate::graph::model::{Edge, Node, NodeKind};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Per-node output map, as published to the shared `outputs_so_far` table
/// between execution levels.
pub type OutputMap = HashMap<String, Value>;

/// Extracts the canonical value a node kind exposes to downstream
/// consumers, trying each candidate key in order and falling back to the
/// node's own authored data as a last resort.
fn primary_output<'a>(kind: NodeKind, outputs: &'a Value, node_data: &'a HashMap<String, Value>) -> Option<&'a Value> {
    let candidates: &[&str] = match kind {
        NodeKind::Text => &["text", "value"],
        NodeKind::UploadImage => &["imageUrl", "url"],
        NodeKind::UploadVideo => &["videoUrl", "url"],
        NodeKind::Llm => &["text", "response"],
        NodeKind::CropImage => &["croppedUrl", "imageUrl"],
        NodeKind::ExtractFrame => &["frameUrl", "extractedFrameUrl"],
        NodeKind::GenerateImage => &["imageUrl", "url"],
        NodeKind::ExportText | NodeKind::ExportImage | NodeKind::ExportVideo => &[],
    };

    for key in candidates {
        if let Some(v) = outputs.get(*key) {
            if !v.is_null() {
                return Some(v);
            }
        }
    }

    let data_fallback_key = match kind {
        NodeKind::Text => "value",
        NodeKind::UploadImage => "imageUrl",
        NodeKind::UploadVideo => "videoUrl",
        NodeKind::Llm => "response",
        NodeKind::CropImage => "croppedUrl",
        NodeKind::ExtractFrame => "extractedFrameUrl",
        NodeKind::GenerateImage => "imageUrl",
        NodeKind::ExportText | NodeKind::ExportImage | NodeKind::ExportVideo => return None,
    };
    node_data.get(data_fallback_key)
}

/// Resolves the inputs for `node` given the graph's incoming edges and the
/// outputs published by already-completed levels.
pub fn resolve_inputs(
    node: &Node,
    edges: &[Edge],
    outputs_so_far: &HashMap<String, OutputMap>,
    nodes_by_id: &HashMap<String, &Node>,
) -> Map<String, Value> {
    let mut resolved: Map<String, Value> = Map::new();

    for edge in edges.iter().filter(|e| e.target_node == node.id) {
        let Some(producer) = nodes_by_id.get(&edge.source_node) else {
            continue;
        };
        let empty_outputs = HashMap::new();
        let producer_outputs = outputs_so_far
            .get(&edge.source_node)
            .unwrap_or(&empty_outputs);

        let value = if producer.kind.is_export() {
            Some(Value::Object(
                producer_outputs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))
        } else {
            let outputs_value = Value::Object(
                producer_outputs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            );
            primary_output(producer.kind, &outputs_value, &producer.data).cloned()
        };

        let Some(value) = value else { continue };

        if edge.target_handle == "images" {
            let entry = resolved
                .entry(edge.target_handle.clone())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(arr) = entry {
                arr.push(value);
            }
        } else {
            resolved.insert(edge.target_handle.clone(), value);
        }
    }

    apply_defaults(node, &mut resolved);
    resolved
}

/// Merges per-kind defaults from the node's own authored data into any
/// slot the incoming edges left unfilled.
fn apply_defaults(node: &Node, resolved: &mut Map<String, Value>) {
    let defaults: &[(&str, &str)] = match node.kind {
        NodeKind::Llm => &[("system_prompt", "systemPrompt"), ("user_message", "userMessage")],
        NodeKind::CropImage => &[
            ("x_percent", "xPercent"),
            ("y_percent", "yPercent"),
            ("width_percent", "widthPercent"),
            ("height_percent", "heightPercent"),
        ],
        NodeKind::ExtractFrame => &[("timestamp", "timestamp")],
        NodeKind::GenerateImage => &[("prompt", "prompt")],
        _ => &[],
    };

    for (slot, data_key) in defaults {
        if !resolved.contains_key(*slot) {
            if let Some(v) = node.data.get(*data_key) {
                resolved.insert((*slot).to_string(), v.clone());
            }
        }
    }

    if node.kind == NodeKind::CropImage {
        for (slot, fallback) in [
            ("x_percent", 0.0),
            ("y_percent", 0.0),
            ("width_percent", 100.0),
            ("height_percent", 100.0),
        ] {
            resolved
                .entry(slot.to_string())
                .or_insert_with(|| serde_json::json!(fallback));
        }
    }
}

/// Coerces a resolved slot to a number, accepting either a JSON number or
/// a parseable string, falling back to `default` when neither is present.
pub fn coerce_number(resolved: &Map<String, Value>, slot: &str, default: f64) -> f64 {
    match resolved.get(slot) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(default),
        Some(Value::String(s)) => s.parse().unwrap_or(default),
        _ => default,
    }
}
