//! Node, edge and graph types authored by the workflow editor.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Typed data carried across an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Image,
    Video,
}

/// The closed set of node kinds the executor knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Text,
    UploadImage,
    UploadVideo,
    Llm,
    CropImage,
    ExtractFrame,
    GenerateImage,
    ExportText,
    ExportImage,
    ExportVideo,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Text => "text",
            NodeKind::UploadImage => "upload_image",
            NodeKind::UploadVideo => "upload_video",
            NodeKind::Llm => "llm",
            NodeKind::CropImage => "crop_image",
            NodeKind::ExtractFrame => "extract_frame",
            NodeKind::GenerateImage => "generate_image",
            NodeKind::ExportText => "export_text",
            NodeKind::ExportImage => "export_image",
            NodeKind::ExportVideo => "export_video",
        }
    }

    pub fn parse(s: &str) -> Option<NodeKind> {
        Some(match s {
            "text" => NodeKind::Text,
            "upload_image" => NodeKind::UploadImage,
            "upload_video" => NodeKind::UploadVideo,
            "llm" => NodeKind::Llm,
            "crop_image" => NodeKind::CropImage,
            "extract_frame" => NodeKind::ExtractFrame,
            "generate_image" => NodeKind::GenerateImage,
            "export_text" => NodeKind::ExportText,
            "export_image" => NodeKind::ExportImage,
            "export_video" => NodeKind::ExportVideo,
            _ => return None,
        })
    }

    pub fn is_export(&self) -> bool {
        matches!(
            self,
            NodeKind::ExportText | NodeKind::ExportImage | NodeKind::ExportVideo
        )
    }
}

/// A node authored in the graph editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub selected: bool,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            data: HashMap::new(),
            selected: false,
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A typed connection between a producer's output handle and a
/// consumer's input handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source_node: String,
    pub source_handle: String,
    pub target_node: String,
    pub target_handle: String,
}

/// An immutable snapshot of a workflow's nodes and edges, already reduced
/// to whatever scope the caller requested.
#[derive(Debug, Clone, Default)]
pub struct WorkflowGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowGraph {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.target_node == node_id)
    }
}

/// The scope requested for a run: the whole graph, an explicit selection,
/// or a single node (each reduced to the selection's upstream closure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionScope {
    Full,
    Selected,
    Single,
}
