//! Execution core for the visual workflow builder.
//!
//! Validates a user-authored node graph, schedules it into dependency
//! levels, resolves typed inputs between nodes, dispatches each node to a
//! built-in handler or a remote task runner, and persists a durable run
//! record.

pub mod api;
pub mod assets;
pub mod config;
pub mod db;
pub mod executor;
pub mod graph;
pub mod resolver;
pub mod run;
pub mod version;

use thiserror::Error;

/// Errors surfaced by the workflow execution core.
///
/// Each variant carries the HTTP status it maps to at the API boundary
/// (see [`WorkflowError::status_code`]) and the machine-readable code used
/// in API error bodies (see [`WorkflowError::code`]).
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("execution scope selected no nodes")]
    InvalidScope,

    #[error("full-workflow runs require at least one export node")]
    MissingExportNode,

    #[error("graph contains a cycle")]
    InvalidDag,

    #[error("unknown node kind: {0}")]
    InvalidNodeType(String),

    #[error("missing required input '{handle}' on node '{node_id}'")]
    MissingInput { node_id: String, handle: String },

    #[error("media type mismatch on node '{node_id}': expected {expected}")]
    InvalidMediaType { node_id: String, expected: String },

    #[error("durable asset provider is not configured")]
    ProviderNotConfigured,

    #[error("task '{task_name}' timed out after {timeout_ms}ms")]
    TaskTimeout { task_name: String, timeout_ms: u64 },

    #[error("task '{task_name}' failed: {message}")]
    TaskFailed {
        task_name: String,
        remote_run_id: Option<String>,
        message: String,
    },

    #[error("generation task produced no usable output")]
    InvalidGenerationOutput,

    #[error("assembly '{assembly_id}' is still in progress")]
    AssemblyInProgress {
        assembly_id: String,
        retry_after_ms: u64,
    },

    #[error("assembly '{assembly_id}' failed terminally")]
    AssemblyTerminalFailure { assembly_id: String },

    #[error("assembly '{assembly_id}' produced a {actual} result, expected {expected}")]
    AssemblyWrongType {
        assembly_id: String,
        expected: String,
        actual: String,
    },

    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for workflow execution core operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;

impl WorkflowError {
    /// Machine-readable error code used in API responses, per the error table.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotFound(_) => "NOT_FOUND",
            WorkflowError::Validation(_) => "VALIDATION_ERROR",
            WorkflowError::InvalidScope => "INVALID_SCOPE",
            WorkflowError::MissingExportNode => "MISSING_EXPORT_NODE",
            WorkflowError::InvalidDag => "INVALID_DAG",
            WorkflowError::InvalidNodeType(_) => "INVALID_NODE_TYPE",
            WorkflowError::MissingInput { .. } => "MISSING_INPUT",
            WorkflowError::InvalidMediaType { .. } => "INVALID_MEDIA_TYPE",
            WorkflowError::ProviderNotConfigured => "PROVIDER_NOT_CONFIGURED",
            WorkflowError::TaskTimeout { .. } => "TASK_TIMEOUT",
            WorkflowError::TaskFailed { .. } => "TASK_FAILED",
            WorkflowError::InvalidGenerationOutput => "INVALID_GENERATION_OUTPUT",
            WorkflowError::AssemblyInProgress { .. } => "ASSEMBLY_IN_PROGRESS",
            WorkflowError::AssemblyTerminalFailure { .. } => "ASSEMBLY_TERMINAL_FAILURE",
            WorkflowError::AssemblyWrongType { expected, .. } if expected == "video" => {
                "VIDEO_RESULT_NOT_VIDEO"
            }
            WorkflowError::AssemblyWrongType { .. } => "IMAGE_RESULT_NOT_IMAGE",
            WorkflowError::Database(e) if e.is_not_found() => "NOT_FOUND",
            WorkflowError::Database(_) => "DATABASE_ERROR",
            WorkflowError::Serialization(_) => "SERIALIZATION_ERROR",
            WorkflowError::Http(_) => "HTTP_ERROR",
        }
    }

    /// HTTP status this error maps to at the API boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            WorkflowError::NotFound(_) => 404,
            WorkflowError::Validation(_)
            | WorkflowError::InvalidScope
            | WorkflowError::MissingExportNode
            | WorkflowError::InvalidDag
            | WorkflowError::InvalidNodeType(_)
            | WorkflowError::MissingInput { .. }
            | WorkflowError::InvalidMediaType { .. } => 400,
            WorkflowError::AssemblyWrongType { .. } => 422,
            WorkflowError::AssemblyInProgress { .. } => 202,
            WorkflowError::AssemblyTerminalFailure { .. } => 409,
            WorkflowError::ProviderNotConfigured => 500,
            WorkflowError::TaskTimeout { .. } => 504,
            WorkflowError::TaskFailed { .. } | WorkflowError::InvalidGenerationOutput => 502,
            // A not-found DB lookup (e.g. a run id that doesn't belong to the
            // caller) is a 404, not a server error; everything else wrapping
            // sqlx is genuinely unexpected.
            WorkflowError::Database(e) if e.is_not_found() => 404,
            WorkflowError::Database(_) | WorkflowError::Serialization(_) => 500,
            WorkflowError::Http(_) => 502,
        }
    }
}
