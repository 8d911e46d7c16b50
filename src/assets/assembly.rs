//! Assembly Resolver: flattens a remote media-processing assembly's
//! `results`/`uploads` groups into candidate files and extracts the one
//! matching the requested output type.

use crate::assets::persister::AssetKind;
use crate::executor::retry::{is_transient_status, retry_get, AttemptOutcome};
use crate::{Result, WorkflowError};
use serde_json::Value;

/// A single file entry found in an assembly payload.
#[derive(Debug, Clone)]
pub struct AssemblyFile {
    pub step_name: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub is_temp: bool,
}

#[derive(Debug)]
pub struct AssemblyResolution {
    pub url: String,
    pub mime_type: Option<String>,
    pub is_temp_url: bool,
}

const COMPLETED: &str = "ASSEMBLY_COMPLETED";
const IN_PROGRESS: [&str; 4] = [
    "ASSEMBLY_UPLOADING",
    "ASSEMBLY_EXECUTING",
    "ASSEMBLY_IMPORTING",
    "ASSEMBLY_WAITING",
];
const TERMINAL_FAILURE: [&str; 4] = [
    "REQUEST_ABORTED",
    "ASSEMBLY_CANCELED",
    "ASSEMBLY_EXECUTION_REJECTED",
    "ASSEMBLY_ABORTED",
];

/// Fetches the assembly status document, retrying transient failures via
/// [`retry_get`]. A fetch that never succeeds is treated the same as a
/// terminal assembly failure: there is nothing further to resolve.
pub async fn fetch_assembly(client: &reqwest::Client, base_url: &str, assembly_id: &str) -> Result<Value> {
    let url = format!("{base_url}/{assembly_id}");
    retry_get("assembly fetch", || async {
        match client.get(&url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if resp.status().is_success() {
                    match resp.json::<Value>().await {
                        Ok(body) => AttemptOutcome::Success(body),
                        Err(err) => AttemptOutcome::TransportError(err),
                    }
                } else if is_transient_status(status) {
                    AttemptOutcome::TransientStatus(status)
                } else {
                    AttemptOutcome::PermanentStatus(status)
                }
            }
            Err(err) => AttemptOutcome::TransportError(err),
        }
    })
    .await
    .map_err(|_| WorkflowError::AssemblyTerminalFailure { assembly_id: assembly_id.to_string() })
}

/// Classifies an assembly's `ok` field and resolves its output, per the
/// terminal-state table: completed assemblies are resolved, in-progress
/// ones report a retry delay, everything else (named terminal failures,
/// an `error` field, or an unrecognized status) is a terminal failure.
pub fn resolve_assembly_output(
    assembly: &Value,
    assembly_id: &str,
    expected_kind: AssetKind,
    allow_temp: bool,
) -> Result<AssemblyResolution> {
    let ok = assembly.get("ok").and_then(Value::as_str).unwrap_or("");
    let has_error = assembly.get("error").map(|e| !e.is_null()).unwrap_or(false);

    if ok == COMPLETED && !has_error {
        let files = flatten_files(assembly);
        let expected_str = match expected_kind {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
        };

        let mut wrong_type_seen = false;
        for file in &files {
            if file.is_temp && !allow_temp {
                continue;
            }
            match classify(file, expected_kind) {
                Some(true) => {
                    return Ok(AssemblyResolution {
                        url: file.url.clone(),
                        mime_type: file.mime_type.clone(),
                        is_temp_url: file.is_temp,
                    })
                }
                Some(false) => wrong_type_seen = true,
                None => {}
            }
        }

        if wrong_type_seen {
            let actual = match expected_kind {
                AssetKind::Image => "video",
                AssetKind::Video => "image",
            };
            return Err(WorkflowError::AssemblyWrongType {
                assembly_id: assembly_id.to_string(),
                expected: expected_str.to_string(),
                actual: actual.to_string(),
            });
        }

        return Err(WorkflowError::AssemblyTerminalFailure {
            assembly_id: assembly_id.to_string(),
        });
    }

    if IN_PROGRESS.contains(&ok) {
        return Err(WorkflowError::AssemblyInProgress {
            assembly_id: assembly_id.to_string(),
            retry_after_ms: 1500,
        });
    }

    // TERMINAL_FAILURE, an explicit error, or an unrecognized status all
    // resolve to the same terminal failure per the classification table.
    let _ = TERMINAL_FAILURE;
    Err(WorkflowError::AssemblyTerminalFailure {
        assembly_id: assembly_id.to_string(),
    })
}

/// `Some(true)` matches the expected kind, `Some(false)` matches the
/// opposite kind, `None` is neither (e.g. an unrecognized MIME/extension).
fn classify(file: &AssemblyFile, expected: AssetKind) -> Option<bool> {
    let mime = file.mime_type.as_deref().unwrap_or("");
    let lower_url = file.url.to_lowercase();

    let is_image = mime.starts_with("image/")
        || [".png", ".jpg", ".jpeg", ".webp", ".gif"].iter().any(|e| lower_url.ends_with(e));
    let is_video = mime.starts_with("video/")
        || [".mp4", ".mov", ".webm"].iter().any(|e| lower_url.ends_with(e));

    match (expected, is_image, is_video) {
        (AssetKind::Image, true, _) => Some(true),
        (AssetKind::Video, _, true) => Some(true),
        (AssetKind::Image, _, true) => Some(false),
        (AssetKind::Video, true, _) => Some(false),
        _ => None,
    }
}

/// Flattens `results` groups first, then `uploads`, into file entries.
fn flatten_files(assembly: &Value) -> Vec<AssemblyFile> {
    let mut files = Vec::new();
    if let Some(results) = assembly.get("results").and_then(Value::as_object) {
        for (step_name, entries) in results {
            if let Some(arr) = entries.as_array() {
                for entry in arr {
                    if let Some(file) = file_from_entry(step_name, entry) {
                        files.push(file);
                    }
                }
            }
        }
    }
    if let Some(uploads) = assembly.get("uploads").and_then(Value::as_array) {
        for entry in uploads {
            if let Some(file) = file_from_entry("uploads", entry) {
                files.push(file);
            }
        }
    }
    files
}

fn file_from_entry(step_name: &str, entry: &Value) -> Option<AssemblyFile> {
    let url = entry
        .get("ssl_url")
        .or_else(|| entry.get("url"))
        .and_then(Value::as_str)?
        .to_string();
    let mime_type = entry.get("mime").and_then(Value::as_str).map(str::to_string);
    let is_temp = entry.get("is_tmp_url").and_then(Value::as_bool).unwrap_or(false);
    Some(AssemblyFile { step_name: step_name.to_string(), url, mime_type, is_temp })
}
