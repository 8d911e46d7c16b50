//! Asset Persister: makes a remote task's source URL durable by uploading
//! it (or recognizing it already lives on the provider) and recording it
//! in storage, keyed idempotently on `(provider, url)`.

use crate::db::repositories::asset_repo::AssetRepository;
use crate::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "IMAGE",
            AssetKind::Video => "VIDEO",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DurableAsset {
    pub id: String,
    pub user_id: String,
    pub kind: String,
    pub url: String,
    pub provider: String,
    pub assembly_id: Option<String>,
    pub mime_type: Option<String>,
}

/// Credentials for the durable media provider, loaded from `DURABLE_PROVIDER_*`.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub api_key: String,
    pub upload_url: String,
}

pub struct AssetPersister {
    client: reqwest::Client,
    provider: Option<ProviderConfig>,
    pool: Option<SqlitePool>,
}

impl AssetPersister {
    pub fn new(pool: SqlitePool, provider: Option<ProviderConfig>) -> Self {
        Self { client: reqwest::Client::new(), provider, pool: Some(pool) }
    }

    /// A persister with neither a provider nor storage wired up, for unit
    /// tests of node executors whose paths don't reach asset persistence.
    pub fn unconfigured() -> Self {
        Self { client: reqwest::Client::new(), provider: None, pool: None }
    }

    fn is_already_durable(&self, url: &str) -> bool {
        match &self.provider {
            Some(p) => url.contains(&host_of(&p.upload_url)),
            None => false,
        }
    }

    /// Makes `source_url` durable and returns its stored record. Idempotent
    /// on `(provider, url)`.
    pub async fn persist_from_url(
        &self,
        user_id: &str,
        kind: AssetKind,
        source_url: &str,
        assembly_id: Option<&str>,
        mime_hint: Option<&str>,
    ) -> Result<DurableAsset> {
        let Some(pool) = &self.pool else {
            return Err(WorkflowError::ProviderNotConfigured);
        };

        if self.is_already_durable(source_url) {
            let provider_name = self.provider.as_ref().map(|p| p.name.as_str()).unwrap_or("unknown");
            return AssetRepository::upsert_by_provider_url(
                pool,
                user_id,
                kind.as_str(),
                source_url,
                provider_name,
                assembly_id,
                mime_hint,
            )
            .await
            .map_err(Into::into);
        }

        let provider = self.provider.as_ref().ok_or(WorkflowError::ProviderNotConfigured)?;
        let durable_url = self.upload_from_url(provider, source_url).await?;
        let mime_type = mime_hint
            .map(str::to_string)
            .or_else(|| infer_mime(&durable_url, kind));

        AssetRepository::upsert_by_provider_url(
            pool,
            user_id,
            kind.as_str(),
            &durable_url,
            &provider.name,
            assembly_id,
            mime_type.as_deref(),
        )
        .await
        .map_err(Into::into)
    }

    async fn upload_from_url(&self, provider: &ProviderConfig, source_url: &str) -> Result<String> {
        #[derive(serde::Serialize)]
        struct UploadRequest<'a> {
            url: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct UploadResponse {
            secure_url: String,
        }

        let resp = self
            .client
            .post(&provider.upload_url)
            .bearer_auth(&provider.api_key)
            .json(&UploadRequest { url: source_url })
            .send()
            .await?
            .error_for_status()?
            .json::<UploadResponse>()
            .await?;
        Ok(resp.secure_url)
    }
}

fn host_of(url: &str) -> String {
    url.split("://")
        .nth(1)
        .and_then(|rest| rest.split('/').next())
        .unwrap_or(url)
        .to_string()
}

fn infer_mime(url: &str, kind: AssetKind) -> Option<String> {
    let lower = url.to_lowercase();
    let inferred = match kind {
        AssetKind::Image => {
            if lower.ends_with(".png") {
                "image/png"
            } else if lower.ends_with(".webp") {
                "image/webp"
            } else if lower.ends_with(".gif") {
                "image/gif"
            } else {
                "image/jpeg"
            }
        }
        AssetKind::Video => {
            if lower.ends_with(".webm") {
                "video/webm"
            } else if lower.ends_with(".mov") {
                "video/quicktime"
            } else {
                "video/mp4"
            }
        }
    };
    Some(inferred.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_jpeg_as_default_image_mime() {
        assert_eq!(infer_mime("https://cdn.example.com/a", AssetKind::Image), Some("image/jpeg".into()));
    }

    #[test]
    fn infers_mp4_as_default_video_mime() {
        assert_eq!(infer_mime("https://cdn.example.com/a", AssetKind::Video), Some("video/mp4".into()));
    }

    #[test]
    fn host_of_strips_scheme_and_path() {
        assert_eq!(host_of("https://res.cloudinary.com/demo/upload"), "res.cloudinary.com");
    }

    #[tokio::test]
    async fn unconfigured_persister_fails_closed() {
        let persister = AssetPersister::unconfigured();
        let err = persister
            .persist_from_url("user-1", AssetKind::Image, "https://example.com/a.jpg", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ProviderNotConfigured));
    }
}
