//! Durable asset persistence, idempotent on `(provider, url)`.

use crate::assets::persister::DurableAsset;
use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;

pub struct AssetRepository;

impl AssetRepository {
    /// Returns the existing row for `(provider, url)` if present, else
    /// inserts a new one. This is what gives asset ingestion its
    /// idempotency: re-resolving the same remote file never duplicates it.
    pub async fn upsert_by_provider_url(
        pool: &DatabasePool,
        user_id: &str,
        kind: &str,
        url: &str,
        provider: &str,
        assembly_id: Option<&str>,
        mime_type: Option<&str>,
    ) -> DbResult<DurableAsset> {
        const COLUMNS: &str = "id, user_id, kind, url, provider, assembly_id, mime_type";

        if let Some(existing) = sqlx::query_as::<_, DurableAsset>(&format!(
            "SELECT {COLUMNS} FROM assets WHERE provider = ? AND url = ?"
        ))
        .bind(provider)
        .bind(url)
        .fetch_optional(pool)
        .await?
        {
            return Ok(existing);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let record = sqlx::query_as::<_, DurableAsset>(&format!(
            "INSERT INTO assets (id, user_id, kind, url, provider, assembly_id, mime_type)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(provider, url) DO UPDATE SET provider = excluded.provider
             RETURNING {COLUMNS}"
        ))
        .bind(&id)
        .bind(user_id)
        .bind(kind)
        .bind(url)
        .bind(provider)
        .bind(assembly_id)
        .bind(mime_type)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;

    async fn setup() -> DatabaseConnection {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        conn
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let conn = setup().await;
        let first = AssetRepository::upsert_by_provider_url(
            conn.pool(),
            "u1",
            "IMAGE",
            "https://cdn.example.com/a.jpg",
            "cloudinary",
            None,
            Some("image/jpeg"),
        )
        .await
        .unwrap();

        let second = AssetRepository::upsert_by_provider_url(
            conn.pool(),
            "u1",
            "IMAGE",
            "https://cdn.example.com/a.jpg",
            "cloudinary",
            None,
            Some("image/jpeg"),
        )
        .await
        .unwrap();

        assert_eq!(first.id, second.id);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets")
            .fetch_one(conn.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
