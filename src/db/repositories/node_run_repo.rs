//! Per-node execution record persistence.

use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;
use crate::db::models::NodeRunRecord;

pub struct NodeRunRepository;

impl NodeRunRepository {
    pub async fn create_queued(
        executor: &mut sqlx::SqliteConnection,
        id: &str,
        run_id: &str,
        node_id: &str,
        node_kind: &str,
    ) -> DbResult<NodeRunRecord> {
        let record = sqlx::query_as::<_, NodeRunRecord>(
            "INSERT INTO node_runs (id, run_id, node_id, node_kind, status)
             VALUES (?, ?, ?, ?, 'QUEUED')
             RETURNING *",
        )
        .bind(id)
        .bind(run_id)
        .bind(node_id)
        .bind(node_kind)
        .fetch_one(&mut *executor)
        .await?;
        Ok(record)
    }

    pub async fn mark_running(pool: &DatabasePool, id: &str, inputs_json: &str) -> DbResult<()> {
        sqlx::query(
            "UPDATE node_runs SET status = 'RUNNING', inputs_json = ?, started_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(inputs_json)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_succeeded(
        pool: &DatabasePool,
        id: &str,
        outputs_json: &str,
        duration_ms: i64,
        task_name: Option<&str>,
        remote_run_id: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE node_runs
             SET status = 'SUCCESS', outputs_json = ?, duration_ms = ?, task_name = ?, remote_run_id = ?,
                 finished_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(outputs_json)
        .bind(duration_ms)
        .bind(task_name)
        .bind(remote_run_id)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_failed(
        pool: &DatabasePool,
        id: &str,
        error_message: &str,
        error_details_json: Option<&str>,
        duration_ms: i64,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE node_runs
             SET status = 'FAILED', error_message = ?, error_details_json = ?, duration_ms = ?,
                 finished_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(error_message)
        .bind(error_details_json)
        .bind(duration_ms)
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_run(pool: &DatabasePool, run_id: &str) -> DbResult<Vec<NodeRunRecord>> {
        let records = sqlx::query_as::<_, NodeRunRecord>(
            "SELECT * FROM node_runs WHERE run_id = ? ORDER BY started_at ASC, id ASC",
        )
        .bind(run_id)
        .fetch_all(pool)
        .await?;
        Ok(records)
    }
}
