//! Workflow lookup and the atomic run-counter increment.

use crate::db::connection::DatabasePool;
use crate::db::error::DbResult;
use crate::db::models::{WorkflowRecord, WorkflowVersionRecord};

pub struct WorkflowRepository;

impl WorkflowRepository {
    pub async fn find_owned(pool: &DatabasePool, id: &str, user_id: &str) -> DbResult<Option<WorkflowRecord>> {
        let record = sqlx::query_as::<_, WorkflowRecord>(
            "SELECT * FROM workflows WHERE id = ? AND user_id = ?",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    pub async fn latest_version(pool: &DatabasePool, workflow_id: &str) -> DbResult<Option<WorkflowVersionRecord>> {
        let record = sqlx::query_as::<_, WorkflowVersionRecord>(
            "SELECT * FROM workflow_versions WHERE workflow_id = ? ORDER BY version_number DESC LIMIT 1",
        )
        .bind(workflow_id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    /// Atomically increments `run_counter` and returns the new value. Must
    /// be called within the same transaction that creates the run and its
    /// node runs, per the run bootstrap invariant.
    pub async fn increment_run_counter(
        executor: &mut sqlx::SqliteConnection,
        workflow_id: &str,
    ) -> DbResult<i64> {
        sqlx::query("UPDATE workflows SET run_counter = run_counter + 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(workflow_id)
            .execute(&mut *executor)
            .await?;

        let (run_number,): (i64,) =
            sqlx::query_as("SELECT run_counter FROM workflows WHERE id = ?")
                .bind(workflow_id)
                .fetch_one(&mut *executor)
                .await?;
        Ok(run_number)
    }
}
