//! Workflow run persistence.

use crate::db::connection::DatabasePool;
use crate::db::error::{DbError, DbResult};
use crate::db::models::WorkflowRunRecord;

pub struct RunRepository;

pub struct NewRun<'a> {
    pub id: &'a str,
    pub workflow_id: &'a str,
    pub version_id: &'a str,
    pub run_number: i64,
    pub user_id: &'a str,
    pub scope: &'a str,
    pub selected_node_ids_json: &'a str,
}

impl RunRepository {
    /// Creates the run row. Called inside the same transaction as
    /// [`crate::db::repositories::workflow_repo::WorkflowRepository::increment_run_counter`]
    /// and the per-node bootstrap inserts.
    pub async fn create(executor: &mut sqlx::SqliteConnection, new_run: NewRun<'_>) -> DbResult<WorkflowRunRecord> {
        let record = sqlx::query_as::<_, WorkflowRunRecord>(
            "INSERT INTO workflow_runs
                (id, workflow_id, version_id, run_number, user_id, scope, selected_node_ids_json, status, started_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'RUNNING', CURRENT_TIMESTAMP)
             RETURNING *",
        )
        .bind(new_run.id)
        .bind(new_run.workflow_id)
        .bind(new_run.version_id)
        .bind(new_run.run_number)
        .bind(new_run.user_id)
        .bind(new_run.scope)
        .bind(new_run.selected_node_ids_json)
        .fetch_one(&mut *executor)
        .await?;
        Ok(record)
    }

    pub async fn finalize(
        pool: &DatabasePool,
        run_id: &str,
        status: &str,
        duration_ms: i64,
        error_summary: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE workflow_runs
             SET status = ?, duration_ms = ?, error_summary = ?, finished_at = CURRENT_TIMESTAMP
             WHERE id = ?",
        )
        .bind(status)
        .bind(duration_ms)
        .bind(error_summary)
        .bind(run_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Looks up a run, scoped to its owner so one caller can never read
    /// another's history by guessing an id.
    pub async fn find_owned(pool: &DatabasePool, run_id: &str, user_id: &str) -> DbResult<WorkflowRunRecord> {
        sqlx::query_as::<_, WorkflowRunRecord>("SELECT * FROM workflow_runs WHERE id = ? AND user_id = ?")
            .bind(run_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| DbError::not_found(format!("run {run_id}")))
    }

    pub async fn list_for_workflow(
        pool: &DatabasePool,
        workflow_id: &str,
        user_id: &str,
        limit: i64,
        before_run_number: Option<i64>,
    ) -> DbResult<Vec<WorkflowRunRecord>> {
        let records = match before_run_number {
            Some(cursor) => {
                sqlx::query_as::<_, WorkflowRunRecord>(
                    "SELECT * FROM workflow_runs
                     WHERE workflow_id = ? AND user_id = ? AND run_number < ?
                     ORDER BY run_number DESC
                     LIMIT ?",
                )
                .bind(workflow_id)
                .bind(user_id)
                .bind(cursor)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, WorkflowRunRecord>(
                    "SELECT * FROM workflow_runs
                     WHERE workflow_id = ? AND user_id = ?
                     ORDER BY run_number DESC
                     LIMIT ?",
                )
                .bind(workflow_id)
                .bind(user_id)
                .bind(limit)
                .fetch_all(pool)
                .await?
            }
        };
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::DatabaseConnection;

    async fn setup() -> DatabaseConnection {
        let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
        conn.run_migrations().await.unwrap();
        sqlx::query("INSERT INTO workflows (id, user_id, name) VALUES ('w1', 'u1', 'demo')")
            .execute(conn.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO workflow_versions (id, workflow_id, version_number, nodes_json, edges_json) VALUES ('v1', 'w1', 1, '[]', '[]')",
        )
        .execute(conn.pool())
        .await
        .unwrap();
        conn
    }

    #[tokio::test]
    async fn create_then_finalize_round_trips() {
        let conn = setup().await;
        let mut tx = conn.pool().acquire().await.unwrap();
        let run = RunRepository::create(
            &mut tx,
            NewRun {
                id: "r1",
                workflow_id: "w1",
                version_id: "v1",
                run_number: 1,
                user_id: "u1",
                scope: "FULL",
                selected_node_ids_json: "[]",
            },
        )
        .await
        .unwrap();
        assert_eq!(run.status, "RUNNING");

        RunRepository::finalize(conn.pool(), "r1", "SUCCESS", 42, None).await.unwrap();
        let fetched = RunRepository::find_owned(conn.pool(), "r1", "u1").await.unwrap();
        assert_eq!(fetched.status, "SUCCESS");
        assert_eq!(fetched.duration_ms, Some(42));

        assert!(RunRepository::find_owned(conn.pool(), "r1", "someone-else").await.is_err());
    }
}
