use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::models::{QueryLog, QueryLogStatus};

const QUERY_LOG_COLUMNS: &str = "id, user_id, report_id, query_text, response_text, \
     processing_time_ms, status, created_at, completed_at";

fn query_log_from_row(row: &sqlx::postgres::PgRow) -> QueryLog {
    QueryLog {
        id: row.get("id"),
        user_id: row.get("user_id"),
        report_id: row.get("report_id"),
        query_text: row.get("query_text"),
        response_text: row.get("response_text"),
        processing_time_ms: row.get("processing_time_ms"),
        status: row
            .get::<String, _>("status")
            .try_into()
            .unwrap_or(QueryLogStatus::Pending),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

impl Database {
    /// Record an analysis request as a pending query log. The worker fills in
    /// the response later, so a redelivered queue job updates this same row
    /// instead of inserting a duplicate.
    pub async fn create_query_log(
        &self,
        user_id: Uuid,
        report_id: Uuid,
        query_text: &str,
    ) -> Result<QueryLog> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO query_logs (user_id, report_id, query_text, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING {QUERY_LOG_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(report_id)
        .bind(query_text)
        .fetch_one(&self.pool)
        .await?;

        Ok(query_log_from_row(&row))
    }

    /// Move a pending query log to a terminal status. Completed and failed
    /// logs are immutable, enforced by the WHERE clause.
    pub async fn finish_query_log(
        &self,
        id: Uuid,
        status: QueryLogStatus,
        response_text: &str,
        processing_time_ms: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE query_logs
            SET status = $2,
                response_text = $3,
                processing_time_ms = $4,
                completed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(response_text)
        .bind(processing_time_ms)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn list_query_logs_for_report(
        &self,
        report_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<QueryLog>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {QUERY_LOG_COLUMNS} FROM query_logs
            WHERE report_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            "#
        ))
        .bind(report_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(query_log_from_row).collect())
    }
}
