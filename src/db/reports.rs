use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::models::{Report, ReportStatus};

const REPORT_COLUMNS: &str = "id, user_id, filename, file_path, file_size, upload_date, \
     processing_status, extracted_text, analysis_result, confidence_score";

fn report_from_row(row: &sqlx::postgres::PgRow) -> Report {
    Report {
        id: row.get("id"),
        user_id: row.get("user_id"),
        filename: row.get("filename"),
        file_path: row.get("file_path"),
        file_size: row.get("file_size"),
        upload_date: row.get("upload_date"),
        processing_status: row
            .get::<String, _>("processing_status")
            .try_into()
            .unwrap_or(ReportStatus::Pending),
        extracted_text: row.get("extracted_text"),
        analysis_result: row.get("analysis_result"),
        confidence_score: row.get("confidence_score"),
    }
}

impl Database {
    /// Insert a new report row in `pending` state. This happens before any
    /// processing is scheduled so the row always exists first.
    pub async fn create_report(
        &self,
        user_id: Uuid,
        filename: &str,
        file_path: &str,
        file_size: i64,
    ) -> Result<Report> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO reports (user_id, filename, file_path, file_size, processing_status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {REPORT_COLUMNS}
            "#
        ))
        .bind(user_id)
        .bind(filename)
        .bind(file_path)
        .bind(file_size)
        .fetch_one(&self.pool)
        .await?;

        Ok(report_from_row(&row))
    }

    pub async fn get_report_by_id(&self, id: Uuid, user_id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(report_from_row))
    }

    /// Worker-side lookup without ownership filtering.
    pub async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(&format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(report_from_row))
    }

    pub async fn list_reports_for_user(&self, user_id: Uuid) -> Result<Vec<Report>> {
        let rows = sqlx::query(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE user_id = $1 ORDER BY upload_date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(report_from_row).collect())
    }

    /// Claim a report for processing. The guarded UPDATE only succeeds for a
    /// `pending` report, so status transitions never move backward and a
    /// report already held by another worker cannot be claimed twice.
    pub async fn claim_report_for_processing(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET processing_status = 'processing'
            WHERE id = $1 AND processing_status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn update_extracted_text(&self, id: Uuid, extracted_text: &str) -> Result<()> {
        sqlx::query("UPDATE reports SET extracted_text = $2 WHERE id = $1")
            .bind(id)
            .bind(extracted_text)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Write the analysis result and move a `processing` report to a terminal
    /// status. The WHERE clause keeps completed/failed reports immutable.
    pub async fn finish_report_processing(
        &self,
        id: Uuid,
        status: ReportStatus,
        analysis_result: &str,
        confidence_score: f64,
    ) -> Result<bool> {
        debug_assert!(status.is_terminal());

        let result = sqlx::query(
            r#"
            UPDATE reports
            SET processing_status = $2,
                analysis_result = $3,
                confidence_score = $4
            WHERE id = $1 AND processing_status = 'processing'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(analysis_result)
        .bind(confidence_score)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Return a `processing` report to `pending` so a retry can claim it
    /// again. Used after transient worker failures and stale-job recovery;
    /// completed and failed reports are never touched.
    pub async fn release_report_for_retry(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET processing_status = 'pending'
            WHERE id = $1 AND processing_status = 'processing'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reset a `failed` report to `pending` as part of an explicit requeue.
    /// Completed reports stay immutable.
    pub async fn reset_failed_report(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET processing_status = 'pending'
            WHERE id = $1 AND processing_status = 'failed'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Mark a `processing` report failed without touching its analysis fields.
    pub async fn mark_report_failed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reports
            SET processing_status = 'failed'
            WHERE id = $1 AND processing_status = 'processing'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a report owned by the given user. Query logs cascade at the
    /// schema level.
    pub async fn delete_report(&self, id: Uuid, user_id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(&format!(
            "DELETE FROM reports WHERE id = $1 AND user_id = $2 RETURNING {REPORT_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(report_from_row))
    }
}
