use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Row};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::AnalysisService;
use crate::db::Database;
use crate::extraction::PdfExtractor;
use crate::models::{QueryLogStatus, ReportStatus};
use crate::services::FileService;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisQueueItem {
    pub id: Uuid,
    pub report_id: Uuid,
    pub query_log_id: Uuid,
    pub query_text: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub worker_id: Option<String>,
    pub processing_time_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueueStats {
    pub pending_count: i64,
    pub processing_count: i64,
    pub failed_count: i64,
    pub completed_today: i64,
    pub avg_wait_time_minutes: Option<f64>,
    pub oldest_pending_minutes: Option<f64>,
}

const QUEUE_COLUMNS: &str = "id, report_id, query_log_id, query_text, status, attempts, \
     max_attempts, created_at, started_at, completed_at, error_message, worker_id, \
     processing_time_ms";

fn item_from_row(row: &sqlx::postgres::PgRow) -> AnalysisQueueItem {
    AnalysisQueueItem {
        id: row.get("id"),
        report_id: row.get("report_id"),
        query_log_id: row.get("query_log_id"),
        query_text: row.get("query_text"),
        status: row.get("status"),
        attempts: row.get("attempts"),
        max_attempts: row.get("max_attempts"),
        created_at: row.get("created_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        error_message: row.get("error_message"),
        worker_id: row.get("worker_id"),
        processing_time_ms: row.get("processing_time_ms"),
    }
}

/// Background queue that drives report analysis: extract text from the stored
/// PDF, run the AI analysis, and write the report and query log terminal
/// states. Jobs are claimed atomically so multiple workers can share a
/// database.
#[derive(Clone)]
pub struct AnalysisQueueService {
    db: Database,
    pool: PgPool,
    max_concurrent_jobs: usize,
    worker_id: String,
    file_service: FileService,
    extractor: PdfExtractor,
    analysis: AnalysisService,
}

impl AnalysisQueueService {
    pub fn new(
        db: Database,
        pool: PgPool,
        max_concurrent_jobs: usize,
        file_service: FileService,
        analysis: AnalysisService,
    ) -> Self {
        let worker_id = format!(
            "worker-{}-{}",
            hostname::get().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );

        Self {
            db,
            pool,
            max_concurrent_jobs,
            worker_id,
            file_service,
            extractor: PdfExtractor::new(),
            analysis,
        }
    }

    /// Add an analysis job to the queue. Returns the queue item id, which
    /// doubles as the task id clients poll for status.
    pub async fn enqueue(
        &self,
        report_id: Uuid,
        query_log_id: Uuid,
        query_text: &str,
    ) -> Result<Uuid> {
        let row = sqlx::query(
            r#"
            INSERT INTO analysis_queue (report_id, query_log_id, query_text)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(report_id)
        .bind(query_log_id)
        .bind(query_text)
        .fetch_one(&self.pool)
        .await?;

        let id: Uuid = row.get("id");
        info!("Enqueued analysis job {} for report {}", id, report_id);
        Ok(id)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<AnalysisQueueItem>> {
        let row = sqlx::query(&format!(
            "SELECT {QUEUE_COLUMNS} FROM analysis_queue WHERE id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(item_from_row))
    }

    /// Claim the next pending job atomically. FOR UPDATE SKIP LOCKED plus a
    /// guarded UPDATE means concurrent workers never claim the same job.
    pub async fn dequeue(&self) -> Result<Option<AnalysisQueueItem>> {
        let mut tx = self.pool.begin().await?;

        // Jobs whose report is mid-flight on another worker are not eligible;
        // without this filter a released job would be re-claimed in a tight
        // loop for as long as the other job runs.
        let job_row = sqlx::query(&format!(
            r#"
            SELECT {QUEUE_COLUMNS}
            FROM analysis_queue
            WHERE status = 'pending'
              AND attempts < max_attempts
              AND NOT EXISTS (
                  SELECT 1 FROM reports r
                  WHERE r.id = analysis_queue.report_id
                    AND r.processing_status = 'processing'
              )
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#
        ))
        .fetch_optional(&mut *tx)
        .await?;

        let job_id = match job_row {
            Some(ref row) => row.get::<Uuid, _>("id"),
            None => {
                tx.rollback().await?;
                return Ok(None);
            }
        };

        let updated_rows = sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'processing',
                started_at = NOW(),
                worker_id = $1,
                attempts = attempts + 1
            WHERE id = $2
              AND status = 'pending'
            "#,
        )
        .bind(&self.worker_id)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if updated_rows.rows_affected() != 1 {
            tx.rollback().await?;
            warn!("Job {} was claimed by another worker", job_id);
            return Ok(None);
        }

        let row = sqlx::query(&format!(
            "SELECT {QUEUE_COLUMNS} FROM analysis_queue WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        let item = item_from_row(&row);
        info!(
            "Worker {} claimed job {} for report {}",
            self.worker_id, item.id, item.report_id
        );
        Ok(Some(item))
    }

    async fn mark_completed(&self, item_id: Uuid, processing_time_ms: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'completed',
                completed_at = NOW(),
                processing_time_ms = $2
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(processing_time_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Record a transient failure. The job returns to `pending` until its
    /// attempts are exhausted, at which point it goes to `failed`. Returns
    /// true when the failure became permanent.
    async fn mark_failed(&self, item_id: Uuid, error_text: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = CASE
                    WHEN attempts >= max_attempts THEN 'failed'
                    ELSE 'pending'
                END,
                error_message = $2,
                started_at = NULL,
                worker_id = NULL
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(item_id)
        .bind(error_text)
        .fetch_one(&self.pool)
        .await?;

        let status: String = row.get("status");
        let permanent = status == "failed";
        if permanent {
            error!(
                "Analysis job {} permanently failed after max attempts: {}",
                item_id, error_text
            );
        }
        Ok(permanent)
    }

    /// Fail a job immediately, bypassing remaining retries. Used for faults
    /// retrying cannot fix, like a deleted report or a missing stored file.
    async fn mark_failed_permanently(&self, item_id: Uuid, error_text: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'failed',
                attempts = max_attempts,
                error_message = $2,
                completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .bind(error_text)
        .execute(&self.pool)
        .await?;

        error!("Analysis job {} permanently failed: {}", item_id, error_text);
        Ok(())
    }

    /// Process one claimed job end to end. Terminal report and query log
    /// states are always written before the job itself is marked done, so a
    /// crash between steps leaves the job reclaimable rather than a report
    /// stuck mid-flight.
    pub async fn process_item(&self, item: AnalysisQueueItem) -> Result<()> {
        let start_time = std::time::Instant::now();

        let report = match self.db.get_report(item.report_id).await? {
            Some(report) => report,
            None => {
                self.mark_failed_permanently(item.id, "Report not found").await?;
                self.fail_query_log(item.query_log_id, "Report was deleted before analysis")
                    .await?;
                return Ok(());
            }
        };

        // A completed report keeps its stored analysis untouched; this job is
        // a follow-up query answered from the already extracted text.
        match report.processing_status {
            ReportStatus::Completed => {
                let text = report
                    .extracted_text
                    .as_deref()
                    .unwrap_or(crate::extraction::EXTRACTION_FAILED_SENTINEL);
                let outcome = self.analysis.analyze(text, &item.query_text).await;
                let elapsed_ms = start_time.elapsed().as_millis() as i64;
                self.db
                    .finish_query_log(
                        item.query_log_id,
                        QueryLogStatus::Completed,
                        &outcome.text,
                        elapsed_ms,
                    )
                    .await?;
                self.mark_completed(item.id, elapsed_ms).await?;
                return Ok(());
            }
            ReportStatus::Failed => {
                self.mark_failed_permanently(item.id, "Report processing already failed")
                    .await?;
                self.fail_query_log(item.query_log_id, "Report processing failed")
                    .await?;
                return Ok(());
            }
            ReportStatus::Pending | ReportStatus::Processing => {}
        }

        // Single flight: only one job moves a report out of pending. Losing
        // the claim race returns this job to the queue, where the dequeue
        // filter keeps it parked until the report leaves processing.
        if !self.db.claim_report_for_processing(item.report_id).await? {
            warn!(
                "Report {} is being processed elsewhere, releasing job {}",
                item.report_id, item.id
            );
            self.release_item(item.id).await?;
            return Ok(());
        }

        if !self.file_service.file_exists(&report.file_path) {
            // Nothing to retry against. The report fails terminally.
            self.db.mark_report_failed(item.report_id).await?;
            self.mark_failed_permanently(item.id, "Stored report file is missing")
                .await?;
            self.fail_query_log(item.query_log_id, "Stored report file is missing")
                .await?;
            return Ok(());
        }

        match self.run_analysis(&item, &report.file_path, start_time).await {
            Ok(()) => Ok(()),
            Err(e) => {
                let error_text = format!("Analysis processing failed: {}", e);
                warn!("Job {} for report {} failed: {}", item.id, item.report_id, e);

                let permanent = self.mark_failed(item.id, &error_text).await?;
                if permanent {
                    self.db.mark_report_failed(item.report_id).await?;
                    self.fail_query_log(item.query_log_id, &error_text).await?;
                } else {
                    self.db.release_report_for_retry(item.report_id).await?;
                }
                Ok(())
            }
        }
    }

    async fn run_analysis(
        &self,
        item: &AnalysisQueueItem,
        file_path: &str,
        start_time: std::time::Instant,
    ) -> Result<()> {
        let extracted = self.extractor.extract_text_off_thread(file_path).await;
        self.db
            .update_extracted_text(item.report_id, &extracted)
            .await?;

        let outcome = self.analysis.analyze(&extracted, &item.query_text).await;
        let elapsed_ms = start_time.elapsed().as_millis() as i64;

        self.db
            .finish_report_processing(
                item.report_id,
                ReportStatus::Completed,
                &outcome.text,
                outcome.confidence,
            )
            .await?;
        self.db
            .finish_query_log(
                item.query_log_id,
                QueryLogStatus::Completed,
                &outcome.text,
                elapsed_ms,
            )
            .await?;
        self.mark_completed(item.id, elapsed_ms).await?;

        info!(
            "Analysis completed for report {} | Job: {} | fallback: {} | {}ms",
            item.report_id, item.id, outcome.fallback, elapsed_ms
        );
        Ok(())
    }

    async fn fail_query_log(&self, query_log_id: Uuid, error_text: &str) -> Result<()> {
        self.db
            .finish_query_log(query_log_id, QueryLogStatus::Failed, error_text, 0)
            .await?;
        Ok(())
    }

    /// Put a claimed job back to pending without consuming an attempt.
    async fn release_item(&self, item_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'pending',
                attempts = attempts - 1,
                started_at = NULL,
                worker_id = NULL
            WHERE id = $1 AND status = 'processing'
            "#,
        )
        .bind(item_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Run the worker loop forever: claim jobs, process them on spawned
    /// tasks bounded by a semaphore, sleep briefly when the queue is empty.
    pub async fn start_worker(self: Arc<Self>) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_jobs));

        info!(
            "Starting analysis worker {} with {} concurrent jobs",
            self.worker_id, self.max_concurrent_jobs
        );

        loop {
            match self.dequeue().await {
                Ok(Some(item)) => {
                    let permit = semaphore.clone().acquire_owned().await?;
                    let self_clone = self.clone();

                    tokio::spawn(async move {
                        if let Err(e) = self_clone.process_item(item).await {
                            error!("Error processing analysis item: {}", e);
                        }
                        drop(permit);
                    });
                }
                Ok(None) => {
                    sleep(Duration::from_millis(100)).await;
                }
                Err(e) => {
                    error!("Error dequeuing analysis item: {}", e);
                    sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }

    pub async fn get_stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_count,
                COUNT(*) FILTER (WHERE status = 'processing') AS processing_count,
                COUNT(*) FILTER (WHERE status = 'failed') AS failed_count,
                COUNT(*) FILTER (
                    WHERE status = 'completed' AND completed_at >= CURRENT_DATE
                ) AS completed_today,
                AVG(EXTRACT(EPOCH FROM (started_at - created_at)) / 60.0)
                    FILTER (WHERE started_at IS NOT NULL)::double precision
                    AS avg_wait_time_minutes,
                (EXTRACT(EPOCH FROM (
                    NOW() - MIN(created_at) FILTER (WHERE status = 'pending')
                )) / 60.0)::double precision AS oldest_pending_minutes
            FROM analysis_queue
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStats {
            pending_count: row.get::<Option<i64>, _>("pending_count").unwrap_or(0),
            processing_count: row.get::<Option<i64>, _>("processing_count").unwrap_or(0),
            failed_count: row.get::<Option<i64>, _>("failed_count").unwrap_or(0),
            completed_today: row.get::<Option<i64>, _>("completed_today").unwrap_or(0),
            avg_wait_time_minutes: row.get("avg_wait_time_minutes"),
            oldest_pending_minutes: row.get("oldest_pending_minutes"),
        })
    }

    /// Requeue failed jobs that still have attempts left, and reset their
    /// reports so the retry can claim them again.
    pub async fn requeue_failed_items(&self) -> Result<i64> {
        let rows = sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'pending',
                attempts = 0,
                error_message = NULL,
                started_at = NULL,
                worker_id = NULL
            WHERE status = 'failed'
            RETURNING report_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let report_id: Uuid = row.get("report_id");
            self.db.reset_failed_report(report_id).await?;
        }

        Ok(rows.len() as i64)
    }

    /// Drop completed jobs older than the retention window.
    pub async fn cleanup_completed(&self, days_to_keep: i32) -> Result<i64> {
        let result = sqlx::query(
            r#"
            DELETE FROM analysis_queue
            WHERE status = 'completed'
              AND completed_at < NOW() - INTERVAL '1 day' * $1
            "#,
        )
        .bind(days_to_keep)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as i64)
    }

    /// Return jobs stranded in `processing` by a crashed worker to the queue,
    /// along with their reports.
    pub async fn recover_stale_items(&self, stale_minutes: i32) -> Result<i64> {
        let rows = sqlx::query(
            r#"
            UPDATE analysis_queue
            SET status = 'pending',
                started_at = NULL,
                worker_id = NULL
            WHERE status = 'processing'
              AND started_at < NOW() - INTERVAL '1 minute' * $1
            RETURNING report_id
            "#,
        )
        .bind(stale_minutes)
        .fetch_all(&self.pool)
        .await?;

        for row in &rows {
            let report_id: Uuid = row.get("report_id");
            self.db.release_report_for_retry(report_id).await?;
        }

        if !rows.is_empty() {
            warn!("Recovered {} stale analysis jobs", rows.len());
        }

        Ok(rows.len() as i64)
    }
}
