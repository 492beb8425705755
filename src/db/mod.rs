use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

pub mod query_logs;
pub mod reports;
pub mod users;

#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check if the database pool is healthy and has available connections
    pub async fn check_health(&self) -> bool {
        match tokio::time::timeout(Duration::from_secs(5), self.pool.acquire()).await {
            Ok(Ok(_conn)) => true,
            Ok(Err(e)) => {
                tracing::warn!("Database health check failed: {}", e);
                false
            }
            Err(_) => {
                tracing::warn!("Database health check timed out");
                false
            }
        }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(r#"CREATE EXTENSION IF NOT EXISTS "uuid-ossp""#)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                username VARCHAR(100) UNIQUE NOT NULL,
                email VARCHAR(255) UNIQUE NOT NULL,
                mobile_number VARCHAR(20) UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                full_name VARCHAR(200) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                filename VARCHAR(255) NOT NULL,
                file_path VARCHAR(500) NOT NULL,
                file_size BIGINT NOT NULL,
                upload_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                processing_status VARCHAR(20) NOT NULL DEFAULT 'pending',
                extracted_text TEXT,
                analysis_result TEXT,
                confidence_score DOUBLE PRECISION,
                CONSTRAINT check_processing_status CHECK (
                    processing_status IN ('pending', 'processing', 'completed', 'failed')
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_reports_user_id ON reports(user_id)"#)
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_reports_upload_date ON reports(user_id, upload_date DESC)"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS query_logs (
                id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                report_id UUID NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                query_text TEXT NOT NULL,
                response_text TEXT,
                processing_time_ms BIGINT,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                completed_at TIMESTAMPTZ,
                CONSTRAINT check_query_log_status CHECK (
                    status IN ('pending', 'completed', 'failed')
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(r#"CREATE INDEX IF NOT EXISTS idx_query_logs_report_id ON query_logs(report_id)"#)
            .execute(&self.pool)
            .await?;

        self.run_analysis_queue_migration().await?;

        Ok(())
    }

    async fn run_analysis_queue_migration(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analysis_queue (
                id UUID PRIMARY KEY DEFAULT uuid_generate_v4(),
                report_id UUID NOT NULL REFERENCES reports(id) ON DELETE CASCADE,
                query_log_id UUID NOT NULL REFERENCES query_logs(id) ON DELETE CASCADE,
                query_text TEXT NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                attempts INT NOT NULL DEFAULT 0,
                max_attempts INT NOT NULL DEFAULT 3,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                started_at TIMESTAMPTZ,
                completed_at TIMESTAMPTZ,
                error_message TEXT,
                worker_id VARCHAR(100),
                processing_time_ms BIGINT,
                CONSTRAINT check_queue_status CHECK (
                    status IN ('pending', 'processing', 'completed', 'failed')
                )
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_analysis_queue_status ON analysis_queue(status, created_at)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_analysis_queue_report_id ON analysis_queue(report_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
