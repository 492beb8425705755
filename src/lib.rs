pub mod analysis;
pub mod analysis_queue;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod extraction;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod swagger;

#[cfg(test)]
mod tests;

use axum::{extract::State, Json};
use std::sync::Arc;

use analysis::AnalysisService;
use analysis_queue::AnalysisQueueService;
use cache::CacheService;
use config::Config;
use db::Database;
use services::FileService;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub cache: CacheService,
    pub file_service: FileService,
    pub analysis: AnalysisService,
    pub queue: Arc<AnalysisQueueService>,
}

/// Health check endpoint reporting database and cache availability.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database_ok = state.db.check_health().await;
    let cache_ok = state.cache.is_available();

    Json(serde_json::json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": database_ok,
        "cache": cache_ok,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
