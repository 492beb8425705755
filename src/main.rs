use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use hemoscan::{
    analysis::AnalysisService, analysis_queue::AnalysisQueueService, cache::CacheService,
    config::Config, db::Database, seed, services::FileService, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let db = Database::new(&config.database_url).await?;
    db.migrate().await?;

    let cache = CacheService::connect(config.redis_url.as_deref()).await;

    seed::seed_admin_user(&db).await?;

    let file_service = FileService::new(config.upload_path.clone());
    let analysis = AnalysisService::new(&config);

    let queue_service = Arc::new(AnalysisQueueService::new(
        db.clone(),
        db.get_pool().clone(),
        config.concurrent_analysis_jobs,
        file_service.clone(),
        analysis.clone(),
    ));

    let queue_worker = queue_service.clone();
    tokio::spawn(async move {
        if let Err(e) = queue_worker.start_worker().await {
            error!("Analysis queue worker error: {}", e);
        }
    });

    let queue_maintenance = queue_service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;

            // Return jobs stuck in processing for over 10 minutes to the queue
            if let Err(e) = queue_maintenance.recover_stale_items(10).await {
                error!("Error recovering stale items: {}", e);
            }

            // Drop completed queue entries older than 7 days
            if let Err(e) = queue_maintenance.cleanup_completed(7).await {
                error!("Error cleaning up completed items: {}", e);
            }
        }
    });

    let max_body_bytes = (config.max_file_size_mb as usize) * 1024 * 1024 + 1024;

    let state = Arc::new(AppState {
        db,
        config: config.clone(),
        cache,
        file_service,
        analysis,
        queue: queue_service,
    });

    let app = Router::new()
        .route("/api/health", get(hemoscan::health_check))
        .nest("/api/auth", hemoscan::routes::auth::router())
        .nest("/api/reports", hemoscan::routes::reports::router())
        .nest("/api/queue", hemoscan::routes::queue::router())
        .merge(hemoscan::swagger::create_swagger_router())
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    info!("Server starting on {}", config.server_address);

    axum::serve(listener, app).await?;

    Ok(())
}
