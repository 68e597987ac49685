use axum::{http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::storage::Storage;

use super::handlers::{all_stats, health_check, precipitation_stats, temperature_stats, AppState};

pub fn create_api_router(storage: Arc<dyn Storage>) -> Router {
    let state = Arc::new(AppState { storage });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    let stats_routes = Router::new()
        .route("/stats/temperature/", get(temperature_stats))
        .route("/stats/precipitation/", get(precipitation_stats))
        .route("/stats/all/", get(all_stats))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(stats_routes)
        .layer(cors)
}
