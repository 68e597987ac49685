use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::models::{CityPrecipitationStats, CityTemperatureStats, WeatherStatsByCity};
use crate::stats::StatsEngine;
use crate::storage::Storage;
use crate::validation::{validate_params, StatsQuery, ValidationError};

pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error happened";

pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Raw query string of the stats endpoints; every value is validated before use.
///
/// Built from the decoded key/value pairs. A repeated key keeps its last value
/// and unknown keys are ignored.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatsParams {
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub upper_threshold: Option<String>,
    pub lower_threshold: Option<String>,
}

impl FromIterator<(String, String)> for StatsParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut params = StatsParams::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "city" => &mut params.city,
                "start_date" => &mut params.start_date,
                "end_date" => &mut params.end_date,
                "latitude" => &mut params.latitude,
                "longitude" => &mut params.longitude,
                "upper_threshold" => &mut params.upper_threshold,
                "lower_threshold" => &mut params.lower_threshold,
                _ => continue,
            };
            *slot = Some(value);
        }
        params
    }
}

impl StatsParams {
    fn validate(&self) -> Result<StatsQuery, ValidationError> {
        validate_params(
            self.city.as_deref(),
            self.start_date.as_deref(),
            self.end_date.as_deref(),
            self.latitude.as_deref(),
            self.longitude.as_deref(),
            self.upper_threshold.as_deref(),
            self.lower_threshold.as_deref(),
        )
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

type QueryPairs = Result<Query<Vec<(String, String)>>, QueryRejection>;

fn stats_params(query: QueryPairs) -> Result<StatsParams, ApiError> {
    let Query(pairs) = query.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: rejection.body_text(),
            }),
        )
    })?;
    Ok(pairs.into_iter().collect())
}

fn bad_request(e: ValidationError) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: e.message().to_string(),
        }),
    )
}

fn internal_error(e: anyhow::Error) -> ApiError {
    error!("Failed to compute stats: {:#}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: INTERNAL_ERROR_MESSAGE.to_string(),
        }),
    )
}

/// Temperature statistics for every city matching the query
pub async fn temperature_stats(
    State(state): State<Arc<AppState>>,
    query: QueryPairs,
) -> Result<Json<Vec<CityTemperatureStats>>, ApiError> {
    let params = stats_params(query)?;
    debug!("Temperature stats requested: {:?}", params);
    let query = params.validate().map_err(bad_request)?;

    let engine = StatsEngine::new(state.storage.as_ref(), state.storage.as_ref());
    engine
        .temperature(&query)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Precipitation statistics for every city matching the query
pub async fn precipitation_stats(
    State(state): State<Arc<AppState>>,
    query: QueryPairs,
) -> Result<Json<Vec<CityPrecipitationStats>>, ApiError> {
    let params = stats_params(query)?;
    debug!("Precipitation stats requested: {:?}", params);
    let query = params.validate().map_err(bad_request)?;

    let engine = StatsEngine::new(state.storage.as_ref(), state.storage.as_ref());
    engine
        .precipitation(&query)
        .await
        .map(Json)
        .map_err(internal_error)
}

/// Whole-history summary of every stored city, grouped by name
pub async fn all_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WeatherStatsByCity>, ApiError> {
    debug!("All stats requested");

    let engine = StatsEngine::new(state.storage.as_ref(), state.storage.as_ref());
    engine.all().await.map(Json).map_err(internal_error)
}

pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
