//! HTTP tests for the stats endpoints, driven through the router with an
//! in-memory SQLite database.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::DateTime;
use meteo_stats::api;
use meteo_stats::models::{City, Observation};
use meteo_stats::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn add_city(
    storage: &Arc<dyn Storage>,
    city: City,
    readings: &[(&str, Option<f64>, Option<f64>)],
) {
    let city_id = storage.save_city(&city).await.unwrap().id.unwrap();
    let observations: Vec<Observation> = readings
        .iter()
        .map(|&(at, temperature, precipitation)| {
            Observation::new(
                city_id,
                DateTime::parse_from_rfc3339(at).unwrap(),
                temperature,
                precipitation,
            )
        })
        .collect();
    storage.bulk_save(&observations).await.unwrap();
}

/// Two Madrids and a Barcelona, all observed at +01:00
async fn create_test_app() -> Router {
    let storage = create_test_storage().await;

    add_city(
        &storage,
        City::new("Madrid", 40.4165, -3.70256),
        &[
            ("2025-01-01T10:00:00+01:00", Some(10.0), Some(0.0)),
            ("2025-01-01T14:00:00+01:00", Some(20.0), Some(1.5)),
            ("2025-01-02T10:00:00+01:00", Some(36.0), Some(1.5)),
        ],
    )
    .await;
    add_city(
        &storage,
        City::new("Madrid", 37.07, -5.19),
        &[("2025-01-01T12:00:00+01:00", Some(-2.0), Some(0.0))],
    )
    .await;
    add_city(
        &storage,
        City::new("Barcelona", 41.38879, 2.15899),
        &[("2025-01-01T12:00:00+01:00", Some(15.0), Some(2.0))],
    )
    .await;
    // Stored without observations, so absent from every response
    storage
        .save_city(&City::new("Madrid", 1.0, 1.0))
        .await
        .unwrap();

    api::create_api_router(storage)
}

async fn get(app: Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

#[tokio::test]
async fn test_health_check() {
    let app = create_test_app().await;
    let (status, body) = get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "OK"}));
}

#[tokio::test]
async fn test_temperature_stats() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app,
        "/stats/temperature/?city=madrid&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {
                "latitude": 40.4165,
                "longitude": -3.70256,
                "temperature": {
                    "average": 22.0,
                    "average_by_day": {"2025-01-01": 15.0, "2025-01-02": 36.0},
                    "max": {"value": 36.0, "date": "2025-01-02T10:00"},
                    "min": {"value": 10.0, "date": "2025-01-01T10:00"},
                    "hours_above_threshold": 1,
                    "hours_below_threshold": 0
                }
            },
            {
                "latitude": 37.07,
                "longitude": -5.19,
                "temperature": {
                    "average": -2.0,
                    "average_by_day": {"2025-01-01": -2.0},
                    "max": {"value": -2.0, "date": "2025-01-01T12:00"},
                    "min": {"value": -2.0, "date": "2025-01-01T12:00"},
                    "hours_above_threshold": 0,
                    "hours_below_threshold": 1
                }
            }
        ])
    );
}

#[tokio::test]
async fn test_temperature_stats_with_filters_and_thresholds() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app,
        "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-01\
         &latitude=40.4165&upper_threshold=15&lower_threshold=12",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let stats = body.as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["latitude"], json!(40.4165));
    assert_eq!(stats[0]["temperature"]["hours_above_threshold"], json!(1));
    assert_eq!(stats[0]["temperature"]["hours_below_threshold"], json!(1));
    assert_eq!(
        stats[0]["temperature"]["average_by_day"],
        json!({"2025-01-01": 15.0})
    );
}

#[tokio::test]
async fn test_precipitation_stats() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app,
        "/stats/precipitation/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02&longitude=-3.70256",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            {
                "latitude": 40.4165,
                "longitude": -3.70256,
                "precipitation": {
                    "total": 3.0,
                    "total_by_day": {"2025-01-01": 1.5, "2025-01-02": 1.5},
                    "days_with_precipitation": 2,
                    "max": {"value": 1.5, "date": "2025-01-01T14:00"},
                    "average": 1.0
                }
            }
        ])
    );
}

#[tokio::test]
async fn test_unknown_city_returns_empty_list() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app,
        "/stats/temperature/?city=Atlantis&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_empty_city_matches_nothing() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app,
        "/stats/precipitation/?city=&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_repeated_parameters_use_last_value() {
    let app = create_test_app().await;
    let (status, body) = get_json(
        app.clone(),
        "/stats/temperature/?city=Madrid&city=Madrid&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);

    let (status, body) = get_json(
        app.clone(),
        "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02&city=Barcelona",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let stats = body.as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["latitude"], json!(41.38879));

    let (status, body) = get_json(
        app,
        "/stats/precipitation/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02\
         &latitude=1&latitude=500",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "latitude 500.0 is greater than 90.0."}));
}

#[tokio::test]
async fn test_undecodable_query_still_returns_json() {
    let app = create_test_app().await;
    // `%FF` is not valid UTF-8 once decoded
    let (status, body) = get_json(
        app,
        "/stats/temperature/?city=%FF&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_all_stats_grouped_by_name() {
    let app = create_test_app().await;
    let (status, raw) = get(app, "/stats/all/").await;

    assert_eq!(status, StatusCode::OK);
    // Names keep the order their first city was stored in
    assert!(raw.find("\"Madrid\"").unwrap() < raw.find("\"Barcelona\"").unwrap());

    let body: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        body,
        json!({
            "Madrid": [
                {
                    "latitude": 40.4165,
                    "longitude": -3.70256,
                    "start_date": "2025-01-01",
                    "end_date": "2025-01-02",
                    "temperature_average": 22.0,
                    "precipitation_total": 3.0,
                    "days_with_precipitation": 2,
                    "precipitation_max": {"value": 1.5, "date": "2025-01-01T14:00"},
                    "temperature_max": {"value": 36.0, "date": "2025-01-02T10:00"},
                    "temperature_min": {"value": 10.0, "date": "2025-01-01T10:00"}
                },
                {
                    "latitude": 37.07,
                    "longitude": -5.19,
                    "start_date": "2025-01-01",
                    "end_date": "2025-01-01",
                    "temperature_average": -2.0,
                    "precipitation_total": 0.0,
                    "days_with_precipitation": 0,
                    "precipitation_max": {"value": 0.0, "date": "2025-01-01T12:00"},
                    "temperature_max": {"value": -2.0, "date": "2025-01-01T12:00"},
                    "temperature_min": {"value": -2.0, "date": "2025-01-01T12:00"}
                }
            ],
            "Barcelona": [
                {
                    "latitude": 41.38879,
                    "longitude": 2.15899,
                    "start_date": "2025-01-01",
                    "end_date": "2025-01-01",
                    "temperature_average": 15.0,
                    "precipitation_total": 2.0,
                    "days_with_precipitation": 1,
                    "precipitation_max": {"value": 2.0, "date": "2025-01-01T12:00"},
                    "temperature_max": {"value": 15.0, "date": "2025-01-01T12:00"},
                    "temperature_min": {"value": 15.0, "date": "2025-01-01T12:00"}
                }
            ]
        })
    );
}

#[tokio::test]
async fn test_validation_errors_return_bad_request() {
    let cases = [
        (
            "/stats/temperature/?start_date=2025-01-01&end_date=2025-01-02",
            "Mandatory field city_name cannot be None",
        ),
        (
            "/stats/temperature/?city=Madrid&start_date=&end_date=2025-01-02",
            "Invalid format for start_date: ",
        ),
        (
            "/stats/precipitation/?city=Madrid&start_date=2025/01/01&end_date=2025-01-02",
            "Invalid format for start_date: 2025/01/01",
        ),
        (
            "/stats/precipitation/?city=Madrid&start_date=2025-01-03&end_date=2025-01-02",
            "start_date 2025-01-03 is greater than 2025-01-02.",
        ),
        (
            "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02&latitude=500",
            "latitude 500.0 is greater than 90.0.",
        ),
        (
            "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02&longitude=-181",
            "longitude -181.0 is lower than -180.0.",
        ),
        (
            "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02&upper_threshold=hot",
            "Invalid format for upper_threshold: hot",
        ),
    ];

    for (uri, message) in cases {
        let app = create_test_app().await;
        let (status, body) = get_json(app, uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body, json!({"error": message}), "{uri}");
    }
}

#[tokio::test]
async fn test_storage_failure_returns_generic_error() {
    // Schema never created, so every query fails
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    let app = api::create_api_router(Arc::new(storage));

    let (status, body) = get_json(
        app.clone(),
        "/stats/temperature/?city=Madrid&start_date=2025-01-01&end_date=2025-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "An unexpected error happened"}));

    let (status, body) = get_json(app, "/stats/all/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": api::INTERNAL_ERROR_MESSAGE}));
}
