//! External weather provider
//!
//! The ingestion workflow talks to the provider through [`MeteoClient`] so the
//! HTTP implementation can be swapped for [`StaticMeteoClient`] in tests.

pub mod memory;
pub mod open_meteo;

pub use memory::StaticMeteoClient;
pub use open_meteo::OpenMeteoClient;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{City, HourlyReading};

#[derive(Debug, Error)]
pub enum MeteoError {
    #[error("weather provider responded with status {status}")]
    Status { status: u16 },
    #[error("weather provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid weather provider endpoint: {0}")]
    Endpoint(String),
    #[error("unexpected weather provider payload: {0}")]
    Payload(String),
}

impl MeteoError {
    /// HTTP status reported by the provider, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            MeteoError::Status { status } => Some(*status),
            MeteoError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[async_trait]
pub trait MeteoClient: Send + Sync {
    /// Candidate cities known to the provider under `name`. Returned cities carry no id.
    async fn get_cities_by_name(&self, name: &str) -> Result<Vec<City>, MeteoError>;

    /// Hourly temperature and precipitation for `city` between `start` and `end` inclusive
    async fn get_hourly_readings(
        &self,
        city: &City,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HourlyReading>, MeteoError>;
}
