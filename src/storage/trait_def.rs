use crate::models::{City, Observation};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("city already exists with id {city_id}")]
    Conflict { city_id: i64 },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait CityRepository: Send + Sync {
    /// Persist a new city and return it with its id.
    /// Fails with `StorageError::Conflict` if the same name and coordinates are already stored.
    async fn save_city(&self, city: &City) -> StorageResult<City>;

    /// Cities whose name matches case-insensitively, optionally filtered by exact coordinates
    async fn get_cities_by_match(
        &self,
        name: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Vec<City>>;

    async fn get_all_cities(&self) -> Result<Vec<City>>;
}

#[async_trait]
pub trait WeatherRepository: Send + Sync {
    /// Insert observations, skipping any whose `(city_id, date_time)` is already stored.
    /// Returns the number of rows actually inserted.
    async fn bulk_save(&self, observations: &[Observation]) -> Result<u64>;

    /// Observations whose local date lies in `[start, end]`, ordered by time
    async fn get_by_city_id_and_date_range(
        &self,
        city_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>>;

    /// Every observation of a city, ordered by time
    async fn get_by_city_id(&self, city_id: i64) -> Result<Vec<Observation>>;
}

#[async_trait]
pub trait Storage: CityRepository + WeatherRepository {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;
}
