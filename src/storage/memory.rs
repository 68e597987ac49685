//! In-memory storage with the same semantics as the SQLite backend
//!
//! Used as a test double for the aggregation engine and the ingestion
//! workflow.

use crate::models::{City, Observation};
use crate::storage::{CityRepository, Storage, StorageError, StorageResult, WeatherRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

#[derive(Default)]
pub struct InMemoryStorage {
    cities: Mutex<Vec<City>>,
    observations: Mutex<Vec<Observation>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored observations across all cities
    pub async fn observation_count(&self) -> usize {
        self.observations.lock().await.len()
    }
}

fn sorted_by_time(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.sort_by_key(|observation| observation.date_time);
    observations
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn init(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl CityRepository for InMemoryStorage {
    async fn save_city(&self, city: &City) -> StorageResult<City> {
        let mut cities = self.cities.lock().await;

        let existing = cities.iter().find(|stored| {
            stored.name == city.name
                && stored.latitude == city.latitude
                && stored.longitude == city.longitude
        });
        if let Some(stored) = existing {
            return Err(StorageError::Conflict {
                city_id: stored.id.unwrap_or_default(),
            });
        }

        let id = cities.iter().filter_map(|c| c.id).max().unwrap_or(0) + 1;
        let saved = city.clone().with_id(id);
        cities.push(saved.clone());
        Ok(saved)
    }

    async fn get_cities_by_match(
        &self,
        name: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Vec<City>> {
        let cities = self.cities.lock().await;

        // ASCII-only folding, like SQLite's LOWER()
        Ok(cities
            .iter()
            .filter(|city| city.name.eq_ignore_ascii_case(name))
            .filter(|city| latitude.map_or(true, |lat| city.latitude == lat))
            .filter(|city| longitude.map_or(true, |lon| city.longitude == lon))
            .cloned()
            .collect())
    }

    async fn get_all_cities(&self) -> Result<Vec<City>> {
        Ok(self.cities.lock().await.clone())
    }
}

#[async_trait]
impl WeatherRepository for InMemoryStorage {
    async fn bulk_save(&self, observations: &[Observation]) -> Result<u64> {
        let mut stored = self.observations.lock().await;
        let mut inserted = 0;

        for observation in observations {
            let duplicate = stored.iter().any(|existing| {
                existing.city_id == observation.city_id
                    && existing.date_time == observation.date_time
            });
            if duplicate {
                continue;
            }

            let id = stored.len() as i64 + 1;
            stored.push(Observation {
                id: Some(id),
                ..observation.clone()
            });
            inserted += 1;
        }

        Ok(inserted)
    }

    async fn get_by_city_id_and_date_range(
        &self,
        city_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>> {
        let stored = self.observations.lock().await;
        Ok(sorted_by_time(
            stored
                .iter()
                .filter(|o| o.city_id == city_id)
                .filter(|o| (start..=end).contains(&o.local_date()))
                .cloned()
                .collect(),
        ))
    }

    async fn get_by_city_id(&self, city_id: i64) -> Result<Vec<Observation>> {
        let stored = self.observations.lock().await;
        Ok(sorted_by_time(
            stored
                .iter()
                .filter(|o| o.city_id == city_id)
                .cloned()
                .collect(),
        ))
    }
}
