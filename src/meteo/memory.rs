use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use super::{MeteoClient, MeteoError};
use crate::models::{City, HourlyReading};

/// Provider double serving canned candidates and readings
#[derive(Default)]
pub struct StaticMeteoClient {
    cities: Vec<City>,
    readings: Vec<(f64, f64, Vec<HourlyReading>)>,
    failure: Option<u16>,
    requests: Mutex<Vec<String>>,
}

impl StaticMeteoClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_city(mut self, city: City) -> Self {
        self.cities.push(city);
        self
    }

    /// Readings served for the city located at `latitude`, `longitude`
    pub fn with_readings(
        mut self,
        latitude: f64,
        longitude: f64,
        readings: Vec<HourlyReading>,
    ) -> Self {
        self.readings.push((latitude, longitude, readings));
        self
    }

    /// Every call answers with this HTTP status
    pub fn failing_with(mut self, status: u16) -> Self {
        self.failure = Some(status);
        self
    }

    /// Names passed to `get_cities_by_name`, in call order
    pub async fn requested_names(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl MeteoClient for StaticMeteoClient {
    async fn get_cities_by_name(&self, name: &str) -> Result<Vec<City>, MeteoError> {
        self.requests.lock().await.push(name.to_string());
        if let Some(status) = self.failure {
            return Err(MeteoError::Status { status });
        }

        Ok(self
            .cities
            .iter()
            .filter(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
            .collect())
    }

    async fn get_hourly_readings(
        &self,
        city: &City,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HourlyReading>, MeteoError> {
        if let Some(status) = self.failure {
            return Err(MeteoError::Status { status });
        }

        Ok(self
            .readings
            .iter()
            .filter(|(lat, lon, _)| *lat == city.latitude && *lon == city.longitude)
            .flat_map(|(_, _, readings)| readings.iter())
            .filter(|r| {
                let day = r.date_time.date_naive();
                day >= start && day <= end
            })
            .cloned()
            .collect())
    }
}
