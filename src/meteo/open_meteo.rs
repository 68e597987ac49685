//! Client for the Open-Meteo geocoding and historical archive APIs.

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{MeteoClient, MeteoError};
use crate::config::MeteoConfig;
use crate::models::{City, HourlyReading};

const HOURLY_VARIABLES: &str = "precipitation,temperature_2m";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<HourlySeries>,
}

#[derive(Debug, Default, Deserialize)]
struct HourlySeries {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m: Vec<Option<f64>>,
}

pub struct OpenMeteoClient {
    client: Client,
    city_endpoint: String,
    weather_endpoint: String,
}

impl OpenMeteoClient {
    pub fn new(config: &MeteoConfig) -> Self {
        Self::with_endpoints(&config.city_endpoint, &config.weather_endpoint)
    }

    pub fn with_endpoints(city_endpoint: &str, weather_endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            city_endpoint: city_endpoint.to_string(),
            weather_endpoint: weather_endpoint.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, MeteoError> {
        let url = Url::parse_with_params(endpoint, params)
            .map_err(|e| MeteoError::Endpoint(format!("{endpoint}: {e}")))?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("Request to {} failed with status {}", endpoint, status);
            return Err(MeteoError::Status {
                status: status.as_u16(),
            });
        }

        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl MeteoClient for OpenMeteoClient {
    async fn get_cities_by_name(&self, name: &str) -> Result<Vec<City>, MeteoError> {
        let response: GeocodingResponse = self
            .get_json(&self.city_endpoint, &[("name", name.to_string())])
            .await?;

        let cities: Vec<City> = response
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|result| City::new(result.name, result.latitude, result.longitude))
            .collect();

        info!("Provider returned {} candidates for '{}'", cities.len(), name);
        Ok(cities)
    }

    async fn get_hourly_readings(
        &self,
        city: &City,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HourlyReading>, MeteoError> {
        let response: ArchiveResponse = self
            .get_json(
                &self.weather_endpoint,
                &[
                    ("latitude", city.latitude.to_string()),
                    ("longitude", city.longitude.to_string()),
                    ("start_date", start.format("%Y-%m-%d").to_string()),
                    ("end_date", end.format("%Y-%m-%d").to_string()),
                    ("hourly", HOURLY_VARIABLES.to_string()),
                ],
            )
            .await?;

        let offset = FixedOffset::east_opt(response.utc_offset_seconds).ok_or_else(|| {
            MeteoError::Payload(format!(
                "utc_offset_seconds {} out of range",
                response.utc_offset_seconds
            ))
        })?;

        let hourly = response.hourly.unwrap_or_default();
        let readings = hourly
            .time
            .iter()
            .enumerate()
            .map(|(i, time)| {
                // Provider times are UTC wall clock; shift them into the reported offset
                let naive = NaiveDateTime::parse_from_str(time, TIME_FORMAT)
                    .map_err(|e| MeteoError::Payload(format!("time '{time}': {e}")))?;
                Ok(HourlyReading {
                    date_time: naive.and_utc().with_timezone(&offset),
                    temperature: hourly.temperature_2m.get(i).copied().flatten(),
                    precipitation: hourly.precipitation.get(i).copied().flatten(),
                })
            })
            .collect::<Result<Vec<_>, MeteoError>>()?;

        info!("Provider returned {} hourly readings for {}", readings.len(), city);
        Ok(readings)
    }
}
