//! Ingestion workflow: look a city up at the weather provider, persist it and
//! its hourly observations for a date range.

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, warn};

use crate::meteo::{MeteoClient, MeteoError};
use crate::models::{City, Observation};
use crate::storage::{CityRepository, StorageError, WeatherRepository};

/// Which provider candidates to load when a name is ambiguous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    First,
    All,
    Index(usize),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{start} happens after {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("strategy index requires --index")]
    MissingIndex,
    #[error(transparent)]
    Meteo(#[from] MeteoError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityLoadReport {
    /// The stored city, id always set
    pub city: City,
    pub already_existed: bool,
    /// Readings the provider returned for the range
    pub fetched: usize,
    /// Observations newly written; duplicates are not counted
    pub inserted: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    NoCitiesFound,
    IndexOutOfRange { index: usize, available: usize },
    Loaded(Vec<CityLoadReport>),
}

pub fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), IngestError> {
    if start > end {
        return Err(IngestError::InvertedRange { start, end });
    }
    Ok(())
}

pub struct Ingestor<'a, M: ?Sized, C: ?Sized, W: ?Sized> {
    meteo: &'a M,
    cities: &'a C,
    weather: &'a W,
}

impl<'a, M, C, W> Ingestor<'a, M, C, W>
where
    M: MeteoClient + ?Sized,
    C: CityRepository + ?Sized,
    W: WeatherRepository + ?Sized,
{
    pub fn new(meteo: &'a M, cities: &'a C, weather: &'a W) -> Self {
        Self {
            meteo,
            cities,
            weather,
        }
    }

    pub async fn candidates(&self, name: &str) -> Result<Vec<City>, IngestError> {
        Ok(self.meteo.get_cities_by_name(name).await?)
    }

    pub async fn load(
        &self,
        name: &str,
        start: NaiveDate,
        end: NaiveDate,
        strategy: LoadStrategy,
    ) -> Result<LoadOutcome, IngestError> {
        check_range(start, end)?;

        let candidates = self.candidates(name).await?;
        if candidates.is_empty() {
            info!("No candidates for '{}'", name);
            return Ok(LoadOutcome::NoCitiesFound);
        }

        let selected: Vec<&City> = match strategy {
            LoadStrategy::First => candidates.iter().take(1).collect(),
            LoadStrategy::All => candidates.iter().collect(),
            LoadStrategy::Index(index) => match candidates.get(index) {
                Some(city) => vec![city],
                None => {
                    return Ok(LoadOutcome::IndexOutOfRange {
                        index,
                        available: candidates.len(),
                    })
                }
            },
        };

        let mut reports = Vec::with_capacity(selected.len());
        for city in selected {
            reports.push(self.load_city(city, start, end).await?);
        }
        Ok(LoadOutcome::Loaded(reports))
    }

    /// Persist `city` (reusing the stored row if it exists) and its readings in range
    pub async fn load_city(
        &self,
        city: &City,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CityLoadReport, IngestError> {
        check_range(start, end)?;

        let (city_id, already_existed) = match self.cities.save_city(city).await {
            Ok(saved) => match saved.id {
                Some(id) => (id, false),
                None => {
                    return Err(IngestError::Storage(anyhow::anyhow!(
                        "storage returned {} without an id",
                        saved
                    )))
                }
            },
            Err(StorageError::Conflict { city_id }) => {
                warn!("City '{}' already stored with id {}", city, city_id);
                (city_id, true)
            }
            Err(StorageError::Other(e)) => return Err(IngestError::Storage(e)),
        };
        let stored = city.clone().with_id(city_id);

        let readings = self.meteo.get_hourly_readings(&stored, start, end).await?;
        let fetched = readings.len();

        let inserted = if readings.is_empty() {
            0
        } else {
            let observations: Vec<Observation> = readings
                .into_iter()
                .map(|reading| Observation::from_reading(city_id, reading))
                .collect();
            self.weather.bulk_save(&observations).await?
        };

        info!(
            "Loaded {} of {} readings for {} ({} to {})",
            inserted, fetched, stored, start, end
        );

        Ok(CityLoadReport {
            city: stored,
            already_existed,
            fetched,
            inserted,
        })
    }
}
