//! Row shapes shared by the SQL backends

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use sqlx::FromRow;

use crate::models::Observation;

/// `weather_data` row. Instants are stored as UTC epoch seconds plus the
/// offset they were observed in, so local dates survive the round trip.
#[derive(Debug, FromRow)]
pub(crate) struct ObservationRow {
    pub id: i64,
    pub city_id: i64,
    pub timestamp: i64,
    pub utc_offset_seconds: i32,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
}

impl TryFrom<ObservationRow> for Observation {
    type Error = anyhow::Error;

    fn try_from(row: ObservationRow) -> Result<Self> {
        let offset = FixedOffset::east_opt(row.utc_offset_seconds)
            .with_context(|| format!("invalid utc offset {}", row.utc_offset_seconds))?;
        let utc = DateTime::from_timestamp(row.timestamp, 0)
            .with_context(|| format!("timestamp {} out of range", row.timestamp))?;

        Ok(Observation {
            id: Some(row.id),
            city_id: row.city_id,
            date_time: utc.with_timezone(&offset),
            temperature: row.temperature,
            precipitation: row.precipitation,
        })
    }
}

pub(crate) fn into_observations(rows: Vec<ObservationRow>) -> Result<Vec<Observation>> {
    rows.into_iter().map(Observation::try_from).collect()
}

/// Columns written for one observation: `(timestamp, utc_offset_seconds, day)`
pub(crate) fn instant_columns(observation: &Observation) -> (i64, i32, String) {
    (
        observation.date_time.timestamp(),
        observation.date_time.offset().local_minus_utc(),
        observation.day_key(),
    )
}
