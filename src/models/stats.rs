//! Statistics produced by the aggregation engine
//!
//! These types serialize directly into the HTTP response bodies.

use serde::Serialize;

use super::OrderedMap;

/// An extreme reading and the minute it was observed at (`YYYY-MM-DDTHH:MM`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extremum {
    pub value: f64,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub average: Option<f64>,
    pub average_by_day: OrderedMap<Option<f64>>,
    pub max: Option<Extremum>,
    pub min: Option<Extremum>,
    /// Observations strictly above the upper threshold
    pub hours_above_threshold: u64,
    /// Observations strictly below the lower threshold
    pub hours_below_threshold: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationStats {
    pub total: f64,
    pub total_by_day: OrderedMap<f64>,
    /// Number of observations with precipitation above zero
    pub days_with_precipitation: u64,
    pub max: Option<Extremum>,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityTemperatureStats {
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: TemperatureStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPrecipitationStats {
    pub latitude: f64,
    pub longitude: f64,
    pub precipitation: PrecipitationStats,
}

/// Combined snapshot of one city's whole history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityWeatherStats {
    pub latitude: f64,
    pub longitude: f64,
    /// Day of the earliest observation
    pub start_date: String,
    /// Day of the latest observation
    pub end_date: String,
    pub temperature_average: Option<f64>,
    pub precipitation_total: f64,
    pub days_with_precipitation: u64,
    pub precipitation_max: Option<Extremum>,
    pub temperature_max: Option<Extremum>,
    pub temperature_min: Option<Extremum>,
}

/// City name to the snapshots of every city sharing that name
pub type WeatherStatsByCity = OrderedMap<Vec<CityWeatherStats>>;
