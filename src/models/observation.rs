use chrono::{DateTime, FixedOffset, NaiveDate};

/// One hourly reading as delivered by the weather provider, not yet tied to a stored city.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyReading {
    pub date_time: DateTime<FixedOffset>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    /// Millimetres
    pub precipitation: Option<f64>,
}

/// A stored hourly reading for one city.
///
/// At most one observation exists per `(city_id, date_time)` instant.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: Option<i64>,
    pub city_id: i64,
    pub date_time: DateTime<FixedOffset>,
    pub temperature: Option<f64>,
    pub precipitation: Option<f64>,
}

impl Observation {
    pub fn new(
        city_id: i64,
        date_time: DateTime<FixedOffset>,
        temperature: Option<f64>,
        precipitation: Option<f64>,
    ) -> Self {
        Self {
            id: None,
            city_id,
            date_time,
            temperature,
            precipitation,
        }
    }

    pub fn from_reading(city_id: i64, reading: HourlyReading) -> Self {
        Self::new(
            city_id,
            reading.date_time,
            reading.temperature,
            reading.precipitation,
        )
    }

    /// Calendar date in the observation's own offset
    pub fn local_date(&self) -> NaiveDate {
        self.date_time.date_naive()
    }

    /// `YYYY-MM-DD` key used for per-day groupings
    pub fn day_key(&self) -> String {
        self.date_time.format("%Y-%m-%d").to_string()
    }

    /// Minute-precision rendering, `YYYY-MM-DDTHH:MM`
    pub fn minute_key(&self) -> String {
        self.date_time.format("%Y-%m-%dT%H:%M").to_string()
    }
}
