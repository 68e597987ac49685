//! Query parameter validation
//!
//! Turns the raw query string values of a stats request into a typed
//! [`StatsQuery`]. Checks run in a fixed order and the first failure wins.

use chrono::NaiveDate;
use thiserror::Error;

const DEFAULT_UPPER_THRESHOLD: f64 = 30.0;
const DEFAULT_LOWER_THRESHOLD: f64 = 0.0;

const LATITUDE_BOUNDS: (f64, f64) = (-90.0, 90.0);
const LONGITUDE_BOUNDS: (f64, f64) = (-180.0, 180.0);

/// A user input problem. The message is returned to the caller verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn missing(field: &str) -> Self {
        Self::new(format!("Mandatory field {field} cannot be None"))
    }

    fn invalid_format(field: &str, raw: &str) -> Self {
        Self::new(format!("Invalid format for {field}: {raw}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Validated parameters of a temperature or precipitation request
#[derive(Debug, Clone, PartialEq)]
pub struct StatsQuery {
    city_name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    latitude: Option<f64>,
    longitude: Option<f64>,
    upper_threshold: f64,
    lower_threshold: f64,
}

impl StatsQuery {
    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    pub fn upper_threshold(&self) -> f64 {
        self.upper_threshold
    }

    pub fn lower_threshold(&self) -> f64 {
        self.lower_threshold
    }
}

/// Validate the raw parameters of a stats request.
///
/// Only absent values trip the mandatory checks; an empty date is a format
/// error. Empty optional numbers count as absent.
pub fn validate_params(
    city_name: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    latitude: Option<&str>,
    longitude: Option<&str>,
    upper_threshold: Option<&str>,
    lower_threshold: Option<&str>,
) -> Result<StatsQuery, ValidationError> {
    let city_name = mandatory("city_name", city_name)?;
    let start_raw = mandatory("start_date", start_date)?;
    let end_raw = mandatory("end_date", end_date)?;

    let start_date = parse_date("start_date", start_raw)?;
    let end_date = parse_date("end_date", end_raw)?;
    if start_date > end_date {
        return Err(ValidationError::new(format!(
            "start_date {} is greater than {}.",
            start_date.format("%Y-%m-%d"),
            end_date.format("%Y-%m-%d")
        )));
    }

    let latitude = parse_float("latitude", latitude)?;
    if let Some(value) = latitude {
        check_range("latitude", value, LATITUDE_BOUNDS)?;
    }

    let longitude = parse_float("longitude", longitude)?;
    if let Some(value) = longitude {
        check_range("longitude", value, LONGITUDE_BOUNDS)?;
    }

    let upper_threshold =
        parse_float("upper_threshold", upper_threshold)?.unwrap_or(DEFAULT_UPPER_THRESHOLD);
    let lower_threshold =
        parse_float("lower_threshold", lower_threshold)?.unwrap_or(DEFAULT_LOWER_THRESHOLD);

    Ok(StatsQuery {
        city_name: city_name.to_string(),
        start_date,
        end_date,
        latitude,
        longitude,
        upper_threshold,
        lower_threshold,
    })
}

fn present(raw: Option<&str>) -> Option<&str> {
    raw.filter(|value| !value.trim().is_empty())
}

fn mandatory<'a>(field: &str, raw: Option<&'a str>) -> Result<&'a str, ValidationError> {
    raw.ok_or_else(|| ValidationError::missing(field))
}

/// Parse a `YYYY-MM-DD` date. The year takes exactly four digits, month and
/// day one or two.
fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let invalid = || ValidationError::invalid_format(field, raw);

    let mut parts = raw.split('-');
    let (Some(year), Some(month), Some(day), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let is_number = |part: &str, min_len: usize, max_len: usize| {
        (min_len..=max_len).contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
    };
    if !is_number(year, 4, 4) || !is_number(month, 1, 2) || !is_number(day, 1, 2) {
        return Err(invalid());
    }

    let (Ok(year), Ok(month), Ok(day)) = (
        year.parse::<i32>(),
        month.parse::<u32>(),
        day.parse::<u32>(),
    ) else {
        return Err(invalid());
    };
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

fn parse_float(field: &str, raw: Option<&str>) -> Result<Option<f64>, ValidationError> {
    match present(raw) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ValidationError::invalid_format(field, value)),
    }
}

fn check_range(field: &str, value: f64, (lower, upper): (f64, f64)) -> Result<(), ValidationError> {
    if value > upper {
        return Err(ValidationError::new(format!(
            "{field} {} is greater than {}.",
            render_float(value),
            render_float(upper)
        )));
    }
    if value < lower {
        return Err(ValidationError::new(format!(
            "{field} {} is lower than {}.",
            render_float(value),
            render_float(lower)
        )));
    }
    Ok(())
}

/// Shortest round-trip rendering that always shows a fraction or an
/// exponent: `90.0`, `0.0001`, `1e+20`, `1.5e-05`.
fn render_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let plain = value.to_string();
        return if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        };
    }

    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific,
    }
}
