use anyhow::{Context, Result};
use tracing::debug;

use super::series::{self, Measure};
use crate::models::{
    City, CityPrecipitationStats, CityTemperatureStats, CityWeatherStats, Observation,
    PrecipitationStats, TemperatureStats, WeatherStatsByCity,
};
use crate::storage::{CityRepository, WeatherRepository};
use crate::validation::StatsQuery;

/// Per-request statistics computation over the city and weather repositories.
///
/// Holds no state of its own; build one per request.
pub struct StatsEngine<'a, C: ?Sized, W: ?Sized> {
    cities: &'a C,
    weather: &'a W,
}

impl<'a, C, W> StatsEngine<'a, C, W>
where
    C: CityRepository + ?Sized,
    W: WeatherRepository + ?Sized,
{
    pub fn new(cities: &'a C, weather: &'a W) -> Self {
        Self { cities, weather }
    }

    /// Temperature statistics for every matching city with observations in range
    pub async fn temperature(&self, query: &StatsQuery) -> Result<Vec<CityTemperatureStats>> {
        let mut stats = Vec::new();

        for (city, observations) in self.observations_in_range(query).await? {
            stats.push(CityTemperatureStats {
                latitude: city.latitude,
                longitude: city.longitude,
                temperature: temperature_stats(&observations, query),
            });
        }

        Ok(stats)
    }

    /// Precipitation statistics for every matching city with observations in range
    pub async fn precipitation(&self, query: &StatsQuery) -> Result<Vec<CityPrecipitationStats>> {
        let mut stats = Vec::new();

        for (city, observations) in self.observations_in_range(query).await? {
            stats.push(CityPrecipitationStats {
                latitude: city.latitude,
                longitude: city.longitude,
                precipitation: precipitation_stats(&observations),
            });
        }

        Ok(stats)
    }

    /// Whole-history snapshot of every city with observations, grouped by city name
    pub async fn all(&self) -> Result<WeatherStatsByCity> {
        let mut by_name = WeatherStatsByCity::new();

        for city in self.cities.get_all_cities().await? {
            let city_id = city_id(&city)?;
            let observations = self.weather.get_by_city_id(city_id).await?;

            let Some(snapshot) = weather_snapshot(&city, &observations) else {
                debug!("Skipping {} without observations", city);
                continue;
            };
            by_name.entry_or_default(&city.name).push(snapshot);
        }

        Ok(by_name)
    }

    /// Matching cities paired with their observations, dropping cities with none
    async fn observations_in_range(
        &self,
        query: &StatsQuery,
    ) -> Result<Vec<(City, Vec<Observation>)>> {
        let cities = self
            .cities
            .get_cities_by_match(query.city_name(), query.latitude(), query.longitude())
            .await?;
        debug!(
            "Matched {} cities for '{}'",
            cities.len(),
            query.city_name()
        );

        let mut matched = Vec::with_capacity(cities.len());
        for city in cities {
            let observations = self
                .weather
                .get_by_city_id_and_date_range(city_id(&city)?, query.start_date(), query.end_date())
                .await?;

            if observations.is_empty() {
                debug!("Skipping {} without observations in range", city);
                continue;
            }
            matched.push((city, observations));
        }

        Ok(matched)
    }
}

fn city_id(city: &City) -> Result<i64> {
    city.id
        .with_context(|| format!("city {} has not been persisted", city))
}

fn temperature_stats(observations: &[Observation], query: &StatsQuery) -> TemperatureStats {
    TemperatureStats {
        average: series::mean(observations, Measure::Temperature),
        average_by_day: series::mean_by_day(observations, Measure::Temperature),
        max: series::max(observations, Measure::Temperature),
        min: series::min(observations, Measure::Temperature),
        hours_above_threshold: series::count_above(
            observations,
            Measure::Temperature,
            query.upper_threshold(),
        ),
        hours_below_threshold: series::count_below(
            observations,
            Measure::Temperature,
            query.lower_threshold(),
        ),
    }
}

fn precipitation_stats(observations: &[Observation]) -> PrecipitationStats {
    PrecipitationStats {
        total: series::sum(observations, Measure::Precipitation),
        total_by_day: series::sum_by_day(observations, Measure::Precipitation),
        days_with_precipitation: series::count_above(observations, Measure::Precipitation, 0.0),
        max: series::max(observations, Measure::Precipitation),
        average: series::mean(observations, Measure::Precipitation),
    }
}

fn weather_snapshot(city: &City, observations: &[Observation]) -> Option<CityWeatherStats> {
    let (earliest, latest) = series::time_span(observations)?;

    Some(CityWeatherStats {
        latitude: city.latitude,
        longitude: city.longitude,
        start_date: earliest.day_key(),
        end_date: latest.day_key(),
        temperature_average: series::mean(observations, Measure::Temperature),
        precipitation_total: series::sum(observations, Measure::Precipitation),
        days_with_precipitation: series::count_above(observations, Measure::Precipitation, 0.0),
        precipitation_max: series::max(observations, Measure::Precipitation),
        temperature_max: series::max(observations, Measure::Temperature),
        temperature_min: series::min(observations, Measure::Temperature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use crate::validation::validate_params;
    use chrono::{FixedOffset, NaiveDate, TimeZone};
    use serde_json::json;

    fn hour(year: i32, month: u32, day: u32, hour: u32) -> chrono::DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(year, month, day, hour, 0, 0)
            .unwrap()
    }

    async fn add_city(
        storage: &InMemoryStorage,
        name: &str,
        coordinate: f64,
        readings: &[((i32, u32, u32, u32), f64, f64)],
    ) -> i64 {
        let city = storage
            .save_city(&City::new(name, coordinate, coordinate))
            .await
            .unwrap();
        let city_id = city.id.unwrap();

        let observations: Vec<Observation> = readings
            .iter()
            .map(|&((y, m, d, h), temperature, precipitation)| {
                Observation::new(city_id, hour(y, m, d, h), Some(temperature), Some(precipitation))
            })
            .collect();
        storage.bulk_save(&observations).await.unwrap();
        city_id
    }

    /// Three Madrids (one without data) and two Barcelonas
    async fn seeded_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new();
        add_city(
            &storage,
            "Madrid",
            1.0,
            &[
                ((2010, 1, 1, 0), 10.0, 0.1),
                ((2010, 1, 1, 1), 12.0, 0.2),
                ((2010, 1, 1, 2), 8.0, 0.0),
            ],
        )
        .await;
        add_city(&storage, "Madrid", 2.0, &[]).await;
        add_city(
            &storage,
            "Madrid",
            3.0,
            &[((2010, 1, 6, 0), 5.0, 0.2), ((2010, 1, 6, 1), 15.0, 0.0)],
        )
        .await;
        add_city(
            &storage,
            "Barcelona",
            4.0,
            &[((2011, 1, 2, 0), 0.0, 0.2), ((2011, 1, 2, 1), 10.0, 0.0)],
        )
        .await;
        add_city(
            &storage,
            "Barcelona",
            5.0,
            &[
                ((2010, 2, 2, 0), 5.0, 0.5),
                ((2010, 2, 2, 1), 5.0, 0.0),
                ((2011, 2, 2, 1), 20.0, 1.0),
            ],
        )
        .await;
        storage
    }

    fn query(city: &str, upper: &str, lower: &str) -> StatsQuery {
        validate_params(
            Some(city),
            Some("2001-01-01"),
            Some("2020-01-01"),
            None,
            None,
            Some(upper),
            Some(lower),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_temperature_skips_cities_without_observations() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let stats = engine.temperature(&query("madrid", "20", "-1")).await.unwrap();

        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!([
                {
                    "latitude": 1.0,
                    "longitude": 1.0,
                    "temperature": {
                        "average": 10.0,
                        "average_by_day": {"2010-01-01": 10.0},
                        "max": {"value": 12.0, "date": "2010-01-01T01:00"},
                        "min": {"value": 8.0, "date": "2010-01-01T02:00"},
                        "hours_above_threshold": 0,
                        "hours_below_threshold": 0
                    }
                },
                {
                    "latitude": 3.0,
                    "longitude": 3.0,
                    "temperature": {
                        "average": 10.0,
                        "average_by_day": {"2010-01-06": 10.0},
                        "max": {"value": 15.0, "date": "2010-01-06T01:00"},
                        "min": {"value": 5.0, "date": "2010-01-06T00:00"},
                        "hours_above_threshold": 0,
                        "hours_below_threshold": 0
                    }
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_temperature_threshold_counts() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let stats = engine.temperature(&query("Madrid", "9", "9")).await.unwrap();

        // City 1: 10 and 12 above, 8 below
        assert_eq!(stats[0].temperature.hours_above_threshold, 2);
        assert_eq!(stats[0].temperature.hours_below_threshold, 1);
        // City 3: 15 above, 5 below
        assert_eq!(stats[1].temperature.hours_above_threshold, 1);
        assert_eq!(stats[1].temperature.hours_below_threshold, 1);
    }

    #[tokio::test]
    async fn test_coordinate_filter_narrows_match() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);
        let query = validate_params(
            Some("Madrid"),
            Some("2001-01-01"),
            Some("2020-01-01"),
            Some("3.0"),
            Some("3"),
            None,
            None,
        )
        .unwrap();

        let stats = engine.temperature(&query).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].latitude, 3.0);
    }

    #[tokio::test]
    async fn test_date_range_excludes_observations() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);
        let query = validate_params(
            Some("Madrid"),
            Some("2010-01-02"),
            Some("2010-01-06"),
            None,
            None,
            None,
            None,
        )
        .unwrap();

        let stats = engine.temperature(&query).await.unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].latitude, 3.0);
        assert_eq!(query.start_date(), NaiveDate::from_ymd_opt(2010, 1, 2).unwrap());
    }

    #[tokio::test]
    async fn test_precipitation() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let stats = engine.precipitation(&query("Barcelona", "30", "0")).await.unwrap();

        assert_eq!(
            serde_json::to_value(&stats).unwrap(),
            json!([
                {
                    "latitude": 4.0,
                    "longitude": 4.0,
                    "precipitation": {
                        "total": 0.2,
                        "total_by_day": {"2011-01-02": 0.2},
                        "days_with_precipitation": 1,
                        "max": {"value": 0.2, "date": "2011-01-02T00:00"},
                        "average": 0.1
                    }
                },
                {
                    "latitude": 5.0,
                    "longitude": 5.0,
                    "precipitation": {
                        "total": 1.5,
                        "total_by_day": {"2010-02-02": 0.5, "2011-02-02": 1.0},
                        "days_with_precipitation": 2,
                        "max": {"value": 1.0, "date": "2011-02-02T01:00"},
                        "average": 0.5
                    }
                }
            ])
        );
    }

    #[tokio::test]
    async fn test_precipitation_total_is_not_rounded() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let stats = engine.precipitation(&query("Madrid", "30", "0")).await.unwrap();
        let madrid = &stats[0].precipitation;

        assert_eq!(madrid.total, 0.30000000000000004);
        assert_eq!(madrid.days_with_precipitation, 2);
        assert!((madrid.average.unwrap() - 0.1).abs() < 1e-12);

        let json = serde_json::to_string(madrid).unwrap();
        assert!(json.contains("\"total\":0.30000000000000004"));
    }

    #[tokio::test]
    async fn test_unknown_city_yields_empty_result() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let stats = engine.temperature(&query("Valencia", "30", "0")).await.unwrap();
        assert!(stats.is_empty());
    }

    #[tokio::test]
    async fn test_all_groups_by_name() {
        let storage = seeded_storage().await;
        let engine = StatsEngine::new(&storage, &storage);

        let by_name = engine.all().await.unwrap();

        assert_eq!(by_name.len(), 2);
        assert_eq!(by_name.get("Madrid").map(Vec::len), Some(2));
        assert_eq!(by_name.get("Barcelona").map(Vec::len), Some(2));
        assert_eq!(
            serde_json::to_value(&by_name).unwrap(),
            json!({
                "Madrid": [
                    {
                        "latitude": 1.0,
                        "longitude": 1.0,
                        "start_date": "2010-01-01",
                        "end_date": "2010-01-01",
                        "temperature_average": 10.0,
                        "precipitation_total": 0.30000000000000004,
                        "days_with_precipitation": 2,
                        "precipitation_max": {"date": "2010-01-01T01:00", "value": 0.2},
                        "temperature_max": {"date": "2010-01-01T01:00", "value": 12.0},
                        "temperature_min": {"date": "2010-01-01T02:00", "value": 8.0}
                    },
                    {
                        "latitude": 3.0,
                        "longitude": 3.0,
                        "start_date": "2010-01-06",
                        "end_date": "2010-01-06",
                        "temperature_average": 10.0,
                        "precipitation_total": 0.2,
                        "days_with_precipitation": 1,
                        "precipitation_max": {"date": "2010-01-06T00:00", "value": 0.2},
                        "temperature_max": {"date": "2010-01-06T01:00", "value": 15.0},
                        "temperature_min": {"date": "2010-01-06T00:00", "value": 5.0}
                    }
                ],
                "Barcelona": [
                    {
                        "latitude": 4.0,
                        "longitude": 4.0,
                        "start_date": "2011-01-02",
                        "end_date": "2011-01-02",
                        "temperature_average": 5.0,
                        "precipitation_total": 0.2,
                        "days_with_precipitation": 1,
                        "precipitation_max": {"date": "2011-01-02T00:00", "value": 0.2},
                        "temperature_max": {"date": "2011-01-02T01:00", "value": 10.0},
                        "temperature_min": {"date": "2011-01-02T00:00", "value": 0.0}
                    },
                    {
                        "latitude": 5.0,
                        "longitude": 5.0,
                        "start_date": "2010-02-02",
                        "end_date": "2011-02-02",
                        "temperature_average": 10.0,
                        "precipitation_total": 1.5,
                        "days_with_precipitation": 2,
                        "precipitation_max": {"date": "2011-02-02T01:00", "value": 1.0},
                        "temperature_max": {"date": "2011-02-02T01:00", "value": 20.0},
                        "temperature_min": {"date": "2010-02-02T00:00", "value": 5.0}
                    }
                ]
            })
        );

        let names: Vec<&str> = by_name.keys().collect();
        assert_eq!(names, vec!["Madrid", "Barcelona"]);
    }

    #[tokio::test]
    async fn test_all_with_no_data_is_empty() {
        let storage = InMemoryStorage::new();
        storage
            .save_city(&City::new("Nowhere", 0.0, 0.0))
            .await
            .unwrap();

        let engine = StatsEngine::new(&storage, &storage);
        assert!(engine.all().await.unwrap().is_empty());
    }
}
