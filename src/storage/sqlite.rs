use crate::models::{City, Observation};
use crate::storage::rows::{instant_columns, into_observations, ObservationRow};
use crate::storage::{CityRepository, Storage, StorageError, StorageResult, WeatherRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                UNIQUE (name, latitude, longitude)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                city_id INTEGER NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
                timestamp INTEGER NOT NULL,
                utc_offset_seconds INTEGER NOT NULL,
                day TEXT NOT NULL,
                temperature REAL,
                precipitation REAL,
                UNIQUE (city_id, timestamp)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_weather_city_day ON weather_data(city_id, day)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CityRepository for SqliteStorage {
    async fn save_city(&self, city: &City) -> StorageResult<City> {
        let result = sqlx::query(
            r#"
            INSERT INTO cities (name, latitude, longitude)
            VALUES (?, ?, ?)
            ON CONFLICT(name, latitude, longitude) DO NOTHING
            "#,
        )
        .bind(&city.name)
        .bind(city.latitude)
        .bind(city.longitude)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            let city_id = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT id FROM cities
                WHERE name = ? AND latitude = ? AND longitude = ?
                "#,
            )
            .bind(&city.name)
            .bind(city.latitude)
            .bind(city.longitude)
            .fetch_one(self.pool.as_ref())
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

            return Err(StorageError::Conflict { city_id });
        }

        Ok(city.clone().with_id(result.last_insert_rowid()))
    }

    async fn get_cities_by_match(
        &self,
        name: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Vec<City>> {
        let cities = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name, latitude, longitude
            FROM cities
            WHERE LOWER(name) = LOWER(?)
              AND (? IS NULL OR latitude = ?)
              AND (? IS NULL OR longitude = ?)
            ORDER BY id
            "#,
        )
        .bind(name)
        .bind(latitude)
        .bind(latitude)
        .bind(longitude)
        .bind(longitude)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(cities)
    }

    async fn get_all_cities(&self) -> Result<Vec<City>> {
        let cities = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name, latitude, longitude
            FROM cities
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(cities)
    }
}

#[async_trait]
impl WeatherRepository for SqliteStorage {
    async fn bulk_save(&self, observations: &[Observation]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for observation in observations {
            let (timestamp, utc_offset_seconds, day) = instant_columns(observation);
            let result = sqlx::query(
                r#"
                INSERT INTO weather_data
                    (city_id, timestamp, utc_offset_seconds, day, temperature, precipitation)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(city_id, timestamp) DO NOTHING
                "#,
            )
            .bind(observation.city_id)
            .bind(timestamp)
            .bind(utc_offset_seconds)
            .bind(day)
            .bind(observation.temperature)
            .bind(observation.precipitation)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn get_by_city_id_and_date_range(
        &self,
        city_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, city_id, timestamp, utc_offset_seconds, temperature, precipitation
            FROM weather_data
            WHERE city_id = ? AND day BETWEEN ? AND ?
            ORDER BY timestamp
            "#,
        )
        .bind(city_id)
        .bind(start.format("%Y-%m-%d").to_string())
        .bind(end.format("%Y-%m-%d").to_string())
        .fetch_all(self.pool.as_ref())
        .await?;

        into_observations(rows)
    }

    async fn get_by_city_id(&self, city_id: i64) -> Result<Vec<Observation>> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT id, city_id, timestamp, utc_offset_seconds, temperature, precipitation
            FROM weather_data
            WHERE city_id = ?
            ORDER BY timestamp
            "#,
        )
        .bind(city_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        into_observations(rows)
    }
}
