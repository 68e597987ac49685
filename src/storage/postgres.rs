use crate::models::{City, Observation};
use crate::storage::rows::{instant_columns, into_observations, ObservationRow};
use crate::storage::{CityRepository, Storage, StorageError, StorageResult, WeatherRepository};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cities (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                UNIQUE (name, latitude, longitude)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS weather_data (
                id BIGSERIAL PRIMARY KEY,
                city_id BIGINT NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
                timestamp BIGINT NOT NULL,
                utc_offset_seconds INTEGER NOT NULL,
                day TEXT NOT NULL,
                temperature DOUBLE PRECISION,
                precipitation DOUBLE PRECISION,
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
impl CityRepository for PostgresStorage {
    async fn save_city(&self, city: &City) -> StorageResult<City> {
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO cities (name, latitude, longitude)
            VALUES ($1, $2, $3)
            ON CONFLICT (name, latitude, longitude) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&city.name)
        .bind(city.latitude)
        .bind(city.longitude)
        .fetch_optional(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        match inserted {
            Some(id) => Ok(city.clone().with_id(id)),
            None => {
                let city_id = sqlx::query_scalar::<_, i64>(
                    r#"
                    SELECT id FROM cities
                    WHERE name = $1 AND latitude = $2 AND longitude = $3
                    "#,
                )
                .bind(&city.name)
                .bind(city.latitude)
                .bind(city.longitude)
                .fetch_one(self.pool.as_ref())
                .await
                .map_err(|e| StorageError::Other(e.into()))?;

                Err(StorageError::Conflict { city_id })
            }
        }
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
            WHERE LOWER(name) = LOWER($1)
              AND ($2::DOUBLE PRECISION IS NULL OR latitude = $2)
              AND ($3::DOUBLE PRECISION IS NULL OR longitude = $3)
            ORDER BY id
            "#,
        )
        .bind(name)
        .bind(latitude)
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
impl WeatherRepository for PostgresStorage {
    async fn bulk_save(&self, observations: &[Observation]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for observation in observations {
            let (timestamp, utc_offset_seconds, day) = instant_columns(observation);
            let result = sqlx::query(
                r#"
                INSERT INTO weather_data
                    (city_id, timestamp, utc_offset_seconds, day, temperature, precipitation)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (city_id, timestamp) DO NOTHING
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
            WHERE city_id = $1 AND day BETWEEN $2 AND $3
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
            WHERE city_id = $1
            ORDER BY timestamp
            "#,
        )
        .bind(city_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        into_observations(rows)
    }
}
