pub const DEFAULT_CITY_ENDPOINT: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_WEATHER_ENDPOINT: &str = "https://archive-api.open-meteo.com/v1/archive";

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub meteo: MeteoConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Endpoints of the external weather provider
#[derive(Debug, Clone)]
pub struct MeteoConfig {
    pub city_endpoint: String,
    pub weather_endpoint: String,
}

impl Default for MeteoConfig {
    fn default() -> Self {
        Self {
            city_endpoint: DEFAULT_CITY_ENDPOINT.to_string(),
            weather_endpoint: DEFAULT_WEATHER_ENDPOINT.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./meteo_stats.db?mode=rwc".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()?;

        let city_endpoint = std::env::var("OPEN_METEO_CITY_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_CITY_ENDPOINT.to_string());
        let weather_endpoint = std::env::var("OPEN_METEO_WEATHER_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_WEATHER_ENDPOINT.to_string());

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            meteo: MeteoConfig {
                city_endpoint,
                weather_endpoint,
            },
        })
    }
}
