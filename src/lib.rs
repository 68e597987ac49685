pub mod api;
pub mod config;
pub mod ingest;
pub mod meteo;
pub mod models;
pub mod stats;
pub mod storage;
pub mod validation;
