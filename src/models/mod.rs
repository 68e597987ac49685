mod city;
mod observation;
mod ordered_map;
mod stats;

pub use city::City;
pub use observation::{HourlyReading, Observation};
pub use ordered_map::OrderedMap;
pub use stats::{
    CityPrecipitationStats, CityTemperatureStats, CityWeatherStats, Extremum, PrecipitationStats,
    TemperatureStats, WeatherStatsByCity,
};
