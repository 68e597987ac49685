use sqlx::FromRow;
use std::fmt;

/// A named location. Several cities may share a name; coordinates tell them apart.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct City {
    /// Assigned by storage, `None` until the city is persisted
    pub id: Option<i64>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl City {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            latitude,
            longitude,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, [latitude: {}, longitude: {}]",
            self.name, self.latitude, self.longitude
        )
    }
}
