//! Weather statistics aggregation
//!
//! [`StatsEngine`] resolves cities through the repositories, pulls their
//! observations and reduces them with the helpers in [`series`].

mod engine;
pub mod series;

pub use engine::StatsEngine;
