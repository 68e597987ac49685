//! Reductions over a city's observations
//!
//! Values missing from an observation are skipped. Sums and means use plain
//! left-to-right floating point accumulation, so totals such as
//! `0.1 + 0.2` keep their `0.30000000000000004` representation.

use crate::models::{Extremum, Observation, OrderedMap};

/// Which reading of an observation to reduce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Temperature,
    Precipitation,
}

impl Measure {
    pub fn of(self, observation: &Observation) -> Option<f64> {
        match self {
            Measure::Temperature => observation.temperature,
            Measure::Precipitation => observation.precipitation,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: u64,
}

impl Accumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

fn values(observations: &[Observation], measure: Measure) -> impl Iterator<Item = f64> + '_ {
    observations.iter().filter_map(move |o| measure.of(o))
}

pub fn sum(observations: &[Observation], measure: Measure) -> f64 {
    values(observations, measure).fold(0.0, |total, value| total + value)
}

/// `None` when no observation carries the measure
pub fn mean(observations: &[Observation], measure: Measure) -> Option<f64> {
    let mut acc = Accumulator::default();
    for observation in observations {
        acc.push(measure.of(observation));
    }
    acc.mean()
}

fn group_by_day(observations: &[Observation], measure: Measure) -> OrderedMap<Accumulator> {
    let mut days: OrderedMap<Accumulator> = OrderedMap::new();
    for observation in observations {
        days.entry_or_default(&observation.day_key())
            .push(measure.of(observation));
    }
    days
}

/// Mean per local calendar day, keyed `YYYY-MM-DD` in first-seen order
pub fn mean_by_day(observations: &[Observation], measure: Measure) -> OrderedMap<Option<f64>> {
    group_by_day(observations, measure).map_values(Accumulator::mean)
}

/// Sum per local calendar day, keyed `YYYY-MM-DD` in first-seen order
pub fn sum_by_day(observations: &[Observation], measure: Measure) -> OrderedMap<f64> {
    group_by_day(observations, measure).map_values(|acc| acc.sum)
}

pub fn count_above(observations: &[Observation], measure: Measure, threshold: f64) -> u64 {
    values(observations, measure)
        .filter(|value| *value > threshold)
        .count() as u64
}

pub fn count_below(observations: &[Observation], measure: Measure, threshold: f64) -> u64 {
    values(observations, measure)
        .filter(|value| *value < threshold)
        .count() as u64
}

/// Largest reading; ties resolve to the earliest in iteration order
pub fn max(observations: &[Observation], measure: Measure) -> Option<Extremum> {
    extremum(observations, measure, |candidate, best| candidate > best)
}

/// Smallest reading; ties resolve to the earliest in iteration order
pub fn min(observations: &[Observation], measure: Measure) -> Option<Extremum> {
    extremum(observations, measure, |candidate, best| candidate < best)
}

fn extremum(
    observations: &[Observation],
    measure: Measure,
    beats: impl Fn(f64, f64) -> bool,
) -> Option<Extremum> {
    let mut best: Option<(f64, &Observation)> = None;
    for observation in observations {
        let Some(value) = measure.of(observation) else {
            continue;
        };
        match best {
            Some((current, _)) if !beats(value, current) => {}
            _ => best = Some((value, observation)),
        }
    }

    best.map(|(value, observation)| Extremum {
        value,
        date: observation.minute_key(),
    })
}

/// Earliest and latest observation instants
pub fn time_span(observations: &[Observation]) -> Option<(&Observation, &Observation)> {
    let earliest = observations.iter().min_by_key(|o| o.date_time)?;
    let latest = observations.iter().max_by_key(|o| o.date_time)?;
    Some((earliest, latest))
}
