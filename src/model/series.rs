//! Materialized series
//!
//! The read product of both dataset variants: ascending `(timestamp,
//! value)` pairs, already calibrated. Usable for downstream serialization
//! to JSON or columnar formats.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Calibrated `(timestamp, value)` pairs in ascending time order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series {
    points: Vec<(DateTime<Utc>, f64)>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-collected points; sorts by time
    pub fn from_points(mut points: Vec<(DateTime<Utc>, f64)>) -> Self {
        points.sort_by_key(|(t, _)| *t);
        Self { points }
    }

    pub fn push(&mut self, time: DateTime<Utc>, value: f64) {
        self.points.push((time, value));
    }

    /// Append another series; the result is unsorted until
    /// [`Series::sort_by_time`] is called
    pub fn extend(&mut self, other: Series) {
        self.points.extend(other.points);
    }

    /// Stable sort by timestamp. Overlapping timestamps keep insertion
    /// order and are not merged.
    pub fn sort_by_time(&mut self) {
        self.points.sort_by_key(|(t, _)| *t);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[(DateTime<Utc>, f64)] {
        &self.points
    }

    pub fn first(&self) -> Option<(DateTime<Utc>, f64)> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<(DateTime<Utc>, f64)> {
        self.points.last().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    /// Arithmetic mean; 0.0 for an empty series
    pub fn mean(&self) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.values().sum::<f64>() / self.len() as f64
    }

    /// Sample standard deviation (n-1); 0.0 for fewer than two points
    pub fn sample_stddev(&self) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .values()
            .map(|v| (v - mean) * (v - mean))
            .sum::<f64>()
            / (n - 1) as f64;
        var.sqrt()
    }

    /// Map every value through a function, keeping timestamps
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Series {
        Series {
            points: self.points.iter().map(|(t, v)| (*t, f(*v))).collect(),
        }
    }
}

impl IntoIterator for Series {
    type Item = (DateTime<Utc>, f64);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl FromIterator<(DateTime<Utc>, f64)> for Series {
    fn from_iter<I: IntoIterator<Item = (DateTime<Utc>, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
