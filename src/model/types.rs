//! Reference data and value semantics
//!
//! - `ValueType`: what is measured (unit, valid range)
//! - `Quality`: provenance tier of a dataset (raw, checked, calibrated)
//! - `Calibration`: linear raw-to-physical transform applied at read time
//! - `TimeWindow`: optionally bounded, inclusive time interval for queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The measured quantity of a dataset: temperature, water depth, wind speed
///
/// Reference data, immutable after creation in normal operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueType {
    /// Unique identifier
    pub id: i64,
    /// Human-readable name (e.g. "air temperature")
    pub name: String,
    /// Unit of measurement (e.g. "degC", "m", "m/s")
    pub unit: String,
    /// Optional description
    #[serde(default)]
    pub comment: Option<String>,
    /// Optional inclusive lower bound for plausible values
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Optional inclusive upper bound for plausible values
    #[serde(default)]
    pub max_value: Option<f64>,
}

impl ValueType {
    /// Create a new value type with required fields
    pub fn new(id: i64, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            unit: unit.into(),
            comment: None,
            min_value: None,
            max_value: None,
        }
    }

    /// Builder: set the plausible range
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    /// Builder: set description
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// A value is in range iff it is not below `min_value` (when set)
    /// and not above `max_value` (when set).
    pub fn in_range(&self, value: f64) -> bool {
        if let Some(min) = self.min_value {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max_value {
            if value > max {
                return false;
            }
        }
        true
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}] ({})", self.name, self.unit, self.id)
    }
}

/// Data quality tier of a dataset's records, from raw to calibrated
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quality {
    /// Unique identifier
    pub id: i64,
    /// Short name (e.g. "raw", "checked", "calibrated")
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub comment: Option<String>,
}

impl Quality {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            comment: None,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Linear calibration applied to raw values at read time
///
/// `calibrate(raw) = raw * slope + offset`. Stored raw values are never
/// mutated; calibration is recomputed on every read. Slope 0.0 is legal
/// but degenerate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Calibration {
    pub offset: f64,
    pub slope: f64,
}

impl Calibration {
    pub fn new(offset: f64, slope: f64) -> Self {
        Self { offset, slope }
    }

    /// Identity calibration (offset 0, slope 1)
    pub fn identity() -> Self {
        Self {
            offset: 0.0,
            slope: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.offset == 0.0 && self.slope == 1.0
    }

    /// Calibrate a present value
    pub fn apply_raw(&self, raw: f64) -> f64 {
        raw * self.slope + self.offset
    }

    /// Calibrate an optional value; missing readings stay missing
    pub fn apply(&self, raw: Option<f64>) -> Option<f64> {
        raw.map(|v| self.apply_raw(v))
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::identity()
    }
}

/// Optionally bounded time interval, inclusive on both ends
///
/// All record queries take a window; `TimeWindow::all()` means no bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Unbounded window
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Window bounded below only
    pub fn from(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Window bounded above only
    pub fn until(end: DateTime<Utc>) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Check whether a timestamp falls inside the window
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if time < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if time > end {
                return false;
            }
        }
        true
    }
}
