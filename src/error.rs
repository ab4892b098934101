//! Engine error types
//!
//! One error enum covers the whole engine surface. The translation layers
//! above this crate (HTTP, CLI) only need to know whether a failure was
//! caused by bad input or by the store, which is what
//! [`Error::is_caller_error`] answers.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::store::StoreError;

/// Errors reported by the dataset engine
#[derive(Error, Debug)]
pub enum Error {
    /// A value violates the value type's inclusive range
    #[error("value {value} {unit} is out of range for {name}")]
    OutOfRange {
        value: f64,
        name: String,
        unit: String,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// A timestamp falls outside the dataset's validity interval
    #[error("time {time} is outside the dataset validity interval")]
    OutOfTimespan {
        time: DateTime<Utc>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },

    /// Dataset validity interval has `start > end`
    #[error("validity interval start {start} is after end {end}")]
    InvalidTimespan {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Interpolation or iteration over a dataset with no usable records
    #[error("ds{0:04} has no records")]
    NoData(i64),

    /// Split time is not straddled by two valid records
    #[error("split time {time} is not between two records of ds{dataset:04}")]
    InvalidSplitPoint { dataset: i64, time: DateTime<Utc> },

    /// A transformed dataset has no sources
    #[error("transformed dataset ds{0:04} has no sources")]
    EmptySourceSet(i64),

    /// A transformed dataset references a missing or unusable source.
    /// The field is deliberately not named `source`: thiserror would wire
    /// a field of that name into `std::error::Error::source()`.
    #[error("ds{dataset:04} references missing or unusable source ds{source_id:04}")]
    DanglingSourceReference { dataset: i64, source_id: i64 },

    /// Transform expression failed to parse or is not allowed
    #[error("expression error: {0}")]
    Expression(String),

    /// Referenced dataset does not exist
    #[error("dataset ds{0:04} not found")]
    DatasetNotFound(i64),

    /// Referenced value type does not exist
    #[error("value type {0} not found")]
    UnknownValueType(i64),

    /// A record-level operation was applied to a dataset without records
    #[error("ds{0:04} is not a timeseries")]
    NotATimeseries(i64),

    /// Store failure, opaque to the engine; the caller may retry
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Error {
    /// True for bad-input failures, false for infrastructure failures.
    ///
    /// HTTP-style callers map caller errors to 4xx and store errors to 5xx.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Error::Store(_))
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoData(17);
        assert_eq!(err.to_string(), "ds0017 has no records");

        let err = Error::EmptySourceSet(3);
        assert_eq!(err.to_string(), "transformed dataset ds0003 has no sources");
    }

    #[test]
    fn test_dangling_reference_has_no_error_chain() {
        let err = Error::DanglingSourceReference {
            dataset: 4,
            source_id: 9,
        };
        assert_eq!(
            err.to_string(),
            "ds0004 references missing or unusable source ds0009"
        );
        // The referenced id is plain data, not a wrapped error
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_caller_error_split() {
        assert!(Error::NoData(1).is_caller_error());
        assert!(Error::DatasetNotFound(1).is_caller_error());
        assert!(Error::Expression("bad".into()).is_caller_error());
        assert!(!Error::Store(StoreError::Unavailable("down".into())).is_caller_error());
    }
}
