//! Measurement records
//!
//! A `Record` is one raw observation owned by exactly one dataset. The
//! calibrated value is never persisted; reads produce a
//! `CalibratedRecord` carrying both the raw and the calibrated value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Calibration;

/// One raw observation belonging to exactly one dataset
///
/// The id is unique within the owning dataset only; temporal operations
/// order records by timestamp, not by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Identifier, unique within the owning dataset
    pub id: i64,
    /// Owning dataset id
    pub dataset: i64,
    /// Time of the measurement
    pub time: DateTime<Utc>,
    /// Raw value; None denotes a deliberately missing reading
    pub value: Option<f64>,
    /// Label of the physical sample this reading was taken from, if any
    #[serde(default)]
    pub sample: Option<String>,
    /// Free-text annotation
    #[serde(default)]
    pub comment: Option<String>,
    /// Marked as erroneous; excluded from analysis
    #[serde(default)]
    pub is_error: bool,
}

impl Record {
    /// Create a record with required fields
    pub fn new(id: i64, dataset: i64, time: DateTime<Utc>, value: Option<f64>) -> Self {
        Self {
            id,
            dataset,
            time,
            value,
            sample: None,
            comment: None,
            is_error: false,
        }
    }

    /// Builder: set sample label
    pub fn sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = Some(sample.into());
        self
    }

    /// Builder: set comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder: set the error flag
    pub fn error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    /// Usable for analysis: neither flagged as error nor missing
    pub fn is_valid(&self) -> bool {
        !self.is_error && self.value.is_some()
    }

    /// Calibrated value under the owning dataset's calibration
    pub fn calibrated(&self, calibration: Calibration) -> Option<f64> {
        calibration.apply(self.value)
    }
}

/// A record as seen by readers: calibrated value alongside the raw one
///
/// Produced by record iteration on both dataset variants. For transformed
/// datasets `value` is the expression result and `raw` the calibrated
/// source value it was computed from.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalibratedRecord {
    pub id: i64,
    pub dataset: i64,
    pub time: DateTime<Utc>,
    /// Calibrated (or derived) value
    pub value: Option<f64>,
    /// Value before calibration (or derivation)
    pub raw: Option<f64>,
    pub sample: Option<String>,
    pub comment: Option<String>,
    pub is_error: bool,
}

impl CalibratedRecord {
    /// View a stored record through a calibration
    pub fn from_record(record: Record, calibration: Calibration) -> Self {
        let value = record.calibrated(calibration);
        Self {
            id: record.id,
            dataset: record.dataset,
            time: record.time,
            value,
            raw: record.value,
            sample: record.sample,
            comment: record.comment,
            is_error: record.is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_record_validity() {
        let rec = Record::new(1, 10, t(0), Some(4.2));
        assert!(rec.is_valid());

        let rec = Record::new(2, 10, t(1), None);
        assert!(!rec.is_valid());

        let rec = Record::new(3, 10, t(2), Some(4.2)).error(true);
        assert!(!rec.is_valid());
    }

    #[test]
    fn test_record_calibration() {
        let cal = Calibration::new(1.0, 2.0);
        let rec = Record::new(1, 10, t(0), Some(3.0));
        assert_eq!(rec.calibrated(cal), Some(7.0));

        let rec = Record::new(2, 10, t(1), None);
        assert_eq!(rec.calibrated(cal), None);
    }

    #[test]
    fn test_calibrated_record_keeps_raw() {
        let cal = Calibration::new(0.5, 10.0);
        let rec = Record::new(1, 10, t(0), Some(2.0)).sample("B-17");
        let view = CalibratedRecord::from_record(rec, cal);

        assert_eq!(view.raw, Some(2.0));
        assert_eq!(view.value, Some(20.5));
        assert_eq!(view.sample.as_deref(), Some("B-17"));
    }
}
