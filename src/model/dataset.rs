//! Datasets: the central entity of the engine
//!
//! A dataset groups records with their semantics: location, instrument,
//! value type, responsible person, quality tier and calibration. Two
//! variants exist, selected by [`DatasetKind`]:
//!
//! - `Timeseries` owns raw records directly
//! - `Transformed` computes a derived series on demand from source
//!   timeseries via an arithmetic expression
//!
//! The shared metadata lives in the common struct; per-variant behavior
//! (size, statistics, iteration, series) is dispatched on the kind tag by
//! the query engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Calibration;

/// Variant tag plus variant-only payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DatasetKind {
    /// Owns raw records directly
    Timeseries,
    /// Derived on demand from source timeseries; the source id list is a
    /// separate relation resolved at read time through the catalog
    Transformed {
        /// Arithmetic expression over the free variable `x`
        expression: String,
    },
}

/// Metadata and semantics for a set of records
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dataset {
    /// Unique identifier
    pub id: i64,
    /// Short description of the content
    pub name: String,
    /// Reference to the originating file, if imported
    #[serde(default)]
    pub filename: Option<String>,
    /// First valid date for records; required before records can be added
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Last valid date for records (or the expected end of the dataset)
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    /// Owning site id (location in space)
    pub site: i64,
    /// Value type id (what is measured)
    pub value_type: i64,
    /// Username of the responsible person
    pub measured_by: String,
    /// Quality tier id
    #[serde(default)]
    pub quality: i64,
    /// Instrument or external provider id the records came from
    #[serde(default)]
    pub source: Option<i64>,
    /// Linear transform applied to raw values at read time
    #[serde(default)]
    pub calibration: Calibration,
    /// Free-text details
    #[serde(default)]
    pub comment: String,
    /// Access level; interpreted by the authorization collaborator only
    #[serde(default = "default_access")]
    pub access: i32,
    /// Timezone descriptor for display purposes
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Variant selector
    pub kind: DatasetKind,
}

fn default_access() -> i32 {
    1
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Dataset {
    /// Create a timeseries dataset with required fields
    pub fn new(
        id: i64,
        name: impl Into<String>,
        site: i64,
        value_type: i64,
        measured_by: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            filename: None,
            start: None,
            end: None,
            site,
            value_type,
            measured_by: measured_by.into(),
            quality: 0,
            source: None,
            calibration: Calibration::identity(),
            comment: String::new(),
            access: default_access(),
            timezone: default_timezone(),
            kind: DatasetKind::Timeseries,
        }
    }

    /// Builder: turn this into a transformed dataset with the given expression
    pub fn transformed(mut self, expression: impl Into<String>) -> Self {
        self.kind = DatasetKind::Transformed {
            expression: expression.into(),
        };
        self
    }

    /// Builder: set the validity interval
    pub fn timespan(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    /// Builder: set the calibration
    pub fn calibration(mut self, offset: f64, slope: f64) -> Self {
        self.calibration = Calibration::new(offset, slope);
        self
    }

    /// Builder: set the instrument source
    pub fn instrument(mut self, source: i64) -> Self {
        self.source = Some(source);
        self
    }

    pub fn is_timeseries(&self) -> bool {
        matches!(self.kind, DatasetKind::Timeseries)
    }

    pub fn is_transformed(&self) -> bool {
        matches!(self.kind, DatasetKind::Transformed { .. })
    }

    /// The transform expression, for transformed datasets
    pub fn expression(&self) -> Option<&str> {
        match &self.kind {
            DatasetKind::Transformed { expression } => Some(expression),
            DatasetKind::Timeseries => None,
        }
    }

    /// `start <= end` must hold once both bounds are set
    pub fn timespan_is_valid(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start <= end,
            _ => true,
        }
    }

    /// Duplicate all metadata under a fresh identity, with no records.
    ///
    /// The copy and the original are independent afterwards.
    pub fn copy(&self, new_id: i64) -> Self {
        Self {
            id: new_id,
            ..self.clone()
        }
    }

    /// Short label like `ds0042: 3 at #12`
    pub fn label(&self) -> String {
        format!("ds{:04}: {} at #{}", self.id, self.value_type, self.site)
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label(), self.name)
    }
}
