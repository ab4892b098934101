//! Terralog data model
//!
//! The entities of the measurement database and their invariants:
//!
//! - **types**: `ValueType`, `Quality`, `Calibration`, `TimeWindow`
//! - **dataset**: `Dataset` with its two variants (timeseries, transformed)
//! - **record**: raw `Record` and the calibrated read-side view
//! - **series**: materialized `(timestamp, value)` series
//!
//! Everything here is plain data; behavior that touches the store lives in
//! [`crate::engine`] and [`crate::transform`].

pub mod dataset;
pub mod record;
pub mod series;
pub mod types;

pub use dataset::{Dataset, DatasetKind};
pub use record::{CalibratedRecord, Record};
pub use series::Series;
pub use types::{Calibration, Quality, TimeWindow, ValueType};
