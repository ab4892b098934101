//! # Terralog
//!
//! Environmental measurement time-series engine: datasets of raw
//! observations tied to sites, instruments and value types, read through
//! a linear calibration.
//!
//! ## Features
//!
//! - **Calibrated reads**: raw values stay raw in the store; every read
//!   path applies the dataset's calibration lazily
//! - **Interpolation**: point-in-time value lookup with an honest
//!   confidence distance
//! - **Gap and jump detection**: coverage gaps across datasets, value
//!   jumps within one
//! - **Derived series**: transformed datasets evaluate a sandboxed
//!   arithmetic expression over source timeseries on demand
//! - **Safe splitting**: datasets split atomically with no record lost
//!   or duplicated
//!
//! ## Modules
//!
//! - [`model`]: datasets, records, series, calibration, reference data
//! - [`store`]: the store traits plus memory and SQLite adapters
//! - [`engine`]: queries, gap detection, lifecycle, dataset groups
//! - [`transform`]: the derived-series expression language
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{DateTime, Utc};
//! use terralog::engine::{NewRecord, QueryEngine};
//! use terralog::model::{Dataset, ValueType};
//! use terralog::store::{CatalogStore, MemoryStore};
//!
//! fn main() -> Result<(), terralog::Error> {
//!     let store = MemoryStore::new();
//!     store.insert_value_type(&ValueType::new(1, "water level", "m"))?;
//!
//!     let start = DateTime::from_timestamp(0, 0).unwrap();
//!     let end = DateTime::from_timestamp(86_400, 0).unwrap();
//!     let dataset = Dataset::new(1, "level at weir", 7, 1, "phil")
//!         .timespan(start, end)
//!         .calibration(0.0, 0.01);
//!     store.insert_dataset(&dataset)?;
//!
//!     let engine = QueryEngine::new(&store);
//!     engine.add_record(&dataset, NewRecord::value(120.0).at(start))?;
//!     engine.add_record(&dataset, NewRecord::value(140.0).at(end))?;
//!
//!     // Calibrated interpolation halfway through the day
//!     let midpoint = DateTime::from_timestamp(43_200, 0).unwrap();
//!     let (value, _distance) = engine.find_value(&dataset, midpoint)?;
//!     assert!((value - 1.3).abs() < 1e-9);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;
pub mod transform;

// Re-export top-level types for convenience
pub use error::{Error, Result};

pub use model::{
    CalibratedRecord, Calibration, Dataset, DatasetKind, Quality, Record, Series, TimeWindow,
    ValueType,
};

pub use store::{
    CatalogStore, Clock, EntityKind, IdAllocator, MemoryStore, RecordStore, SqliteStore,
    StoreError, StoreResult, SystemClock,
};

pub use engine::{
    find_date_gaps, DatasetGroup, Jumps, LifecycleManager, NewRecord, QueryEngine, Statistics,
};

pub use transform::Expression;

pub use config::{Config, ConfigError, LoggingConfig, StoreBackend, StoreConfig};
