//! Record store interface and adapters
//!
//! The engine never talks to a database directly; it goes through the
//! traits in this module:
//!
//! - [`RecordStore`]: ordered access to measurement records per dataset
//! - [`CatalogStore`]: dataset metadata, reference data, transform sources
//! - [`IdAllocator`]: unique id allocation per entity kind
//! - [`Clock`]: default insertion time
//!
//! Two adapters ship with the crate:
//!
//! - **memory**: `BTreeMap`-backed, used by tests and the default config
//! - **sqlite**: rusqlite-backed relational store
//!
//! Every operation is one unit of work. Record insertion serializes per
//! dataset inside the adapter; [`RecordStore::apply_split`] is the one
//! multi-row mutation and must be all-or-nothing.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{Dataset, Quality, Record, TimeWindow, ValueType};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Failures of a store adapter, opaque to the engine
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend could not be reached or a transaction failed.
    /// Retryable at the caller's discretion; the engine never retries.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A uniqueness or referential constraint was violated
    #[error("constraint violation: {0}")]
    Constraint(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Raw aggregate triple pushed down to the backend: (mean, sample stddev,
/// count) over valid (non-null, non-error) record values, uncalibrated.
pub type RawAggregate = (f64, f64, u64);

/// Ordered access to measurement records per dataset
pub trait RecordStore {
    /// Records of one dataset inside a window, ascending by time.
    /// `with_errors` includes records flagged as erroneous.
    fn query_records(
        &self,
        dataset: i64,
        window: TimeWindow,
        with_errors: bool,
    ) -> StoreResult<Vec<Record>>;

    /// Insert one record. Fails with a constraint violation when the
    /// record id already exists in the dataset.
    fn insert_record(&self, record: Record) -> StoreResult<()>;

    /// Delete records by id; returns the number actually deleted
    fn delete_records(&self, dataset: i64, ids: &[i64]) -> StoreResult<usize>;

    /// Delete every record of a dataset; returns the count
    fn delete_all_records(&self, dataset: i64) -> StoreResult<usize>;

    /// Highest record id in a dataset, None when empty
    fn max_record_id(&self, dataset: i64) -> StoreResult<Option<i64>>;

    /// Number of records in a dataset, errors and nulls included
    fn record_count(&self, dataset: i64) -> StoreResult<u64>;

    /// Earliest and latest record time, errors and nulls included
    fn time_bounds(&self, dataset: i64) -> StoreResult<Option<(DateTime<Utc>, DateTime<Utc>)>>;

    /// Aggregate pushdown over valid record values. `Ok(None)` means the
    /// backend cannot compute the triple and the caller must fall back to
    /// materializing the series.
    fn aggregate(&self, dataset: i64) -> StoreResult<Option<RawAggregate>>;

    /// Atomically persist a dataset split: update the original's metadata
    /// row, insert the copy's row, and reassign every record with
    /// `time >= cut` from the original to the copy. Returns the number of
    /// reassigned records. Either all three steps happen or none.
    fn apply_split(
        &self,
        original: &Dataset,
        copy: &Dataset,
        cut: DateTime<Utc>,
    ) -> StoreResult<usize>;
}

/// Dataset metadata, reference data and the transform source relation
pub trait CatalogStore {
    fn get_dataset(&self, id: i64) -> StoreResult<Option<Dataset>>;
    fn insert_dataset(&self, dataset: &Dataset) -> StoreResult<()>;
    fn update_dataset(&self, dataset: &Dataset) -> StoreResult<()>;
    fn delete_dataset(&self, id: i64) -> StoreResult<()>;

    /// Datasets filtered by site and/or instrument source, ascending by id
    fn list_datasets(&self, site: Option<i64>, source: Option<i64>) -> StoreResult<Vec<Dataset>>;

    fn get_value_type(&self, id: i64) -> StoreResult<Option<ValueType>>;
    fn insert_value_type(&self, value_type: &ValueType) -> StoreResult<()>;

    fn get_quality(&self, id: i64) -> StoreResult<Option<Quality>>;
    fn insert_quality(&self, quality: &Quality) -> StoreResult<()>;

    /// Ordered source ids of a transformed dataset
    fn sources_of(&self, dataset: i64) -> StoreResult<Vec<i64>>;

    /// Replace the source list of a transformed dataset
    fn set_sources(&self, dataset: i64, sources: &[i64]) -> StoreResult<()>;

    /// Transformed datasets that list the given dataset as a source
    fn dependents_of(&self, source: i64) -> StoreResult<Vec<i64>>;
}

/// Entity kinds with independent id sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Dataset,
    ValueType,
    Quality,
}

/// Unique id allocation, one sequence per entity kind
pub trait IdAllocator {
    fn new_id(&self, kind: EntityKind) -> StoreResult<i64>;
}

/// Time source for default insertion timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared system clock instance for engines constructed without an
/// explicit clock
pub(crate) static SYSTEM_CLOCK: SystemClock = SystemClock;
