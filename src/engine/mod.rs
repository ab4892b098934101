//! Dataset engine
//!
//! The operational surface over the store traits, split by concern:
//!
//! - [`query`]: interpolation, jump detection, statistics, record access
//! - [`gaps`]: coverage gap detection across datasets
//! - [`lifecycle`]: create, copy, split, remove
//! - [`group`]: ad-hoc multi-dataset reads
//!
//! All operations are transaction-oriented: one unit of work against the
//! store per call, no internal parallelism. Callers wanting concurrency
//! run independent operations on independent datasets.

pub mod gaps;
pub mod group;
pub mod lifecycle;
pub mod query;

pub use gaps::find_date_gaps;
pub use group::DatasetGroup;
pub use lifecycle::LifecycleManager;
pub use query::{Jumps, NewRecord, QueryEngine, Statistics};
