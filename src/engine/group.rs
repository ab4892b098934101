//! Ad-hoc dataset groups
//!
//! A `DatasetGroup` is an ephemeral aggregation of dataset ids plus an
//! optional time window, built by a caller to read several datasets as
//! one. Nothing about it is persisted; the ids are resolved against the
//! catalog each time the group is used.

use crate::engine::QueryEngine;
use crate::error::{Error, Result};
use crate::model::{CalibratedRecord, Dataset, Series, TimeWindow};
use crate::store::{CatalogStore, RecordStore};

/// A throwaway collection of datasets read as one
#[derive(Debug, Clone)]
pub struct DatasetGroup {
    ids: Vec<i64>,
    window: TimeWindow,
}

impl DatasetGroup {
    pub fn new(ids: Vec<i64>) -> Self {
        Self {
            ids,
            window: TimeWindow::all(),
        }
    }

    /// Builder: restrict all reads to a time window
    pub fn window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn ids(&self) -> &[i64] {
        &self.ids
    }

    /// Resolve the member datasets, ordered by their start time.
    ///
    /// Every id must exist at resolution time.
    pub fn datasets<S: CatalogStore>(&self, store: &S) -> Result<Vec<Dataset>> {
        let mut datasets = Vec::with_capacity(self.ids.len());
        for &id in &self.ids {
            datasets.push(store.get_dataset(id)?.ok_or(Error::DatasetNotFound(id))?);
        }
        datasets.sort_by_key(|ds| ds.start);
        Ok(datasets)
    }

    /// Combined calibrated series of all members, sorted by time
    pub fn as_series<S: RecordStore + CatalogStore>(
        &self,
        engine: &QueryEngine<'_, S>,
    ) -> Result<Series> {
        let mut combined = Series::new();
        for dataset in self.datasets(engine.store())? {
            combined.extend(engine.as_series(&dataset, self.window)?);
        }
        combined.sort_by_time();
        Ok(combined)
    }

    /// Record stream across all members: datasets in start order, records
    /// in time order within each dataset
    pub fn iter_records<S: RecordStore + CatalogStore>(
        &self,
        engine: &QueryEngine<'_, S>,
        with_errors: bool,
    ) -> Result<Vec<CalibratedRecord>> {
        let mut rows = Vec::new();
        for dataset in self.datasets(engine.store())? {
            rows.extend(engine.iter_records(&dataset, self.window, with_errors)?);
        }
        Ok(rows)
    }
}
