//! In-memory store adapter
//!
//! `BTreeMap`-backed implementation of the store traits. Records are keyed
//! by `(time, id)` so time-range scans come back ordered for free. Every
//! mutation happens under one write lock, which gives the per-dataset
//! write isolation and the all-or-nothing split the engine requires.
//!
//! Used by the test suites and as the default backend of the CLI config.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::model::{Dataset, Quality, Record, TimeWindow, ValueType};
use crate::store::{
    CatalogStore, EntityKind, IdAllocator, RawAggregate, RecordStore, StoreError, StoreResult,
};

/// Records of one dataset, ordered by (time, id)
#[derive(Debug, Default)]
struct DatasetRecords {
    by_time: BTreeMap<(i64, i64), Record>,
    ids: BTreeSet<i64>,
}

#[derive(Debug, Default)]
struct Inner {
    datasets: BTreeMap<i64, Dataset>,
    value_types: BTreeMap<i64, ValueType>,
    qualities: BTreeMap<i64, Quality>,
    records: HashMap<i64, DatasetRecords>,
    /// target dataset id -> ordered source dataset ids
    transforms: BTreeMap<i64, Vec<i64>>,
}

/// In-memory implementation of all store traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

fn record_key(record: &Record) -> (i64, i64) {
    (record.time.timestamp_millis(), record.id)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl RecordStore for MemoryStore {
    fn query_records(
        &self,
        dataset: i64,
        window: TimeWindow,
        with_errors: bool,
    ) -> StoreResult<Vec<Record>> {
        let inner = self.read()?;
        let Some(records) = inner.records.get(&dataset) else {
            return Ok(Vec::new());
        };
        Ok(records
            .by_time
            .values()
            .filter(|r| window.contains(r.time) && (with_errors || !r.is_error))
            .cloned()
            .collect())
    }

    fn insert_record(&self, record: Record) -> StoreResult<()> {
        let mut inner = self.write()?;
        let records = inner.records.entry(record.dataset).or_default();
        if !records.ids.insert(record.id) {
            return Err(StoreError::Constraint(format!(
                "record {} already exists in ds{:04}",
                record.id, record.dataset
            )));
        }
        records.by_time.insert(record_key(&record), record);
        Ok(())
    }

    fn delete_records(&self, dataset: i64, ids: &[i64]) -> StoreResult<usize> {
        let mut inner = self.write()?;
        let Some(records) = inner.records.get_mut(&dataset) else {
            return Ok(0);
        };
        let before = records.by_time.len();
        records.by_time.retain(|_, r| !ids.contains(&r.id));
        for id in ids {
            records.ids.remove(id);
        }
        Ok(before - records.by_time.len())
    }

    fn delete_all_records(&self, dataset: i64) -> StoreResult<usize> {
        let mut inner = self.write()?;
        Ok(inner
            .records
            .remove(&dataset)
            .map(|r| r.by_time.len())
            .unwrap_or(0))
    }

    fn max_record_id(&self, dataset: i64) -> StoreResult<Option<i64>> {
        let inner = self.read()?;
        Ok(inner
            .records
            .get(&dataset)
            .and_then(|r| r.ids.iter().next_back().copied()))
    }

    fn record_count(&self, dataset: i64) -> StoreResult<u64> {
        let inner = self.read()?;
        Ok(inner
            .records
            .get(&dataset)
            .map(|r| r.by_time.len() as u64)
            .unwrap_or(0))
    }

    fn time_bounds(&self, dataset: i64) -> StoreResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let inner = self.read()?;
        let Some(records) = inner.records.get(&dataset) else {
            return Ok(None);
        };
        let first = records.by_time.values().next();
        let last = records.by_time.values().next_back();
        Ok(first.zip(last).map(|(a, b)| (a.time, b.time)))
    }

    fn aggregate(&self, dataset: i64) -> StoreResult<Option<RawAggregate>> {
        let inner = self.read()?;
        let values: Vec<f64> = inner
            .records
            .get(&dataset)
            .map(|r| {
                r.by_time
                    .values()
                    .filter(|r| r.is_valid())
                    .filter_map(|r| r.value)
                    .collect()
            })
            .unwrap_or_default();

        let n = values.len();
        if n == 0 {
            return Ok(Some((0.0, 0.0, 0)));
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let stddev = if n < 2 {
            0.0
        } else {
            (values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1) as f64).sqrt()
        };
        Ok(Some((mean, stddev, n as u64)))
    }

    fn apply_split(
        &self,
        original: &Dataset,
        copy: &Dataset,
        cut: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut inner = self.write()?;
        if !inner.datasets.contains_key(&original.id) {
            return Err(StoreError::Constraint(format!(
                "ds{:04} does not exist",
                original.id
            )));
        }
        if inner.datasets.contains_key(&copy.id) {
            return Err(StoreError::Constraint(format!(
                "ds{:04} already exists",
                copy.id
            )));
        }

        inner.datasets.insert(original.id, original.clone());
        inner.datasets.insert(copy.id, copy.clone());

        let cut_key = (cut.timestamp_millis(), i64::MIN);
        let moved: Vec<Record> = inner
            .records
            .get_mut(&original.id)
            .map(|records| {
                let keys: Vec<(i64, i64)> =
                    records.by_time.range(cut_key..).map(|(k, _)| *k).collect();
                keys.iter()
                    .filter_map(|k| records.by_time.remove(k))
                    .map(|r| {
                        records.ids.remove(&r.id);
                        r
                    })
                    .collect()
            })
            .unwrap_or_default();

        let count = moved.len();
        let target = inner.records.entry(copy.id).or_default();
        for mut record in moved {
            record.dataset = copy.id;
            target.ids.insert(record.id);
            target.by_time.insert(record_key(&record), record);
        }
        Ok(count)
    }
}

impl CatalogStore for MemoryStore {
    fn get_dataset(&self, id: i64) -> StoreResult<Option<Dataset>> {
        Ok(self.read()?.datasets.get(&id).cloned())
    }

    fn insert_dataset(&self, dataset: &Dataset) -> StoreResult<()> {
        let mut inner = self.write()?;
        if inner.datasets.contains_key(&dataset.id) {
            return Err(StoreError::Constraint(format!(
                "ds{:04} already exists",
                dataset.id
            )));
        }
        inner.datasets.insert(dataset.id, dataset.clone());
        Ok(())
    }

    fn update_dataset(&self, dataset: &Dataset) -> StoreResult<()> {
        let mut inner = self.write()?;
        if !inner.datasets.contains_key(&dataset.id) {
            return Err(StoreError::Constraint(format!(
                "ds{:04} does not exist",
                dataset.id
            )));
        }
        inner.datasets.insert(dataset.id, dataset.clone());
        Ok(())
    }

    fn delete_dataset(&self, id: i64) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.datasets.remove(&id);
        inner.transforms.remove(&id);
        Ok(())
    }

    fn list_datasets(&self, site: Option<i64>, source: Option<i64>) -> StoreResult<Vec<Dataset>> {
        let inner = self.read()?;
        Ok(inner
            .datasets
            .values()
            .filter(|ds| site.map_or(true, |s| ds.site == s))
            .filter(|ds| source.map_or(true, |s| ds.source == Some(s)))
            .cloned()
            .collect())
    }

    fn get_value_type(&self, id: i64) -> StoreResult<Option<ValueType>> {
        Ok(self.read()?.value_types.get(&id).cloned())
    }

    fn insert_value_type(&self, value_type: &ValueType) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.value_types.insert(value_type.id, value_type.clone());
        Ok(())
    }

    fn get_quality(&self, id: i64) -> StoreResult<Option<Quality>> {
        Ok(self.read()?.qualities.get(&id).cloned())
    }

    fn insert_quality(&self, quality: &Quality) -> StoreResult<()> {
        let mut inner = self.write()?;
        inner.qualities.insert(quality.id, quality.clone());
        Ok(())
    }

    fn sources_of(&self, dataset: i64) -> StoreResult<Vec<i64>> {
        Ok(self
            .read()?
            .transforms
            .get(&dataset)
            .cloned()
            .unwrap_or_default())
    }

    fn set_sources(&self, dataset: i64, sources: &[i64]) -> StoreResult<()> {
        let mut inner = self.write()?;
        if sources.is_empty() {
            inner.transforms.remove(&dataset);
        } else {
            inner.transforms.insert(dataset, sources.to_vec());
        }
        Ok(())
    }

    fn dependents_of(&self, source: i64) -> StoreResult<Vec<i64>> {
        let inner = self.read()?;
        Ok(inner
            .transforms
            .iter()
            .filter(|(_, sources)| sources.contains(&source))
            .map(|(target, _)| *target)
            .collect())
    }
}

impl IdAllocator for MemoryStore {
    fn new_id(&self, kind: EntityKind) -> StoreResult<i64> {
        let inner = self.read()?;
        let max = match kind {
            EntityKind::Dataset => inner.datasets.keys().next_back().copied(),
            EntityKind::ValueType => inner.value_types.keys().next_back().copied(),
            EntityKind::Quality => inner.qualities.keys().next_back().copied(),
        };
        Ok(max.unwrap_or(0) + 1)
    }
}
