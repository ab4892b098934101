//! Dataset lifecycle
//!
//! Creation, duplication, splitting and removal of datasets. Splitting is
//! the one multi-row mutation in the engine; it goes through
//! [`RecordStore::apply_split`] so the store can make it atomic. Removal
//! is destructive with no undo and refuses to orphan transform sources.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{Error, Result};
use crate::model::{Dataset, TimeWindow};
use crate::store::{CatalogStore, EntityKind, IdAllocator, RecordStore};
use crate::transform::{self, Expression};

/// Create, copy, split and remove datasets against one store
pub struct LifecycleManager<'a, S> {
    store: &'a S,
}

impl<'a, S: RecordStore + CatalogStore + IdAllocator> LifecycleManager<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Register a new dataset under a freshly allocated id.
    ///
    /// The id on the argument is ignored. The validity interval, the
    /// value type reference and (for transforms) the expression are
    /// checked before anything is written.
    pub fn create(&self, dataset: Dataset) -> Result<Dataset> {
        if let (Some(start), Some(end)) = (dataset.start, dataset.end) {
            if start > end {
                return Err(Error::InvalidTimespan { start, end });
            }
        }
        self.store
            .get_value_type(dataset.value_type)?
            .ok_or(Error::UnknownValueType(dataset.value_type))?;
        if let Some(expression) = dataset.expression() {
            Expression::parse(expression)?;
        }

        let mut dataset = dataset;
        dataset.id = self.store.new_id(EntityKind::Dataset)?;
        self.store.insert_dataset(&dataset)?;
        info!(dataset = dataset.id, name = %dataset.name, "dataset created");
        Ok(dataset)
    }

    /// Duplicate all metadata under a new id, with no records.
    ///
    /// For transformed datasets the source list is duplicated too; the
    /// copy and the original are independent afterwards.
    pub fn copy(&self, id: i64) -> Result<Dataset> {
        let original = self.load(id)?;
        let copy = original.copy(self.store.new_id(EntityKind::Dataset)?);
        self.store.insert_dataset(&copy)?;
        if copy.is_transformed() {
            let sources = self.store.sources_of(id)?;
            self.store.set_sources(copy.id, &sources)?;
        }
        info!(original = id, copy = copy.id, "dataset copied");
        Ok(copy)
    }

    /// Split a timeseries in two at `t`.
    ///
    /// Needs a valid record at or before `t` and one at or after `t`;
    /// without both the cut would not partition anything and the call
    /// fails with `InvalidSplitPoint`, changing nothing. On success every
    /// record from the "next" record onward moves to a new dataset, the
    /// original ends at the "last" record and both comments gain a
    /// cross-reference. All-or-nothing against the store.
    pub fn split(&self, id: i64, t: DateTime<Utc>) -> Result<(Dataset, Dataset)> {
        let mut original = self.load(id)?;
        if !original.is_timeseries() {
            return Err(Error::NotATimeseries(id));
        }

        let before = self.store.query_records(id, TimeWindow::until(t), false)?;
        let after = self.store.query_records(id, TimeWindow::from(t), false)?;
        let last = before.iter().rev().find(|r| r.value.is_some());
        let next = after.iter().find(|r| r.value.is_some());
        let (Some(last), Some(next)) = (last, next) else {
            return Err(Error::InvalidSplitPoint { dataset: id, time: t });
        };

        let mut copy = original.copy(self.store.new_id(EntityKind::Dataset)?);
        original.end = Some(last.time);
        copy.start = Some(next.time);
        append_note(
            &mut original.comment,
            &format!("Split at {t}, continued in ds{:04}", copy.id),
        );
        append_note(
            &mut copy.comment,
            &format!("Split at {t} from ds{:04}", original.id),
        );

        let moved = self.store.apply_split(&original, &copy, next.time)?;
        info!(
            original = original.id,
            copy = copy.id,
            moved,
            "dataset split"
        );
        Ok((original, copy))
    }

    /// Delete datasets and, for timeseries, all their records.
    ///
    /// Refuses when a transformed dataset outside the removal set still
    /// lists one of the targets as a source. Irreversible.
    pub fn remove(&self, ids: &[i64]) -> Result<()> {
        let mut datasets = Vec::with_capacity(ids.len());
        for &id in ids {
            let dataset = self.load(id)?;
            for dependent in self.store.dependents_of(id)? {
                if !ids.contains(&dependent) {
                    return Err(Error::DanglingSourceReference {
                        dataset: dependent,
                        source_id: id,
                    });
                }
            }
            datasets.push(dataset);
        }

        for dataset in datasets {
            if dataset.is_transformed() {
                self.store.set_sources(dataset.id, &[])?;
            } else {
                self.store.delete_all_records(dataset.id)?;
            }
            self.store.delete_dataset(dataset.id)?;
            info!(dataset = dataset.id, "dataset removed");
        }
        Ok(())
    }

    /// Replace the source list of a transformed dataset and recompute its
    /// validity interval from the new sources.
    pub fn set_sources(&self, id: i64, sources: &[i64]) -> Result<()> {
        let mut dataset = self.load(id)?;
        if !dataset.is_transformed() {
            return Err(Error::Expression(format!(
                "ds{id:04} is not a transformed dataset"
            )));
        }
        if sources.is_empty() {
            return Err(Error::EmptySourceSet(id));
        }
        for &source in sources {
            self.store
                .get_dataset(source)?
                .filter(|ds| ds.is_timeseries())
                .ok_or(Error::DanglingSourceReference {
                    dataset: id,
                    source_id: source,
                })?;
        }
        self.store.set_sources(id, sources)?;
        transform::update_time(self.store, &mut dataset)?;
        Ok(())
    }

    fn load(&self, id: i64) -> Result<Dataset> {
        Ok(self
            .store
            .get_dataset(id)?
            .ok_or(Error::DatasetNotFound(id))?)
    }
}

fn append_note(comment: &mut String, note: &str) {
    if !comment.is_empty() {
        comment.push('\n');
    }
    comment.push_str(note);
}
