//! Timeseries query engine
//!
//! Point interpolation, jump detection, statistics and record access for
//! both dataset variants, on top of the store traits. Every operation
//! re-queries the store, so iteration is restartable per call and reads
//! always see the current store state.
//!
//! Raw values are calibrated on the way out; callers never see raw values
//! unless they ask for records explicitly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{CalibratedRecord, Dataset, DatasetKind, Record, Series, TimeWindow};
use crate::store::{CatalogStore, Clock, RecordStore, SYSTEM_CLOCK};
use crate::transform;

/// Two records closer than this count as one point during interpolation,
/// avoiding division blow-up when next == last.
const INTERPOLATION_TIE_BREAK_SECS: f64 = 0.1;

/// Simple statistical description of a dataset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub stddev: f64,
    pub count: u64,
}

impl Statistics {
    /// The empty-dataset result; statistics never fail on empty input
    pub fn empty() -> Self {
        Self {
            mean: 0.0,
            stddev: 0.0,
            count: 0,
        }
    }
}

/// Fields for a new record; unset fields get engine defaults
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    /// Record id; defaults to the dataset's highest id + 1
    pub id: Option<i64>,
    /// Raw value; None stores a deliberately missing reading
    pub value: Option<f64>,
    /// Measurement time; defaults to the clock's now
    pub time: Option<DateTime<Utc>>,
    pub sample: Option<String>,
    pub comment: Option<String>,
}

impl NewRecord {
    pub fn value(value: f64) -> Self {
        Self {
            value: Some(value),
            ..Self::default()
        }
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn sample(mut self, sample: impl Into<String>) -> Self {
        self.sample = Some(sample.into());
        self
    }
}

fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later - earlier).num_milliseconds() as f64 / 1000.0
}

/// Query engine over a record store and catalog
pub struct QueryEngine<'a, S> {
    store: &'a S,
    clock: &'a dyn Clock,
}

impl<'a, S: RecordStore + CatalogStore> QueryEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            clock: &SYSTEM_CLOCK,
        }
    }

    /// Engine with an explicit time source, for tests and replays
    pub fn with_clock(store: &'a S, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &'a S {
        self.store
    }

    /// Valid records (non-null, non-error) of a timeseries in a window,
    /// ascending by time
    fn valid_records(&self, dataset: i64, window: TimeWindow) -> Result<Vec<Record>> {
        let mut records = self.store.query_records(dataset, window, false)?;
        records.retain(|r| r.value.is_some());
        Ok(records)
    }

    /// Point interpolation: the calibrated value at `time` plus a
    /// confidence distance in seconds.
    ///
    /// The distance is the smaller of the two one-sided gaps, so a short
    /// local gap never looks falsely confident because the opposite
    /// neighbor is far away. With only one neighbor the result is a
    /// nearest-value fallback and the distance is the full gap.
    pub fn find_value(&self, dataset: &Dataset, time: DateTime<Utc>) -> Result<(f64, f64)> {
        if !dataset.is_timeseries() {
            return Err(Error::NotATimeseries(dataset.id));
        }
        let cal = dataset.calibration;

        let before = self.valid_records(dataset.id, TimeWindow::until(time))?;
        let after = self.valid_records(dataset.id, TimeWindow::from(time))?;
        // Valid records always carry a value; keep only (time, raw) pairs
        let last = before.iter().rev().find_map(|r| r.value.map(|v| (r.time, v)));
        let next = after.iter().find_map(|r| r.value.map(|v| (r.time, v)));

        match (last, next) {
            (None, None) => Err(Error::NoData(dataset.id)),
            (Some((last_time, last_raw)), None) => {
                Ok((cal.apply_raw(last_raw), seconds_between(time, last_time)))
            }
            (None, Some((next_time, next_raw))) => {
                Ok((cal.apply_raw(next_raw), seconds_between(next_time, time)))
            }
            (Some((last_time, last_raw)), Some((next_time, next_raw))) => {
                let dt_last = seconds_between(time, last_time);
                let dt_next = seconds_between(next_time, time);
                let dt = dt_last + dt_next;
                let next_value = cal.apply_raw(next_raw);
                if dt < INTERPOLATION_TIE_BREAK_SECS {
                    return Ok((next_value, 0.0));
                }
                let last_value = cal.apply_raw(last_raw);
                let value =
                    (1.0 - dt_next / dt) * next_value + (1.0 - dt_last / dt) * last_value;
                Ok((value, dt_last.min(dt_next)))
            }
        }
    }

    /// Lazy scan for records whose raw value differs from the previous
    /// valid record's by more than `threshold`.
    ///
    /// Runs on raw values, before calibration. `threshold == 0.0` yields
    /// every valid record after the first, which dumps the whole series
    /// through the same code path. The returned iterator is finite and a
    /// fresh call re-queries the store.
    pub fn find_jumps(
        &self,
        dataset: &Dataset,
        threshold: f64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Jumps> {
        if !dataset.is_timeseries() {
            return Err(Error::NotATimeseries(dataset.id));
        }
        let window = TimeWindow::new(start.or(dataset.start), end.or(dataset.end));
        let records = self.valid_records(dataset.id, window)?;
        Ok(Jumps {
            records: records.into_iter(),
            threshold,
            last: None,
        })
    }

    /// Mean, sample standard deviation and count of calibrated values
    /// over all valid records. Never fails on an empty dataset.
    ///
    /// Uses the store's aggregate pushdown when available; otherwise
    /// materializes the series. Both paths agree within floating-point
    /// tolerance.
    pub fn statistics(&self, dataset: &Dataset) -> Result<Statistics> {
        if dataset.is_transformed() {
            let series = transform::as_series(self, dataset, TimeWindow::all())?;
            return Ok(series_statistics(&series));
        }

        if let Some((mean, stddev, count)) = self.store.aggregate(dataset.id)? {
            if count == 0 {
                return Ok(Statistics::empty());
            }
            let cal = dataset.calibration;
            return Ok(Statistics {
                mean: cal.apply_raw(mean),
                stddev: stddev * cal.slope.abs(),
                count,
            });
        }

        debug!(dataset = dataset.id, "aggregate pushdown unavailable, materializing");
        let series = self.timeseries_series(dataset, TimeWindow::all(), false)?;
        Ok(series_statistics(&series))
    }

    /// Widen `start`/`end` to cover the true record extremes and persist.
    /// Monotonic: the span never shrinks.
    pub fn adjust_timespan(&self, dataset: &mut Dataset) -> Result<()> {
        let Some((lo, hi)) = self.store.time_bounds(dataset.id)? else {
            return Ok(());
        };
        dataset.start = Some(dataset.start.map_or(lo, |s| s.min(lo)));
        dataset.end = Some(dataset.end.map_or(hi, |e| e.max(hi)));
        self.store.update_dataset(dataset)?;
        Ok(())
    }

    /// Calibrated non-error series of either dataset variant, ascending
    /// by time
    pub fn as_series(&self, dataset: &Dataset, window: TimeWindow) -> Result<Series> {
        match &dataset.kind {
            DatasetKind::Timeseries => self.timeseries_series(dataset, window, false),
            DatasetKind::Transformed { .. } => transform::as_series(self, dataset, window),
        }
    }

    /// Calibrated series of a timeseries dataset; null readings are
    /// skipped, error records only included on request
    pub fn timeseries_series(
        &self,
        dataset: &Dataset,
        window: TimeWindow,
        with_errors: bool,
    ) -> Result<Series> {
        let records = self.store.query_records(dataset.id, window, with_errors)?;
        let cal = dataset.calibration;
        Ok(records
            .into_iter()
            .filter_map(|r| cal.apply(r.value).map(|v| (r.time, v)))
            .collect())
    }

    /// Records of either variant in time order, with calibrated (or
    /// derived) values alongside the raw ones
    pub fn iter_records(
        &self,
        dataset: &Dataset,
        window: TimeWindow,
        with_errors: bool,
    ) -> Result<Vec<CalibratedRecord>> {
        match &dataset.kind {
            DatasetKind::Timeseries => {
                let records = self.store.query_records(dataset.id, window, with_errors)?;
                Ok(records
                    .into_iter()
                    .map(|r| CalibratedRecord::from_record(r, dataset.calibration))
                    .collect())
            }
            DatasetKind::Transformed { .. } => {
                transform::iter_records(self, dataset, window, with_errors)
            }
        }
    }

    /// Number of records: own records for a timeseries, all underlying
    /// source records for a transform
    pub fn size(&self, dataset: &Dataset) -> Result<u64> {
        match &dataset.kind {
            DatasetKind::Timeseries => Ok(self.store.record_count(dataset.id)?),
            DatasetKind::Transformed { .. } => transform::size(self.store, dataset),
        }
    }

    /// Insert one record, enforcing the value type range and the
    /// dataset's validity interval. Nothing is clamped or coerced.
    pub fn add_record(&self, dataset: &Dataset, new: NewRecord) -> Result<Record> {
        if !dataset.is_timeseries() {
            return Err(Error::NotATimeseries(dataset.id));
        }
        let time = new.time.unwrap_or_else(|| self.clock.now());

        let (Some(start), Some(end)) = (dataset.start, dataset.end) else {
            return Err(Error::OutOfTimespan {
                time,
                start: dataset.start,
                end: dataset.end,
            });
        };
        if time < start || time > end {
            return Err(Error::OutOfTimespan {
                time,
                start: dataset.start,
                end: dataset.end,
            });
        }

        if let Some(value) = new.value {
            let value_type = self
                .store
                .get_value_type(dataset.value_type)?
                .ok_or(Error::UnknownValueType(dataset.value_type))?;
            if !value_type.in_range(value) {
                return Err(Error::OutOfRange {
                    value,
                    name: value_type.name,
                    unit: value_type.unit,
                    min: value_type.min_value,
                    max: value_type.max_value,
                });
            }
        }

        let id = match new.id {
            Some(id) => id,
            None => self.store.max_record_id(dataset.id)?.unwrap_or(0) + 1,
        };

        let record = Record {
            id,
            dataset: dataset.id,
            time,
            value: new.value,
            sample: new.sample,
            comment: new.comment,
            is_error: false,
        };
        self.store.insert_record(record.clone())?;
        debug!(dataset = dataset.id, record = id, "record inserted");
        Ok(record)
    }
}

fn series_statistics(series: &Series) -> Statistics {
    if series.is_empty() {
        return Statistics::empty();
    }
    Statistics {
        mean: series.mean(),
        stddev: series.sample_stddev(),
        count: series.len() as u64,
    }
}

/// Finite iterator over jump records, produced by
/// [`QueryEngine::find_jumps`]
pub struct Jumps {
    records: std::vec::IntoIter<Record>,
    threshold: f64,
    last: Option<f64>,
}

impl Iterator for Jumps {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        for record in self.records.by_ref() {
            let Some(value) = record.value else { continue };
            let is_jump = match self.last {
                None => false,
                Some(previous) => {
                    self.threshold == 0.0 || (value - previous).abs() > self.threshold
                }
            };
            self.last = Some(value);
            if is_jump {
                return Some(record);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ValueType;
    use crate::store::MemoryStore;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_value_type(&ValueType::new(1, "water level", "m").range(0.0, 100.0))
            .unwrap();
        store
            .insert_dataset(&Dataset::new(1, "level", 7, 1, "phil").timespan(t(0), t(1000)))
            .unwrap();
        store
    }

    fn add(store: &MemoryStore, id: i64, secs: i64, value: Option<f64>) {
        store
            .insert_record(Record::new(id, 1, t(secs), value))
            .unwrap();
    }

    #[test]
    fn test_find_value_interpolates() {
        let store = fixture();
        add(&store, 1, 0, Some(0.0));
        add(&store, 2, 10, Some(10.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        assert_eq!(engine.find_value(&ds, t(5)).unwrap(), (5.0, 5.0));
        // Closer to the right neighbor: value leans right, distance is
        // the smaller gap
        let (value, distance) = engine.find_value(&ds, t(8)).unwrap();
        assert!((value - 8.0).abs() < 1e-12);
        assert!((distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_find_value_on_a_record_is_exact() {
        let store = fixture();
        add(&store, 1, 0, Some(0.0));
        add(&store, 2, 10, Some(10.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        assert_eq!(engine.find_value(&ds, t(0)).unwrap(), (0.0, 0.0));
        assert_eq!(engine.find_value(&ds, t(10)).unwrap(), (10.0, 0.0));
    }

    #[test]
    fn test_find_value_one_sided() {
        let store = fixture();
        add(&store, 1, 0, Some(0.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        assert_eq!(engine.find_value(&ds, t(20)).unwrap(), (0.0, 20.0));
    }

    #[test]
    fn test_find_value_no_data() {
        let store = fixture();
        add(&store, 1, 5, None);
        add(&store, 2, 6, Some(3.0));
        store
            .insert_record(Record::new(3, 1, t(7), Some(4.0)).error(true))
            .unwrap();
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        // Record 2 is the only valid one; records 1 and 3 are filtered
        let (value, _) = engine.find_value(&ds, t(6)).unwrap();
        assert_eq!(value, 3.0);

        store.delete_records(1, &[2]).unwrap();
        assert!(matches!(
            engine.find_value(&ds, t(6)),
            Err(Error::NoData(1))
        ));
    }

    #[test]
    fn test_find_value_applies_calibration() {
        let store = fixture();
        add(&store, 1, 0, Some(1.0));
        add(&store, 2, 10, Some(3.0));
        let mut ds = store.get_dataset(1).unwrap().unwrap();
        ds.calibration = crate::model::Calibration::new(10.0, 2.0);
        let engine = QueryEngine::new(&store);

        let (value, _) = engine.find_value(&ds, t(5)).unwrap();
        assert_eq!(value, 14.0); // midpoint of 12 and 16
    }

    #[test]
    fn test_find_value_is_idempotent() {
        let store = fixture();
        add(&store, 1, 0, Some(2.0));
        add(&store, 2, 10, Some(4.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let first = engine.find_value(&ds, t(3)).unwrap();
        let second = engine.find_value(&ds, t(3)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_jumps_threshold_zero_yields_all_but_first() {
        let store = fixture();
        for i in 0..5 {
            add(&store, i + 1, i * 10, Some(i as f64));
        }
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let jumps: Vec<Record> = engine.find_jumps(&ds, 0.0, None, None).unwrap().collect();
        assert_eq!(jumps.len(), 4);
        assert_eq!(jumps[0].id, 2);
    }

    #[test]
    fn test_find_jumps_threshold() {
        let store = fixture();
        for (i, v) in [1.0, 1.2, 5.0, 5.1, 0.0].iter().enumerate() {
            add(&store, i as i64 + 1, i as i64 * 10, Some(*v));
        }
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let jumps: Vec<i64> = engine
            .find_jumps(&ds, 1.0, None, None)
            .unwrap()
            .map(|r| r.id)
            .collect();
        assert_eq!(jumps, vec![3, 5]);
    }

    #[test]
    fn test_find_jumps_skips_invalid_predecessors() {
        let store = fixture();
        add(&store, 1, 0, Some(1.0));
        add(&store, 2, 10, None);
        add(&store, 3, 20, Some(1.05));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        // The null record neither jumps nor resets the comparison base
        let jumps: Vec<i64> = engine
            .find_jumps(&ds, 0.5, None, None)
            .unwrap()
            .map(|r| r.id)
            .collect();
        assert!(jumps.is_empty());
    }

    #[test]
    fn test_find_jumps_is_restartable() {
        let store = fixture();
        for i in 0..3 {
            add(&store, i + 1, i * 10, Some(i as f64 * 10.0));
        }
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let first: Vec<i64> = engine
            .find_jumps(&ds, 5.0, None, None)
            .unwrap()
            .map(|r| r.id)
            .collect();
        let second: Vec<i64> = engine
            .find_jumps(&ds, 5.0, None, None)
            .unwrap()
            .map(|r| r.id)
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_statistics_empty() {
        let store = fixture();
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        assert_eq!(engine.statistics(&ds).unwrap(), Statistics::empty());
    }

    #[test]
    fn test_statistics_calibrated_pushdown() {
        let store = fixture();
        for (i, v) in [1.0, 2.0, 3.0].iter().enumerate() {
            add(&store, i as i64 + 1, i as i64 * 10, Some(*v));
        }
        let mut ds = store.get_dataset(1).unwrap().unwrap();
        ds.calibration = crate::model::Calibration::new(1.0, 2.0);
        let engine = QueryEngine::new(&store);

        let stats = engine.statistics(&ds).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 5.0).abs() < 1e-12); // 2*2+1
        assert!((stats.stddev - 2.0).abs() < 1e-12); // sample stddev 1.0 * slope
    }

    #[test]
    fn test_statistics_pushdown_and_fallback_agree() {
        let store = fixture();
        for (i, v) in [1.5, 2.5, 3.5, 9.0].iter().enumerate() {
            add(&store, i as i64 + 1, i as i64 * 10, Some(*v));
        }
        let mut ds = store.get_dataset(1).unwrap().unwrap();
        ds.calibration = crate::model::Calibration::new(-0.5, 3.0);
        let engine = QueryEngine::new(&store);

        let pushed = engine.statistics(&ds).unwrap();
        let series = engine
            .timeseries_series(&ds, TimeWindow::all(), false)
            .unwrap();
        assert!((pushed.mean - series.mean()).abs() < 1e-9);
        assert!((pushed.stddev - series.sample_stddev()).abs() < 1e-9);
        assert_eq!(pushed.count as usize, series.len());
    }

    /// Identical content for both backends, including a null and an
    /// error record
    fn seed<S: RecordStore + CatalogStore>(store: &S) -> Dataset {
        store
            .insert_value_type(&ValueType::new(1, "water level", "m").range(0.0, 100.0))
            .unwrap();
        let ds = Dataset::new(1, "level", 7, 1, "phil")
            .timespan(t(0), t(1000))
            .calibration(0.25, 2.0);
        store.insert_dataset(&ds).unwrap();
        for (i, v) in [3.0, 4.5, 9.0, 2.0].iter().enumerate() {
            store
                .insert_record(Record::new(i as i64 + 1, 1, t(i as i64 * 10), Some(*v)))
                .unwrap();
        }
        store.insert_record(Record::new(5, 1, t(45), None)).unwrap();
        store
            .insert_record(Record::new(6, 1, t(50), Some(77.0)).error(true))
            .unwrap();
        ds
    }

    #[test]
    fn test_adapters_agree_under_the_engine() {
        let memory = MemoryStore::new();
        let sqlite = crate::store::SqliteStore::open_in_memory().unwrap();
        let ds = seed(&memory);
        seed(&sqlite);

        let mem = QueryEngine::new(&memory);
        let sql = QueryEngine::new(&sqlite);

        // Memory answers statistics via pushdown, SQLite by
        // materializing; the results must still match
        let a = mem.statistics(&ds).unwrap();
        let b = sql.statistics(&ds).unwrap();
        assert_eq!(a.count, 4);
        assert_eq!(a.count, b.count);
        assert!((a.mean - b.mean).abs() < 1e-9);
        assert!((a.stddev - b.stddev).abs() < 1e-9);

        for secs in [0, 7, 15, 30, 500] {
            let va = mem.find_value(&ds, t(secs)).unwrap();
            let vb = sql.find_value(&ds, t(secs)).unwrap();
            assert_eq!(va, vb, "find_value diverges at t={secs}");
        }

        let sa = mem.as_series(&ds, TimeWindow::all()).unwrap();
        let sb = sql.as_series(&ds, TimeWindow::all()).unwrap();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_adjust_timespan_only_widens() {
        let store = fixture();
        add(&store, 1, 100, Some(1.0));
        add(&store, 2, 500, Some(2.0));
        let mut ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        // Records lie inside [0, 1000]; bounds must not shrink
        engine.adjust_timespan(&mut ds).unwrap();
        assert_eq!(ds.start, Some(t(0)));
        assert_eq!(ds.end, Some(t(1000)));

        // A record outside the span widens it
        add(&store, 3, 2000, Some(3.0));
        engine.adjust_timespan(&mut ds).unwrap();
        assert_eq!(ds.end, Some(t(2000)));
        assert_eq!(store.get_dataset(1).unwrap().unwrap().end, Some(t(2000)));
    }

    #[test]
    fn test_series_skips_nulls_and_errors() {
        let store = fixture();
        add(&store, 1, 0, Some(1.0));
        add(&store, 2, 10, None);
        store
            .insert_record(Record::new(3, 1, t(20), Some(9.0)).error(true))
            .unwrap();
        add(&store, 4, 30, Some(2.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let series = engine.as_series(&ds, TimeWindow::all()).unwrap();
        assert_eq!(series.len(), 2);

        let with_errors = engine
            .timeseries_series(&ds, TimeWindow::all(), true)
            .unwrap();
        assert_eq!(with_errors.len(), 3);
    }

    #[test]
    fn test_iter_records_keeps_raw_and_calibrated() {
        let store = fixture();
        add(&store, 1, 0, Some(2.0));
        let mut ds = store.get_dataset(1).unwrap().unwrap();
        ds.calibration = crate::model::Calibration::new(1.0, 3.0);
        let engine = QueryEngine::new(&store);

        let rows = engine.iter_records(&ds, TimeWindow::all(), false).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].raw, Some(2.0));
        assert_eq!(rows[0].value, Some(7.0));
    }

    #[test]
    fn test_add_record_defaults() {
        let store = fixture();
        add(&store, 1, 0, Some(1.0));
        let ds = store.get_dataset(1).unwrap().unwrap();
        let clock = FixedClock(t(42));
        let engine = QueryEngine::with_clock(&store, &clock);

        let record = engine.add_record(&ds, NewRecord::value(5.0)).unwrap();
        assert_eq!(record.id, 2);
        assert_eq!(record.time, t(42));
        assert_eq!(store.record_count(1).unwrap(), 2);
    }

    #[test]
    fn test_add_record_out_of_range() {
        let store = fixture();
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let err = engine
            .add_record(&ds, NewRecord::value(1000.0).at(t(5)))
            .unwrap_err();
        assert!(matches!(err, Error::OutOfRange { .. }));
        assert!(err.is_caller_error());
        // No side effect
        assert_eq!(store.record_count(1).unwrap(), 0);
    }

    #[test]
    fn test_add_record_out_of_timespan() {
        let store = fixture();
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let err = engine
            .add_record(&ds, NewRecord::value(5.0).at(t(5000)))
            .unwrap_err();
        assert!(matches!(err, Error::OutOfTimespan { .. }));

        // A dataset without bounds cannot take records at all
        let unbounded = Dataset::new(2, "x", 7, 1, "u");
        store.insert_dataset(&unbounded).unwrap();
        let err = engine
            .add_record(&unbounded, NewRecord::value(5.0).at(t(5)))
            .unwrap_err();
        assert!(matches!(err, Error::OutOfTimespan { .. }));
    }

    #[test]
    fn test_add_record_null_value_skips_range_check() {
        let store = fixture();
        let ds = store.get_dataset(1).unwrap().unwrap();
        let engine = QueryEngine::new(&store);

        let record = engine
            .add_record(&ds, NewRecord::default().at(t(5)))
            .unwrap();
        assert_eq!(record.value, None);
    }

    #[test]
    fn test_record_operations_reject_transformed() {
        let store = fixture();
        let ds = Dataset::new(2, "derived", 7, 1, "u")
            .transformed("x")
            .timespan(t(0), t(10));
        store.insert_dataset(&ds).unwrap();
        let engine = QueryEngine::new(&store);

        assert!(matches!(
            engine.find_value(&ds, t(5)),
            Err(Error::NotATimeseries(2))
        ));
        assert!(matches!(
            engine.add_record(&ds, NewRecord::value(1.0).at(t(5))),
            Err(Error::NotATimeseries(2))
        ));
        assert!(matches!(
            engine.find_jumps(&ds, 0.0, None, None),
            Err(Error::NotATimeseries(2))
        ));
    }
}
