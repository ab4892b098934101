//! SQLite store adapter
//!
//! Relational implementation of the store traits on rusqlite. The schema
//! mirrors the data model: `dataset`, `record`, `valuetype`, `quality` and
//! the `transforms` relation table for transformed-dataset sources.
//! Timestamps are stored as integer milliseconds since the Unix epoch.
//!
//! The connection runs in WAL mode and lives behind a mutex, which
//! serializes writes; `apply_split` runs inside one SQL transaction.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, Row};

use crate::model::{Calibration, Dataset, DatasetKind, Quality, Record, TimeWindow, ValueType};
use crate::store::{
    CatalogStore, EntityKind, IdAllocator, RawAggregate, RecordStore, StoreError, StoreResult,
};

/// SQLite-backed implementation of all store traits
pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS valuetype (
        id       INTEGER PRIMARY KEY,
        name     TEXT NOT NULL,
        unit     TEXT NOT NULL,
        comment  TEXT,
        minvalue REAL,
        maxvalue REAL
    );
    CREATE TABLE IF NOT EXISTS quality (
        id      INTEGER PRIMARY KEY,
        name    TEXT NOT NULL,
        comment TEXT
    );
    CREATE TABLE IF NOT EXISTS dataset (
        id                 INTEGER PRIMARY KEY,
        name               TEXT NOT NULL,
        filename           TEXT,
        start              INTEGER,
        \"end\"              INTEGER,
        site               INTEGER NOT NULL,
        valuetype          INTEGER NOT NULL REFERENCES valuetype(id),
        measured_by        TEXT NOT NULL,
        quality            INTEGER NOT NULL DEFAULT 0,
        source             INTEGER,
        calibration_offset REAL NOT NULL DEFAULT 0.0,
        calibration_slope  REAL NOT NULL DEFAULT 1.0,
        comment            TEXT NOT NULL DEFAULT '',
        access             INTEGER NOT NULL DEFAULT 1,
        timezone           TEXT NOT NULL DEFAULT 'UTC',
        type               TEXT NOT NULL,
        expression         TEXT
    );
    CREATE TABLE IF NOT EXISTS record (
        id       INTEGER NOT NULL,
        dataset  INTEGER NOT NULL REFERENCES dataset(id),
        time     INTEGER NOT NULL,
        value    REAL,
        sample   TEXT,
        comment  TEXT,
        is_error INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (id, dataset)
    );
    CREATE INDEX IF NOT EXISTS idx_record_dataset_time ON record(dataset, time);
    CREATE TABLE IF NOT EXISTS transforms (
        target   INTEGER NOT NULL REFERENCES dataset(id),
        source   INTEGER NOT NULL REFERENCES dataset(id),
        position INTEGER NOT NULL,
        PRIMARY KEY (target, source)
    );
";

fn db_err(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Constraint(e.to_string())
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

fn from_millis(column: usize, ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, ms))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        dataset: row.get(1)?,
        time: from_millis(2, row.get(2)?)?,
        value: row.get(3)?,
        sample: row.get(4)?,
        comment: row.get(5)?,
        is_error: row.get(6)?,
    })
}

fn dataset_from_row(row: &Row<'_>) -> rusqlite::Result<Dataset> {
    let start: Option<i64> = row.get(3)?;
    let end: Option<i64> = row.get(4)?;
    let kind_tag: String = row.get(15)?;
    let expression: Option<String> = row.get(16)?;
    let kind = if kind_tag == "transformed" {
        DatasetKind::Transformed {
            expression: expression.unwrap_or_default(),
        }
    } else {
        DatasetKind::Timeseries
    };
    Ok(Dataset {
        id: row.get(0)?,
        name: row.get(1)?,
        filename: row.get(2)?,
        start: start.map(|ms| from_millis(3, ms)).transpose()?,
        end: end.map(|ms| from_millis(4, ms)).transpose()?,
        site: row.get(5)?,
        value_type: row.get(6)?,
        measured_by: row.get(7)?,
        quality: row.get(8)?,
        source: row.get(9)?,
        calibration: Calibration::new(row.get(10)?, row.get(11)?),
        comment: row.get(12)?,
        access: row.get(13)?,
        timezone: row.get(14)?,
        kind,
    })
}

const DATASET_COLUMNS: &str = "id, name, filename, start, \"end\", site, valuetype, measured_by, \
     quality, source, calibration_offset, calibration_slope, comment, access, timezone, \
     type, expression";

fn dataset_params(ds: &Dataset) -> [Box<dyn rusqlite::ToSql>; 17] {
    let (kind_tag, expression) = match &ds.kind {
        DatasetKind::Timeseries => ("timeseries", None),
        DatasetKind::Transformed { expression } => ("transformed", Some(expression.clone())),
    };
    [
        Box::new(ds.id),
        Box::new(ds.name.clone()),
        Box::new(ds.filename.clone()),
        Box::new(ds.start.map(millis)),
        Box::new(ds.end.map(millis)),
        Box::new(ds.site),
        Box::new(ds.value_type),
        Box::new(ds.measured_by.clone()),
        Box::new(ds.quality),
        Box::new(ds.source),
        Box::new(ds.calibration.offset),
        Box::new(ds.calibration.slope),
        Box::new(ds.comment.clone()),
        Box::new(ds.access),
        Box::new(ds.timezone.clone()),
        Box::new(kind_tag.to_string()),
        Box::new(expression),
    ]
}

impl SqliteStore {
    /// Create or open a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(db_err)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )
        .map_err(db_err)?;

        conn.execute_batch(SCHEMA).map_err(db_err)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// In-memory SQLite database, used by tests
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl RecordStore for SqliteStore {
    fn query_records(
        &self,
        dataset: i64,
        window: TimeWindow,
        with_errors: bool,
    ) -> StoreResult<Vec<Record>> {
        let conn = self.lock()?;
        let mut sql = String::from(
            "SELECT id, dataset, time, value, sample, comment, is_error
             FROM record WHERE dataset = ?1",
        );
        let mut bound: Vec<i64> = vec![dataset];
        if let Some(start) = window.start {
            bound.push(millis(start));
            sql.push_str(&format!(" AND time >= ?{}", bound.len()));
        }
        if let Some(end) = window.end {
            bound.push(millis(end));
            sql.push_str(&format!(" AND time <= ?{}", bound.len()));
        }
        if !with_errors {
            sql.push_str(" AND is_error = 0");
        }
        sql.push_str(" ORDER BY time, id");

        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound), record_from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn insert_record(&self, record: Record) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO record (id, dataset, time, value, sample, comment, is_error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.dataset,
                millis(record.time),
                record.value,
                record.sample,
                record.comment,
                record.is_error,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn delete_records(&self, dataset: i64, ids: &[i64]) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        let mut deleted = 0;
        {
            let mut stmt = tx
                .prepare_cached("DELETE FROM record WHERE dataset = ?1 AND id = ?2")
                .map_err(db_err)?;
            for id in ids {
                deleted += stmt.execute(params![dataset, id]).map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        Ok(deleted)
    }

    fn delete_all_records(&self, dataset: i64) -> StoreResult<usize> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM record WHERE dataset = ?1", params![dataset])
            .map_err(db_err)
    }

    fn max_record_id(&self, dataset: i64) -> StoreResult<Option<i64>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT MAX(id) FROM record WHERE dataset = ?1",
            params![dataset],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    fn record_count(&self, dataset: i64) -> StoreResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM record WHERE dataset = ?1",
                params![dataset],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count as u64)
    }

    fn time_bounds(&self, dataset: i64) -> StoreResult<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let conn = self.lock()?;
        let bounds: (Option<i64>, Option<i64>) = conn
            .query_row(
                "SELECT MIN(time), MAX(time) FROM record WHERE dataset = ?1",
                params![dataset],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(db_err)?;
        match bounds {
            (Some(lo), Some(hi)) => Ok(Some((
                from_millis(0, lo).map_err(db_err)?,
                from_millis(1, hi).map_err(db_err)?,
            ))),
            _ => Ok(None),
        }
    }

    // SQLite has no stddev aggregate, so pushdown is unavailable here and
    // callers take the materializing fallback path.
    fn aggregate(&self, _dataset: i64) -> StoreResult<Option<RawAggregate>> {
        Ok(None)
    }

    fn apply_split(
        &self,
        original: &Dataset,
        copy: &Dataset,
        cut: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;

        update_dataset_tx(&tx, original)?;
        insert_dataset_tx(&tx, copy)?;
        let moved = tx
            .execute(
                "UPDATE record SET dataset = ?1 WHERE dataset = ?2 AND time >= ?3",
                params![copy.id, original.id, millis(cut)],
            )
            .map_err(db_err)?;

        tx.commit().map_err(db_err)?;
        Ok(moved)
    }
}

fn insert_dataset_tx(conn: &Connection, ds: &Dataset) -> StoreResult<()> {
    let sql = format!(
        "INSERT INTO dataset ({DATASET_COLUMNS}) VALUES \
         (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
    );
    let bound = dataset_params(ds);
    conn.execute(&sql, rusqlite::params_from_iter(bound.iter()))
        .map_err(db_err)?;
    Ok(())
}

fn update_dataset_tx(conn: &Connection, ds: &Dataset) -> StoreResult<()> {
    let sql = "UPDATE dataset SET name = ?2, filename = ?3, start = ?4, \"end\" = ?5, site = ?6, \
         valuetype = ?7, measured_by = ?8, quality = ?9, source = ?10, \
         calibration_offset = ?11, calibration_slope = ?12, comment = ?13, access = ?14, \
         timezone = ?15, type = ?16, expression = ?17 WHERE id = ?1";
    let bound = dataset_params(ds);
    let changed = conn
        .execute(sql, rusqlite::params_from_iter(bound.iter()))
        .map_err(db_err)?;
    if changed == 0 {
        return Err(StoreError::Constraint(format!(
            "ds{:04} does not exist",
            ds.id
        )));
    }
    Ok(())
}

impl CatalogStore for SqliteStore {
    fn get_dataset(&self, id: i64) -> StoreResult<Option<Dataset>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {DATASET_COLUMNS} FROM dataset WHERE id = ?1");
        match conn.query_row(&sql, params![id], dataset_from_row) {
            Ok(ds) => Ok(Some(ds)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn insert_dataset(&self, dataset: &Dataset) -> StoreResult<()> {
        let conn = self.lock()?;
        insert_dataset_tx(&conn, dataset)
    }

    fn update_dataset(&self, dataset: &Dataset) -> StoreResult<()> {
        let conn = self.lock()?;
        update_dataset_tx(&conn, dataset)
    }

    fn delete_dataset(&self, id: i64) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM transforms WHERE target = ?1", params![id])
            .map_err(db_err)?;
        tx.execute("DELETE FROM dataset WHERE id = ?1", params![id])
            .map_err(db_err)?;
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn list_datasets(&self, site: Option<i64>, source: Option<i64>) -> StoreResult<Vec<Dataset>> {
        let conn = self.lock()?;
        let mut sql = format!("SELECT {DATASET_COLUMNS} FROM dataset WHERE 1=1");
        let mut bound: Vec<i64> = Vec::new();
        if let Some(site) = site {
            bound.push(site);
            sql.push_str(&format!(" AND site = ?{}", bound.len()));
        }
        if let Some(source) = source {
            bound.push(source);
            sql.push_str(&format!(" AND source = ?{}", bound.len()));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = conn.prepare_cached(&sql).map_err(db_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound), dataset_from_row)
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn get_value_type(&self, id: i64) -> StoreResult<Option<ValueType>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT id, name, unit, comment, minvalue, maxvalue FROM valuetype WHERE id = ?1",
            params![id],
            |row| {
                Ok(ValueType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    unit: row.get(2)?,
                    comment: row.get(3)?,
                    min_value: row.get(4)?,
                    max_value: row.get(5)?,
                })
            },
        );
        match result {
            Ok(vt) => Ok(Some(vt)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn insert_value_type(&self, value_type: &ValueType) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO valuetype (id, name, unit, comment, minvalue, maxvalue)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                value_type.id,
                value_type.name,
                value_type.unit,
                value_type.comment,
                value_type.min_value,
                value_type.max_value,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn get_quality(&self, id: i64) -> StoreResult<Option<Quality>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT id, name, comment FROM quality WHERE id = ?1",
            params![id],
            |row| {
                Ok(Quality {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    comment: row.get(2)?,
                })
            },
        );
        match result {
            Ok(q) => Ok(Some(q)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(db_err(e)),
        }
    }

    fn insert_quality(&self, quality: &Quality) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO quality (id, name, comment) VALUES (?1, ?2, ?3)",
            params![quality.id, quality.name, quality.comment],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn sources_of(&self, dataset: i64) -> StoreResult<Vec<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached(
                "SELECT source FROM transforms WHERE target = ?1 ORDER BY position",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![dataset], |row| row.get(0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }

    fn set_sources(&self, dataset: i64, sources: &[i64]) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(db_err)?;
        tx.execute("DELETE FROM transforms WHERE target = ?1", params![dataset])
            .map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare_cached(
                    "INSERT INTO transforms (target, source, position) VALUES (?1, ?2, ?3)",
                )
                .map_err(db_err)?;
            for (position, source) in sources.iter().enumerate() {
                stmt.execute(params![dataset, source, position as i64])
                    .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        Ok(())
    }

    fn dependents_of(&self, source: i64) -> StoreResult<Vec<i64>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare_cached("SELECT DISTINCT target FROM transforms WHERE source = ?1 ORDER BY target")
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![source], |row| row.get(0))
            .map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }
}

impl IdAllocator for SqliteStore {
    fn new_id(&self, kind: EntityKind) -> StoreResult<i64> {
        let conn = self.lock()?;
        let table = match kind {
            EntityKind::Dataset => "dataset",
            EntityKind::ValueType => "valuetype",
            EntityKind::Quality => "quality",
        };
        let next: i64 = conn
            .query_row(
                &format!("SELECT COALESCE(MAX(id), 0) + 1 FROM {table}"),
                [],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn store_with_dataset() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_value_type(&ValueType::new(1, "water level", "m"))
            .unwrap();
        let ds = Dataset::new(1, "level at weir", 7, 1, "phil")
            .timespan(t(0), t(1000))
            .calibration(0.5, 2.0);
        store.insert_dataset(&ds).unwrap();
        store
    }

    #[test]
    fn test_dataset_roundtrip() {
        let store = store_with_dataset();
        let ds = store.get_dataset(1).unwrap().unwrap();

        assert_eq!(ds.name, "level at weir");
        assert_eq!(ds.site, 7);
        assert_eq!(ds.calibration, Calibration::new(0.5, 2.0));
        assert_eq!(ds.start, Some(t(0)));
        assert!(ds.is_timeseries());

        assert!(store.get_dataset(2).unwrap().is_none());
    }

    #[test]
    fn test_transformed_dataset_roundtrip() {
        let store = store_with_dataset();
        let ds = Dataset::new(2, "doubled", 7, 1, "phil").transformed("x * 2");
        store.insert_dataset(&ds).unwrap();

        let loaded = store.get_dataset(2).unwrap().unwrap();
        assert!(loaded.is_transformed());
        assert_eq!(loaded.expression(), Some("x * 2"));
    }

    #[test]
    fn test_record_roundtrip_and_order() {
        let store = store_with_dataset();
        store
            .insert_record(Record::new(1, 1, t(20), Some(2.0)))
            .unwrap();
        store
            .insert_record(Record::new(2, 1, t(10), None).comment("gauge frozen"))
            .unwrap();
        store
            .insert_record(Record::new(3, 1, t(30), Some(3.0)).error(true))
            .unwrap();

        let all = store.query_records(1, TimeWindow::all(), true).unwrap();
        let times: Vec<i64> = all.iter().map(|r| r.time.timestamp()).collect();
        assert_eq!(times, vec![10, 20, 30]);
        assert_eq!(all[0].comment.as_deref(), Some("gauge frozen"));

        let no_errors = store.query_records(1, TimeWindow::all(), false).unwrap();
        assert_eq!(no_errors.len(), 2);
    }

    #[test]
    fn test_duplicate_record_id_is_constraint() {
        let store = store_with_dataset();
        store
            .insert_record(Record::new(1, 1, t(0), Some(1.0)))
            .unwrap();
        let err = store
            .insert_record(Record::new(1, 1, t(5), Some(2.0)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[test]
    fn test_aggregate_pushdown_unavailable() {
        let store = store_with_dataset();
        assert!(store.aggregate(1).unwrap().is_none());
    }

    #[test]
    fn test_apply_split_transaction() {
        let store = store_with_dataset();
        for i in 0..4 {
            store
                .insert_record(Record::new(i + 1, 1, t(i * 100), Some(i as f64)))
                .unwrap();
        }

        let mut original = store.get_dataset(1).unwrap().unwrap();
        original.end = Some(t(100));
        let mut copy = original.copy(2);
        copy.start = Some(t(200));

        let moved = store.apply_split(&original, &copy, t(200)).unwrap();
        assert_eq!(moved, 2);

        assert_eq!(store.record_count(1).unwrap(), 2);
        assert_eq!(store.record_count(2).unwrap(), 2);
        assert_eq!(store.get_dataset(1).unwrap().unwrap().end, Some(t(100)));
        assert_eq!(store.get_dataset(2).unwrap().unwrap().start, Some(t(200)));
    }

    #[test]
    fn test_sources_relation_roundtrip() {
        let store = store_with_dataset();
        let a = Dataset::new(2, "a", 7, 1, "u");
        let b = Dataset::new(3, "b", 7, 1, "u");
        let target = Dataset::new(4, "t", 7, 1, "u").transformed("x");
        store.insert_dataset(&a).unwrap();
        store.insert_dataset(&b).unwrap();
        store.insert_dataset(&target).unwrap();

        store.set_sources(4, &[3, 2]).unwrap();
        assert_eq!(store.sources_of(4).unwrap(), vec![3, 2]);
        assert_eq!(store.dependents_of(2).unwrap(), vec![4]);

        store.set_sources(4, &[2]).unwrap();
        assert_eq!(store.sources_of(4).unwrap(), vec![2]);
        assert_eq!(store.dependents_of(3).unwrap(), Vec::<i64>::new());
    }

    #[test]
    fn test_id_allocation() {
        let store = store_with_dataset();
        assert_eq!(store.new_id(EntityKind::Dataset).unwrap(), 2);
        assert_eq!(store.new_id(EntityKind::ValueType).unwrap(), 2);
        assert_eq!(store.new_id(EntityKind::Quality).unwrap(), 1);
    }

    #[test]
    fn test_persistence_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terralog.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert_value_type(&ValueType::new(1, "discharge", "m3/s"))
                .unwrap();
            store
                .insert_dataset(&Dataset::new(1, "q", 1, 1, "u"))
                .unwrap();
            store
                .insert_record(Record::new(1, 1, t(0), Some(0.4)))
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get_dataset(1).unwrap().is_some());
        assert_eq!(store.record_count(1).unwrap(), 1);
    }
}
