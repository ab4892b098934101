//! Transformation engine
//!
//! A transformed dataset evaluates one arithmetic expression over the
//! calibrated series of its source timeseries. The expression has a
//! single free variable `x`; the grammar is a sandboxed arithmetic
//! subset ([`ast`], [`parser`]), never a general-purpose interpreter.
//!
//! Source references are a relation resolved through the catalog at read
//! time, not embedded pointers. A missing or non-timeseries source
//! surfaces as `DanglingSourceReference` instead of a crash.

pub mod ast;
pub mod parser;

use crate::engine::QueryEngine;
use crate::error::{Error, Result};
use crate::model::{CalibratedRecord, Dataset, Series, TimeWindow};
use crate::store::{CatalogStore, RecordStore};

pub use ast::{BinOp, Expr, Func};

/// A parsed, validated transform expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    text: String,
    ast: Expr,
}

impl Expression {
    /// Upper bound on expression length in bytes
    pub const MAX_LEN: usize = 300;

    /// Parse and validate an expression string
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() > Self::MAX_LEN {
            return Err(Error::Expression(format!(
                "expression longer than {} bytes",
                Self::MAX_LEN
            )));
        }
        let ast = parser::parse(text).map_err(Error::Expression)?;
        Ok(Self {
            text: text.to_string(),
            ast,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Scalar application to one value
    pub fn apply(&self, x: f64) -> f64 {
        self.ast.eval(x)
    }

    /// Batched application to a whole series, keeping timestamps.
    ///
    /// Every expression in this language is elementwise, so this always
    /// agrees with applying [`Expression::apply`] per value.
    pub fn apply_series(&self, series: &Series) -> Series {
        series.map_values(|v| self.ast.eval(v))
    }
}

fn expression_of(dataset: &Dataset) -> Result<Expression> {
    let text = dataset.expression().ok_or_else(|| {
        Error::Expression(format!("ds{:04} has no transform expression", dataset.id))
    })?;
    Expression::parse(text)
}

/// Resolve the ordered source list of a transformed dataset.
///
/// Sources are returned ordered by their own start time. A missing id or
/// a reference to anything but a timeseries fails with
/// `DanglingSourceReference`.
pub fn sources<S: CatalogStore>(store: &S, dataset: &Dataset) -> Result<Vec<Dataset>> {
    let ids = store.sources_of(dataset.id)?;
    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        let source = store
            .get_dataset(id)?
            .filter(|ds| ds.is_timeseries())
            .ok_or(Error::DanglingSourceReference {
                dataset: dataset.id,
                source_id: id,
            })?;
        resolved.push(source);
    }
    resolved.sort_by_key(|ds| ds.start);
    Ok(resolved)
}

/// Derived series: evaluate the expression once per source, concatenate
/// in source order, then sort by timestamp.
///
/// Overlapping timestamps across sources are kept as-is, not merged;
/// callers keep source ranges disjoint.
pub fn as_series<S: RecordStore + CatalogStore>(
    engine: &QueryEngine<'_, S>,
    dataset: &Dataset,
    window: TimeWindow,
) -> Result<Series> {
    let expression = expression_of(dataset)?;
    let mut data = Series::new();
    for source in sources(engine.store(), dataset)? {
        let series = engine.timeseries_series(&source, window, false)?;
        data.extend(expression.apply_series(&series));
    }
    data.sort_by_time();
    Ok(data)
}

/// Count of all underlying source records.
///
/// Rows the expression evaluator would drop are not accounted for.
pub fn size<S: RecordStore + CatalogStore>(store: &S, dataset: &Dataset) -> Result<u64> {
    let mut total = 0;
    for source in sources(store, dataset)? {
        total += store.record_count(source.id)?;
    }
    Ok(total)
}

/// Record-wise evaluation: the expression is applied to each calibrated
/// source value individually. Record ids are renumbered sequentially in
/// time order; missing readings stay missing without evaluation.
pub fn iter_records<S: RecordStore + CatalogStore>(
    engine: &QueryEngine<'_, S>,
    dataset: &Dataset,
    window: TimeWindow,
    with_errors: bool,
) -> Result<Vec<CalibratedRecord>> {
    let expression = expression_of(dataset)?;
    let mut rows: Vec<CalibratedRecord> = Vec::new();
    for source in sources(engine.store(), dataset)? {
        for record in engine
            .store()
            .query_records(source.id, window, with_errors)?
        {
            let calibrated = source.calibration.apply(record.value);
            rows.push(CalibratedRecord {
                id: 0,
                dataset: dataset.id,
                time: record.time,
                value: calibrated.map(|v| expression.apply(v)),
                raw: calibrated,
                sample: record.sample,
                comment: record.comment,
                is_error: record.is_error,
            });
        }
    }
    rows.sort_by_key(|r| r.time);
    for (i, row) in rows.iter_mut().enumerate() {
        row.id = i as i64 + 1;
    }
    Ok(rows)
}

/// Recompute `start`/`end` as min/max across all sources and persist.
///
/// Fails with `EmptySourceSet` when the dataset has no sources.
pub fn update_time<S: RecordStore + CatalogStore>(
    store: &S,
    dataset: &mut Dataset,
) -> Result<()> {
    let resolved = sources(store, dataset)?;
    if resolved.is_empty() {
        return Err(Error::EmptySourceSet(dataset.id));
    }
    if let Some(start) = resolved.iter().filter_map(|ds| ds.start).min() {
        dataset.start = Some(start);
    }
    if let Some(end) = resolved.iter().filter_map(|ds| ds.end).max() {
        dataset.end = Some(end);
    }
    store.update_dataset(dataset)?;
    Ok(())
}

/// Candidate timeseries a transform may add as a source: same site, not
/// already chosen, and (once at least one source is chosen) the same
/// value type as the first source.
pub fn suitable_sources<S: CatalogStore>(store: &S, dataset: &Dataset) -> Result<Vec<Dataset>> {
    let chosen = store.sources_of(dataset.id)?;
    let required_value_type = chosen
        .first()
        .map(|id| store.get_dataset(*id))
        .transpose()?
        .flatten()
        .map(|ds| ds.value_type);

    let candidates = store
        .list_datasets(Some(dataset.site), None)?
        .into_iter()
        .filter(|ds| ds.is_timeseries())
        .filter(|ds| ds.id != dataset.id && !chosen.contains(&ds.id))
        .filter(|ds| required_value_type.map_or(true, |vt| ds.value_type == vt))
        .collect();
    Ok(candidates)
}
