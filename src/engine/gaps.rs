//! Coverage gap detection
//!
//! Finds time intervals at a site/instrument not covered by any dataset
//! of one value type. Works on dataset metadata only; record-level holes
//! inside a dataset are a different question, answered by
//! [`find_jumps`](crate::engine::QueryEngine::find_jumps) and friends.

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::store::CatalogStore;

/// Uncovered intervals at a site/instrument within `[start, end]`.
///
/// Candidates are the datasets at the site and instrument with both
/// bounds set, narrowed to those sharing the value type of the first
/// candidate in start order. A leading gap before the first dataset and a
/// trailing gap after the last appear only when explicit bounds extend
/// past the coverage; internal gaps must last at least one day.
///
/// Returns `None` when no candidate exists and no bounds were given, and
/// the single full bounding interval when bounds were given but no
/// dataset matches.
pub fn find_date_gaps<S: CatalogStore>(
    store: &S,
    site: i64,
    instrument: i64,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<Option<Vec<(DateTime<Utc>, DateTime<Utc>)>>> {
    let mut candidates: Vec<_> = store
        .list_datasets(Some(site), Some(instrument))?
        .into_iter()
        .filter(|ds| ds.start.is_some() && ds.end.is_some())
        .filter(|ds| start.map_or(true, |s| ds.end.unwrap() > s))
        .filter(|ds| end.map_or(true, |e| ds.start.unwrap() < e))
        .collect();
    candidates.sort_by_key(|ds| ds.start);

    let Some(first) = candidates.first() else {
        return Ok(match (start, end) {
            (Some(start), Some(end)) => Some(vec![(start, end)]),
            _ => None,
        });
    };

    let value_type = first.value_type;
    candidates.retain(|ds| ds.value_type == value_type);

    let lower = start.unwrap_or_else(|| candidates[0].start.unwrap());
    let upper = end.unwrap_or_else(|| {
        candidates
            .iter()
            .map(|ds| ds.end.unwrap())
            .max()
            .unwrap()
    });

    let mut gaps = Vec::new();
    if candidates[0].start.unwrap() > lower {
        gaps.push((lower, candidates[0].start.unwrap()));
    }

    // Pauses shorter than a day between consecutive datasets count as
    // contiguous coverage
    let min_internal_gap = Duration::days(1);
    let mut covered_until = candidates[0].end.unwrap();
    for dataset in &candidates[1..] {
        let ds_start = dataset.start.unwrap();
        if ds_start - covered_until >= min_internal_gap {
            gaps.push((covered_until, ds_start));
        }
        covered_until = covered_until.max(dataset.end.unwrap());
    }

    if upper > covered_until {
        gaps.push((covered_until, upper));
    }

    Ok(Some(gaps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dataset;
    use crate::store::{CatalogStore, MemoryStore};
    use chrono::NaiveDate;

    fn day(month: u32, day: u32) -> DateTime<Utc> {
        let year = if month == 12 { 2025 } else { 2026 };
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            .and_utc()
    }

    fn dataset(id: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> Dataset {
        Dataset::new(id, format!("segment {id}"), 7, 1, "phil")
            .instrument(3)
            .timespan(start, end)
    }

    fn fixture() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_dataset(&dataset(1, day(1, 1), day(1, 5)))
            .unwrap();
        store
            .insert_dataset(&dataset(2, day(1, 8), day(1, 10)))
            .unwrap();
        store
    }

    #[test]
    fn test_internal_gap_without_bounds() {
        let store = fixture();
        let gaps = find_date_gaps(&store, 7, 3, None, None).unwrap().unwrap();
        assert_eq!(gaps, vec![(day(1, 5), day(1, 8))]);
    }

    #[test]
    fn test_bounds_add_leading_and_trailing_gaps() {
        let store = fixture();
        let gaps = find_date_gaps(&store, 7, 3, Some(day(12, 25)), Some(day(1, 15)))
            .unwrap()
            .unwrap();
        assert_eq!(
            gaps,
            vec![
                (day(12, 25), day(1, 1)),
                (day(1, 5), day(1, 8)),
                (day(1, 10), day(1, 15)),
            ]
        );
    }

    #[test]
    fn test_no_candidates() {
        let store = MemoryStore::new();
        assert_eq!(find_date_gaps(&store, 7, 3, None, None).unwrap(), None);

        let gaps = find_date_gaps(&store, 7, 3, Some(day(1, 1)), Some(day(1, 15)))
            .unwrap()
            .unwrap();
        assert_eq!(gaps, vec![(day(1, 1), day(1, 15))]);
    }

    #[test]
    fn test_short_pause_is_not_a_gap() {
        let store = MemoryStore::new();
        store
            .insert_dataset(&dataset(1, day(1, 1), day(1, 5)))
            .unwrap();
        let resumed = day(1, 5) + Duration::hours(6);
        store
            .insert_dataset(&dataset(2, resumed, day(1, 10)))
            .unwrap();

        let gaps = find_date_gaps(&store, 7, 3, None, None).unwrap().unwrap();
        assert!(gaps.is_empty());
    }

    #[test]
    fn test_filters_to_first_value_type() {
        let store = fixture();
        // Different value type starting in between; must not close the gap
        let mut other = dataset(3, day(1, 5), day(1, 8));
        other.value_type = 2;
        store.insert_dataset(&other).unwrap();

        let gaps = find_date_gaps(&store, 7, 3, None, None).unwrap().unwrap();
        assert_eq!(gaps, vec![(day(1, 5), day(1, 8))]);
    }

    #[test]
    fn test_overlapping_datasets_extend_coverage() {
        let store = MemoryStore::new();
        store
            .insert_dataset(&dataset(1, day(1, 1), day(1, 12)))
            .unwrap();
        // Fully contained in the first; coverage must not shrink back
        store
            .insert_dataset(&dataset(2, day(1, 3), day(1, 6)))
            .unwrap();
        store
            .insert_dataset(&dataset(3, day(1, 20), day(1, 25)))
            .unwrap();

        let gaps = find_date_gaps(&store, 7, 3, None, None).unwrap().unwrap();
        assert_eq!(gaps, vec![(day(1, 12), day(1, 20))]);
    }
}
