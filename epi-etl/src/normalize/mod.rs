//! Per-dataset adapters projecting raw tables into the canonical row shape.
//!
//! Column resolution happens once per table, never per row. Row-level
//! problems (bad date, bad number, short row) degrade to null values; only a
//! missing location column is fatal for a table.

pub mod covid;
pub mod mpox;

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveDateTime};

use epi_core::domain::{DatasetKind, NormalizedRow};

use crate::common::error::{EtlError, Result};
use crate::ingest::RawTable;
use crate::resolve::{resolve_role_index, ColumnRole};

pub use covid::CovidNormalizer;
pub use mpox::MpoxNormalizer;

/// Adapter from one dataset's raw table shape to normalized rows.
pub trait SourceNormalizer: Send + Sync {
    /// Project a raw table into canonical rows.
    fn normalize(&self, table: &RawTable) -> Result<Vec<NormalizedRow>>;

    /// The dataset this normalizer handles.
    fn dataset(&self) -> DatasetKind;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}

/// Select the normalizer for a dataset.
pub fn normalizer_for(dataset: DatasetKind) -> Box<dyn SourceNormalizer> {
    match dataset {
        DatasetKind::Covid => Box::new(CovidNormalizer),
        DatasetKind::Mpox => Box::new(MpoxNormalizer),
    }
}

/// Column positions for one table, resolved up front.
pub(crate) struct TableLayout {
    pub location_idx: usize,
    pub date_idx: Option<usize>,
    /// One entry per metric of the target schema, in catalog order.
    pub metric_cols: Vec<(&'static str, Option<usize>)>,
}

impl TableLayout {
    /// Resolve the location and date roles plus exact-name metric columns.
    ///
    /// Metric columns match by exact canonical name only, so undocumented
    /// synonyms stay unmapped. An unresolvable location column is a
    /// `SchemaMismatch`; everything else degrades to unavailable.
    pub fn resolve(table: &RawTable, dataset: DatasetKind) -> Result<Self> {
        let location_idx = resolve_role_index(&table.columns, ColumnRole::Location)
            .ok_or_else(|| EtlError::SchemaMismatch {
                dataset,
                detail: format!(
                    "no location column could be resolved among {:?}",
                    table.columns
                ),
            })?;
        let date_idx = resolve_role_index(&table.columns, ColumnRole::Date);
        let metric_cols = dataset
            .metric_names()
            .iter()
            .map(|metric| (*metric, table.column_index(metric)))
            .collect();
        Ok(Self {
            location_idx,
            date_idx,
            metric_cols,
        })
    }
}

/// Extract every row of `table` through `layout`. No defaulting, no dedup.
pub(crate) fn extract_rows(table: &RawTable, layout: &TableLayout) -> Vec<NormalizedRow> {
    table
        .rows
        .iter()
        .map(|row| {
            let location_name = RawTable::field(row, layout.location_idx).to_string();
            let date = layout
                .date_idx
                .and_then(|idx| parse_date(RawTable::field(row, idx)));
            let metrics = layout
                .metric_cols
                .iter()
                .map(|(name, idx)| {
                    (*name, idx.and_then(|i| parse_metric(RawTable::field(row, i))))
                })
                .collect();
            NormalizedRow {
                location_name,
                date,
                metrics,
            }
        })
        .collect()
}

/// Permissive date parse: a fixed set of calendar and timestamp formats,
/// anything else is null rather than an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    const TIMESTAMP_FORMATS: [&str; 3] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
    ];
    for format in TIMESTAMP_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.date());
        }
    }

    None
}

/// Numeric parse: finite number or null, never zero.
pub fn parse_metric(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    match s.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

/// Drop exact-duplicate rows (same location, date, and full metric tuple),
/// keeping the first occurrence.
pub(crate) fn dedup_rows(rows: Vec<NormalizedRow>) -> Vec<NormalizedRow> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(dedup_key(row)))
        .collect()
}

type DedupKey = (String, Option<NaiveDate>, Vec<(&'static str, Option<u64>)>);

fn dedup_key(row: &NormalizedRow) -> DedupKey {
    (
        row.location_name.clone(),
        row.date,
        row.metrics
            .iter()
            .map(|(name, value)| (*name, value.map(f64::to_bits)))
            .collect(),
    )
}
