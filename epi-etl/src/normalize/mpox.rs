use tracing::debug;

use epi_core::domain::{DatasetKind, NormalizedRow};

use super::{dedup_rows, extract_rows, SourceNormalizer, TableLayout};
use crate::common::error::Result;
use crate::ingest::RawTable;
use crate::resolve::{resolve_role_index, ColumnRole};

/// Normalizer for the Mpox extract.
///
/// The Mpox source schema has been reshaped several times, so this adapter
/// makes no defaulting assumptions: every metric the source does not carry
/// stays null. When the exact `new_cases`/`new_deaths` columns are absent, a
/// Cases-/Deaths-role column may supply daily counts instead (aggregated
/// line-list extracts ship them under bare names like "cases").
pub struct MpoxNormalizer;

impl MpoxNormalizer {
    /// Point unresolved daily-count metrics at role-matched columns, unless
    /// the candidate column is already claimed by an exact metric match.
    fn apply_count_fallbacks(table: &RawTable, layout: &mut TableLayout) {
        let claimed: Vec<usize> = layout
            .metric_cols
            .iter()
            .filter_map(|(_, idx)| *idx)
            .collect();

        let fallbacks = [("new_cases", ColumnRole::Cases), ("new_deaths", ColumnRole::Deaths)];
        for (metric, role) in fallbacks {
            let Some(slot) = layout
                .metric_cols
                .iter_mut()
                .find(|(name, idx)| *name == metric && idx.is_none())
            else {
                continue;
            };
            if let Some(idx) = resolve_role_index(&table.columns, role) {
                if !claimed.contains(&idx) && idx != layout.location_idx {
                    debug!(
                        "Mpox fallback: column {:?} supplies {}",
                        table.columns[idx], metric
                    );
                    slot.1 = Some(idx);
                }
            }
        }
    }
}

impl SourceNormalizer for MpoxNormalizer {
    fn normalize(&self, table: &RawTable) -> Result<Vec<NormalizedRow>> {
        let mut layout = TableLayout::resolve(table, self.dataset())?;
        Self::apply_count_fallbacks(table, &mut layout);

        let rows = extract_rows(table, &layout);
        let input_count = rows.len();
        let rows = dedup_rows(rows);
        debug!(
            "Normalized {} mpox rows ({} duplicates removed)",
            rows.len(),
            input_count - rows.len()
        );
        Ok(rows)
    }

    fn dataset(&self) -> DatasetKind {
        DatasetKind::Mpox
    }

    fn name(&self) -> &str {
        "mpox"
    }
}
