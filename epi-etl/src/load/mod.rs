//! Full-refresh loading of normalized rows into the star schema.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use epi_core::domain::{CovidFact, DatasetKind, MpoxFact, NormalizedRow};
use epi_core::storage::Storage;

use crate::common::error::{EtlError, Result};
use crate::dimension::LocationDimension;

/// Outcome of loading one dataset's batch.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub dataset: DatasetKind,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
    pub errors: Vec<String>,
}

impl LoadReport {
    fn new(dataset: DatasetKind) -> Self {
        Self {
            dataset,
            rows_loaded: 0,
            rows_skipped: 0,
            errors: Vec::new(),
        }
    }
}

/// Resolves each row's location against the shared dimension and replaces
/// the dataset's fact table with the resolved set.
///
/// New dimension rows are appended before the fact swap so every fact row
/// references a persisted location. The swap itself is staged by the store;
/// a storage failure aborts this dataset's load with the prior table intact
/// and never touches the other dataset.
pub struct DimensionalLoader {
    storage: Arc<dyn Storage>,
}

impl DimensionalLoader {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn load(
        &self,
        dataset: DatasetKind,
        rows: Vec<NormalizedRow>,
        dimension: &LocationDimension,
    ) -> Result<LoadReport> {
        let mut report = LoadReport::new(dataset);

        let mut resolved: Vec<(i64, NormalizedRow)> = Vec::with_capacity(rows.len());
        for row in rows {
            match dimension.get_or_create(&row.location_name) {
                Ok(location_id) => resolved.push((location_id, row)),
                Err(EtlError::InvalidLocation(name)) => {
                    warn!("Skipping {} row with invalid location {:?}", dataset, name);
                    report.rows_skipped += 1;
                    report.errors.push(format!("invalid location name: {name:?}"));
                }
                Err(other) => return Err(other),
            }
        }

        let new_locations = dimension.take_unpersisted();
        if !new_locations.is_empty() {
            info!(
                "Dimension grew by {} location(s) during {} load",
                new_locations.len(),
                dataset
            );
        }
        self.storage
            .append_locations(&new_locations)
            .await
            .map_err(|e| EtlError::StorageFailure {
                rows_processed: resolved.len(),
                message: e.to_string(),
            })?;

        let now = Utc::now();
        let replace = match dataset {
            DatasetKind::Covid => {
                let facts: Vec<CovidFact> = resolved
                    .iter()
                    .enumerate()
                    .map(|(i, (location_id, row))| {
                        CovidFact::from_normalized(i as i64 + 1, *location_id, row, now)
                    })
                    .collect();
                self.storage.replace_covid_facts(facts).await
            }
            DatasetKind::Mpox => {
                let facts: Vec<MpoxFact> = resolved
                    .iter()
                    .enumerate()
                    .map(|(i, (location_id, row))| {
                        MpoxFact::from_normalized(i as i64 + 1, *location_id, row, now)
                    })
                    .collect();
                self.storage.replace_mpox_facts(facts).await
            }
        };
        replace.map_err(|e| EtlError::StorageFailure {
            rows_processed: resolved.len(),
            message: e.to_string(),
        })?;

        report.rows_loaded = resolved.len();
        info!(
            "Loaded {} {} rows into {} ({} skipped)",
            report.rows_loaded,
            dataset,
            dataset.fact_table(),
            report.rows_skipped
        );
        Ok(report)
    }
}
