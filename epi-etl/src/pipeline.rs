//! Orchestration of one dataset load: normalize then load.

use std::sync::Arc;

use tracing::info;

use epi_core::domain::DatasetKind;
use epi_core::storage::Storage;

use crate::common::error::Result;
use crate::dimension::LocationDimension;
use crate::ingest::RawTable;
use crate::load::{DimensionalLoader, LoadReport};
use crate::normalize::normalizer_for;

/// Run the reconciliation pipeline for one dataset's raw table: project it
/// into canonical rows, resolve locations against the persisted dimension,
/// and replace the dataset's fact table.
///
/// Stateless between invocations apart from the persisted dimension and
/// fact tables; COVID and Mpox loads may run in either order.
pub async fn run_load(
    storage: Arc<dyn Storage>,
    dataset: DatasetKind,
    table: &RawTable,
) -> Result<LoadReport> {
    info!("Starting {} load: {} raw rows", dataset, table.len());

    let normalizer = normalizer_for(dataset);
    let rows = normalizer.normalize(table)?;

    let dimension = LocationDimension::load(storage.as_ref()).await?;
    let loader = DimensionalLoader::new(storage);
    loader.load(dataset, rows, &dimension).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use epi_core::storage::{FactFilter, MemoryStorage};

    use crate::ingest::read_csv_str;

    #[tokio::test]
    async fn test_run_load_end_to_end() {
        let storage = Arc::new(MemoryStorage::new());
        let table = read_csv_str(
            "location,date,total_cases,new_cases\n\
             France,2021-03-01,1000,10\n\
             Brazil,2021-03-01,2000,20\n",
        )
        .unwrap();

        let report = run_load(storage.clone(), DatasetKind::Covid, &table)
            .await
            .unwrap();
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(report.rows_skipped, 0);

        let facts = storage.covid_facts(&FactFilter::default()).await.unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(storage.load_locations().await.unwrap().len(), 2);
    }
}
