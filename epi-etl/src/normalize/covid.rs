use tracing::debug;

use epi_core::domain::{DatasetKind, NormalizedRow};

use super::{dedup_rows, extract_rows, SourceNormalizer, TableLayout};
use crate::common::error::Result;
use crate::ingest::RawTable;

/// Normalizer for the OWID-shaped COVID-19 extract.
///
/// After extraction, `new_cases` and `new_deaths` are zero-filled when null;
/// every other metric keeps null for missing or unparsable values.
pub struct CovidNormalizer;

const ZERO_FILLED: [&str; 2] = ["new_cases", "new_deaths"];

impl SourceNormalizer for CovidNormalizer {
    fn normalize(&self, table: &RawTable) -> Result<Vec<NormalizedRow>> {
        let layout = TableLayout::resolve(table, self.dataset())?;
        let mut rows = extract_rows(table, &layout);

        for row in &mut rows {
            for metric in ZERO_FILLED {
                if let Some(value) = row.metrics.get_mut(metric) {
                    if value.is_none() {
                        *value = Some(0.0);
                    }
                }
            }
        }

        let input_count = rows.len();
        let rows = dedup_rows(rows);
        debug!(
            "Normalized {} covid rows ({} duplicates removed)",
            rows.len(),
            input_count - rows.len()
        );
        Ok(rows)
    }

    fn dataset(&self) -> DatasetKind {
        DatasetKind::Covid
    }

    fn name(&self) -> &str {
        "covid"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::EtlError;
    use crate::ingest::read_csv_str;
    use chrono::NaiveDate;

    #[test]
    fn test_conservative_matching_scenario() {
        // Only "Country" and "Reported_Date" resolve; "Confirmed" and
        // "Fatal" are not documented aliases of any covid metric.
        let table = read_csv_str(
            "Country,Reported_Date,Confirmed,Fatal\nFrance,2021-03-01,1000,20\n",
        )
        .unwrap();
        let rows = CovidNormalizer.normalize(&table).unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.location_name, "France");
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2021, 3, 1));
        assert_eq!(row.metric("total_cases"), None);
        assert_eq!(row.metric("total_deaths"), None);
        assert_eq!(row.metric("new_cases"), Some(0.0));
        assert_eq!(row.metric("new_deaths"), Some(0.0));
        assert_eq!(row.metric("icu_patients"), None);
    }

    #[test]
    fn test_canonical_owid_columns() {
        let table = read_csv_str(
            "location,date,total_cases,new_cases,total_deaths,new_deaths,icu_patients\n\
             France,2021-03-01,1000,12,20,1,55\n\
             France,2021-03-02,1012,,21,,\n",
        )
        .unwrap();
        let rows = CovidNormalizer.normalize(&table).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metric("total_cases"), Some(1000.0));
        assert_eq!(rows[0].metric("icu_patients"), Some(55.0));
        // Missing new_cases/new_deaths zero-fill; missing icu stays null
        assert_eq!(rows[1].metric("new_cases"), Some(0.0));
        assert_eq!(rows[1].metric("new_deaths"), Some(0.0));
        assert_eq!(rows[1].metric("icu_patients"), None);
    }

    #[test]
    fn test_missing_location_column_is_schema_mismatch() {
        let table = read_csv_str("day,total_cases\n2021-03-01,1000\n").unwrap();
        let err = CovidNormalizer.normalize(&table).unwrap_err();
        assert!(matches!(err, EtlError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_bad_dates_and_values_become_null() {
        let table = read_csv_str(
            "location,date,total_cases\nFrance,garbage,not-a-number\n",
        )
        .unwrap();
        let rows = CovidNormalizer.normalize(&table).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, None);
        assert_eq!(rows[0].metric("total_cases"), None);
    }

    #[test]
    fn test_exact_duplicates_removed() {
        let table = read_csv_str(
            "location,date,total_cases\n\
             France,2021-03-01,1000\n\
             France,2021-03-01,1000\n\
             France,2021-03-01,1001\n",
        )
        .unwrap();
        let rows = CovidNormalizer.normalize(&table).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_location_string_kept_verbatim() {
        // No trimming or case folding; variants are distinct locations
        let table = read_csv_str(
            "location,date\n France ,2021-03-01\nfrance,2021-03-01\n",
        )
        .unwrap();
        let rows = CovidNormalizer.normalize(&table).unwrap();
        assert_eq!(rows[0].location_name, " France ");
        assert_eq!(rows[1].location_name, "france");
    }
}
