use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::error::Result;
use crate::domain::{CovidFact, Location, MpoxFact};
use crate::storage::traits::{FactFilter, Storage};

#[derive(Debug, Default)]
struct MemoryInner {
    locations: Vec<Location>,
    covid: Vec<CovidFact>,
    mpox: Vec<MpoxFact>,
}

/// In-memory storage backend, used by tests and dry runs.
///
/// Replace operations swap the whole vector, so the all-or-nothing contract
/// holds trivially.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<MemoryInner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn load_locations(&self) -> Result<Vec<Location>> {
        Ok(self.lock().locations.clone())
    }

    async fn append_locations(&self, rows: &[Location]) -> Result<()> {
        self.lock().locations.extend_from_slice(rows);
        Ok(())
    }

    async fn replace_covid_facts(&self, rows: Vec<CovidFact>) -> Result<()> {
        self.lock().covid = rows;
        Ok(())
    }

    async fn replace_mpox_facts(&self, rows: Vec<MpoxFact>) -> Result<()> {
        self.lock().mpox = rows;
        Ok(())
    }

    async fn covid_facts(&self, filter: &FactFilter) -> Result<Vec<CovidFact>> {
        Ok(self
            .lock()
            .covid
            .iter()
            .filter(|f| filter.matches(f.location_id, f.date))
            .cloned()
            .collect())
    }

    async fn mpox_facts(&self, filter: &FactFilter) -> Result<Vec<MpoxFact>> {
        Ok(self
            .lock()
            .mpox
            .iter()
            .filter(|f| filter.matches(f.location_id, f.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use std::collections::BTreeMap;

    use crate::domain::{NormalizedRow, COVID_METRICS};

    fn covid_row(location_id: i64, date: Option<NaiveDate>) -> CovidFact {
        let mut metrics: BTreeMap<&'static str, Option<f64>> = BTreeMap::new();
        for name in COVID_METRICS {
            metrics.insert(name, None);
        }
        let row = NormalizedRow {
            location_name: "test".to_string(),
            date,
            metrics,
        };
        CovidFact::from_normalized(0, location_id, &row, Utc::now())
    }

    #[tokio::test]
    async fn test_replace_is_full_refresh() {
        let storage = MemoryStorage::new();
        storage
            .replace_covid_facts(vec![covid_row(1, None), covid_row(2, None)])
            .await
            .unwrap();
        storage
            .replace_covid_facts(vec![covid_row(3, None)])
            .await
            .unwrap();

        let facts = storage.covid_facts(&FactFilter::default()).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].location_id, 3);
    }

    #[tokio::test]
    async fn test_filter_pushdown() {
        let storage = MemoryStorage::new();
        let d1 = NaiveDate::from_ymd_opt(2021, 1, 1);
        let d2 = NaiveDate::from_ymd_opt(2021, 6, 1);
        storage
            .replace_covid_facts(vec![covid_row(1, d1), covid_row(1, d2), covid_row(2, d1)])
            .await
            .unwrap();

        let filter = FactFilter {
            location_id: Some(1),
            date_from: d2,
            ..Default::default()
        };
        let facts = storage.covid_facts(&filter).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].date, d2);
    }

    #[tokio::test]
    async fn test_locations_append_only() {
        let storage = MemoryStorage::new();
        storage
            .append_locations(&[Location {
                location_id: 1,
                location_name: "France".to_string(),
            }])
            .await
            .unwrap();
        storage
            .append_locations(&[Location {
                location_id: 2,
                location_name: "Brazil".to_string(),
            }])
            .await
            .unwrap();

        let locations = storage.load_locations().await.unwrap();
        assert_eq!(locations.len(), 2);
    }
}
