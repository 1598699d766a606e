//! Filtered time-series reads over the fact tables, joined with the
//! location dimension.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use epi_core::domain::{DatasetKind, FactRecord, Location};
use epi_core::storage::{FactFilter, Storage};

use crate::common::error::{EtlError, Result};

/// Parameters of one series read. Unset filters impose no constraint.
#[derive(Debug, Clone)]
pub struct SeriesQuery {
    pub metric: String,
    pub location_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SeriesQuery {
    pub fn for_metric(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            location_id: None,
            date_from: None,
            date_to: None,
            offset: 0,
            limit: None,
        }
    }
}

/// One point of a metric series, with the display name joined in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub date: Option<NaiveDate>,
    pub location_id: i64,
    pub location_name: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// Aggregate summary of one dataset (optionally restricted to a location).
///
/// Sums skip null values; a metric with no non-null observation stays null.
/// The vaccination sums only apply to the COVID dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub dataset: DatasetKind,
    pub row_count: usize,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub latest_date: Option<NaiveDate>,
    pub total_vaccinations: Option<f64>,
    pub people_vaccinated: Option<f64>,
}

pub struct TimeSeriesEngine {
    storage: Arc<dyn Storage>,
}

impl TimeSeriesEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Ordered series of one metric: date ascending (null dates first),
    /// then location id ascending. Offset and limit apply after ordering.
    pub async fn series(
        &self,
        dataset: DatasetKind,
        query: &SeriesQuery,
    ) -> Result<Vec<TimeSeriesPoint>> {
        if !dataset.is_valid_metric(&query.metric) {
            return Err(EtlError::unknown_metric(dataset, &query.metric));
        }

        let filter = FactFilter {
            location_id: query.location_id,
            date_from: query.date_from,
            date_to: query.date_to,
        };
        let names = self.location_names().await?;

        let mut points = match dataset {
            DatasetKind::Covid => {
                let facts = self.storage.covid_facts(&filter).await?;
                collect_points(&facts, &names, &query.metric)
            }
            DatasetKind::Mpox => {
                let facts = self.storage.mpox_facts(&filter).await?;
                collect_points(&facts, &names, &query.metric)
            }
        };

        points.sort_by(|a, b| (a.date, a.location_id).cmp(&(b.date, b.location_id)));

        let points = points.into_iter().skip(query.offset);
        Ok(match query.limit {
            Some(limit) => points.take(limit).collect(),
            None => points.collect(),
        })
    }

    /// Aggregate case/death totals and the latest observation date.
    pub async fn stats(
        &self,
        dataset: DatasetKind,
        location_id: Option<i64>,
    ) -> Result<DatasetStats> {
        let filter = FactFilter {
            location_id,
            ..Default::default()
        };

        let mut stats = DatasetStats {
            dataset,
            row_count: 0,
            total_cases: None,
            total_deaths: None,
            latest_date: None,
            total_vaccinations: None,
            people_vaccinated: None,
        };

        match dataset {
            DatasetKind::Covid => {
                for fact in self.storage.covid_facts(&filter).await? {
                    accumulate(&mut stats, &fact);
                    add_assign(&mut stats.total_vaccinations, fact.total_vaccinations);
                    add_assign(&mut stats.people_vaccinated, fact.people_vaccinated);
                }
            }
            DatasetKind::Mpox => {
                for fact in self.storage.mpox_facts(&filter).await? {
                    accumulate(&mut stats, &fact);
                }
            }
        }
        Ok(stats)
    }

    async fn location_names(&self) -> Result<HashMap<i64, String>> {
        Ok(self
            .storage
            .load_locations()
            .await?
            .into_iter()
            .map(|Location { location_id, location_name }| (location_id, location_name))
            .collect())
    }
}

fn collect_points<F: FactRecord>(
    facts: &[F],
    names: &HashMap<i64, String>,
    metric: &str,
) -> Vec<TimeSeriesPoint> {
    let mut points = Vec::with_capacity(facts.len());
    for fact in facts {
        let Some(location_name) = names.get(&fact.location_id()) else {
            warn!(
                "Fact row references unknown location id {}; dropped from result",
                fact.location_id()
            );
            continue;
        };
        points.push(TimeSeriesPoint {
            date: fact.date(),
            location_id: fact.location_id(),
            location_name: location_name.clone(),
            metric: metric.to_string(),
            value: fact.metric(metric).unwrap_or(None),
        });
    }
    points
}

fn accumulate<F: FactRecord>(stats: &mut DatasetStats, fact: &F) {
    stats.row_count += 1;
    add_assign(&mut stats.total_cases, fact.metric("total_cases").unwrap_or(None));
    add_assign(&mut stats.total_deaths, fact.metric("total_deaths").unwrap_or(None));
    if let Some(date) = fact.date() {
        stats.latest_date = Some(match stats.latest_date {
            Some(latest) if latest >= date => latest,
            _ => date,
        });
    }
}

fn add_assign(acc: &mut Option<f64>, value: Option<f64>) {
    if let Some(v) = value {
        *acc = Some(acc.unwrap_or(0.0) + v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    use epi_core::domain::{CovidFact, MpoxFact, NormalizedRow, COVID_METRICS, MPOX_METRICS};
    use epi_core::storage::MemoryStorage;

    fn d(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2021, 3, day)
    }

    fn covid_fact(
        fact_id: i64,
        location_id: i64,
        date: Option<NaiveDate>,
        total_cases: Option<f64>,
    ) -> CovidFact {
        let mut metrics: BTreeMap<&'static str, Option<f64>> = BTreeMap::new();
        for name in COVID_METRICS {
            metrics.insert(name, None);
        }
        metrics.insert("total_cases", total_cases);
        let row = NormalizedRow {
            location_name: String::new(),
            date,
            metrics,
        };
        CovidFact::from_normalized(fact_id, location_id, &row, Utc::now())
    }

    async fn engine_with_fixture() -> (TimeSeriesEngine, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .append_locations(&[
                Location {
                    location_id: 1,
                    location_name: "France".to_string(),
                },
                Location {
                    location_id: 2,
                    location_name: "Brazil".to_string(),
                },
            ])
            .await
            .unwrap();
        storage
            .replace_covid_facts(vec![
                covid_fact(1, 2, d(5), Some(50.0)),
                covid_fact(2, 1, d(5), Some(40.0)),
                covid_fact(3, 1, d(1), Some(10.0)),
                covid_fact(4, 1, None, Some(1.0)),
                covid_fact(5, 2, d(9), None),
            ])
            .await
            .unwrap();
        (TimeSeriesEngine::new(storage.clone()), storage)
    }

    #[tokio::test]
    async fn test_ordering_date_then_location() {
        let (engine, _) = engine_with_fixture().await;
        let points = engine
            .series(DatasetKind::Covid, &SeriesQuery::for_metric("total_cases"))
            .await
            .unwrap();

        let keys: Vec<(Option<NaiveDate>, i64)> =
            points.iter().map(|p| (p.date, p.location_id)).collect();
        assert_eq!(keys, vec![(None, 1), (d(1), 1), (d(5), 1), (d(5), 2), (d(9), 2)]);
        assert_eq!(points[1].location_name, "France");
        assert_eq!(points[3].location_name, "Brazil");
    }

    #[tokio::test]
    async fn test_date_range_bounds() {
        let (engine, _) = engine_with_fixture().await;
        let mut query = SeriesQuery::for_metric("total_cases");
        query.date_from = d(1);
        query.date_to = d(5);

        let points = engine.series(DatasetKind::Covid, &query).await.unwrap();
        assert_eq!(points.len(), 3);
        for point in &points {
            let date = point.date.expect("null dates excluded by range filter");
            assert!(date >= d(1).unwrap() && date <= d(5).unwrap());
        }
    }

    #[tokio::test]
    async fn test_location_filter() {
        let (engine, _) = engine_with_fixture().await;
        let mut query = SeriesQuery::for_metric("total_cases");
        query.location_id = Some(2);

        let points = engine.series(DatasetKind::Covid, &query).await.unwrap();
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.location_id == 2));
        // Null metric values are present-with-null, not dropped
        assert_eq!(points[1].value, None);
    }

    #[tokio::test]
    async fn test_offset_limit_after_ordering() {
        let (engine, _) = engine_with_fixture().await;
        let mut query = SeriesQuery::for_metric("total_cases");
        query.offset = 1;
        query.limit = Some(2);

        let points = engine.series(DatasetKind::Covid, &query).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, d(1));
        assert_eq!(points[1].date, d(5));
    }

    #[tokio::test]
    async fn test_unknown_metric_lists_valid_set() {
        let (engine, _) = engine_with_fixture().await;
        let err = engine
            .series(DatasetKind::Covid, &SeriesQuery::for_metric("cfr"))
            .await
            .unwrap_err();

        match err {
            EtlError::UnknownMetric { metric, valid, .. } => {
                assert_eq!(metric, "cfr");
                assert!(valid.contains("total_cases"));
                assert!(valid.contains("people_vaccinated"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let (engine, _) = engine_with_fixture().await;
        let mut query = SeriesQuery::for_metric("total_cases");
        query.location_id = Some(99);

        let points = engine.series(DatasetKind::Covid, &query).await.unwrap();
        assert!(points.is_empty());
    }

    #[tokio::test]
    async fn test_stats_sums_and_latest_date() {
        let (engine, _) = engine_with_fixture().await;
        let stats = engine.stats(DatasetKind::Covid, None).await.unwrap();

        assert_eq!(stats.row_count, 5);
        assert_eq!(stats.total_cases, Some(101.0));
        assert_eq!(stats.total_deaths, None);
        assert_eq!(stats.latest_date, d(9));
    }

    #[tokio::test]
    async fn test_mpox_stats_have_no_vaccination_sums() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .append_locations(&[Location {
                location_id: 1,
                location_name: "Nigeria".to_string(),
            }])
            .await
            .unwrap();

        let mut metrics: BTreeMap<&'static str, Option<f64>> = BTreeMap::new();
        for name in MPOX_METRICS {
            metrics.insert(name, None);
        }
        metrics.insert("total_cases", Some(7.0));
        let row = NormalizedRow {
            location_name: String::new(),
            date: d(1),
            metrics,
        };
        storage
            .replace_mpox_facts(vec![MpoxFact::from_normalized(1, 1, &row, Utc::now())])
            .await
            .unwrap();

        let engine = TimeSeriesEngine::new(storage);
        let stats = engine.stats(DatasetKind::Mpox, None).await.unwrap();
        assert_eq!(stats.total_cases, Some(7.0));
        assert_eq!(stats.total_vaccinations, None);
        assert_eq!(stats.people_vaccinated, None);
    }
}
