use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Canonical metric columns of the COVID fact table.
pub const COVID_METRICS: [&str; 8] = [
    "total_cases",
    "new_cases",
    "total_deaths",
    "new_deaths",
    "icu_patients",
    "hosp_patients",
    "total_vaccinations",
    "people_vaccinated",
];

/// Canonical metric columns of the Mpox fact table.
pub const MPOX_METRICS: [&str; 8] = [
    "total_cases",
    "total_deaths",
    "new_cases",
    "new_deaths",
    "total_cases_per_million",
    "total_deaths_per_million",
    "new_cases_per_million",
    "new_deaths_per_million",
];

/// The two disease datasets the warehouse tracks. Each owns a disjoint fact
/// table; both share the location dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    Covid,
    Mpox,
}

impl DatasetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Covid => "covid",
            DatasetKind::Mpox => "mpox",
        }
    }

    /// Name of the fact table this dataset is loaded into.
    pub fn fact_table(&self) -> &'static str {
        match self {
            DatasetKind::Covid => "f_covid",
            DatasetKind::Mpox => "f_mpox",
        }
    }

    /// The metric columns of the target schema, in table order.
    pub fn metric_names(&self) -> &'static [&'static str] {
        match self {
            DatasetKind::Covid => &COVID_METRICS,
            DatasetKind::Mpox => &MPOX_METRICS,
        }
    }

    pub fn is_valid_metric(&self, name: &str) -> bool {
        self.metric_names().iter().any(|m| *m == name)
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "covid" | "covid-19" | "covid19" => Ok(DatasetKind::Covid),
            "mpox" | "monkeypox" => Ok(DatasetKind::Mpox),
            other => Err(format!("unknown dataset kind: {other:?} (expected covid or mpox)")),
        }
    }
}

/// A row of the shared location dimension (`d_location`).
///
/// `location_name` is the exact-match natural key; `location_id` is the
/// surrogate assigned on first encounter and stable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub location_id: i64,
    pub location_name: String,
}

/// One observation row of the COVID fact table (`f_covid`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovidFact {
    pub fact_id: i64,
    pub location_id: i64,
    pub date: Option<NaiveDate>,
    pub total_cases: Option<f64>,
    pub new_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub new_deaths: Option<f64>,
    pub icu_patients: Option<f64>,
    pub hosp_patients: Option<f64>,
    pub total_vaccinations: Option<f64>,
    pub people_vaccinated: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One observation row of the Mpox fact table (`f_mpox`).
///
/// The Mpox source schema is less stable than the COVID one, so any of the
/// metric fields may be entirely absent from a given extract (null here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MpoxFact {
    pub fact_id: i64,
    pub location_id: i64,
    pub date: Option<NaiveDate>,
    pub total_cases: Option<f64>,
    pub total_deaths: Option<f64>,
    pub new_cases: Option<f64>,
    pub new_deaths: Option<f64>,
    pub total_cases_per_million: Option<f64>,
    pub total_deaths_per_million: Option<f64>,
    pub new_cases_per_million: Option<f64>,
    pub new_deaths_per_million: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Pipeline-internal canonical row shape: the normalizer -> loader handoff.
///
/// `metrics` holds an entry for every metric of the target dataset schema,
/// null when the source had no usable value. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub location_name: String,
    pub date: Option<NaiveDate>,
    pub metrics: BTreeMap<&'static str, Option<f64>>,
}

impl NormalizedRow {
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

/// Read surface shared by both fact row types, so queries and aggregates
/// are written once.
pub trait FactRecord {
    fn location_id(&self) -> i64;
    fn date(&self) -> Option<NaiveDate>;

    /// Outer `None` means the metric is not part of this fact's schema.
    fn metric(&self, name: &str) -> Option<Option<f64>>;

    fn metric_names() -> &'static [&'static str]
    where
        Self: Sized;
}

impl FactRecord for CovidFact {
    fn location_id(&self) -> i64 {
        self.location_id
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn metric(&self, name: &str) -> Option<Option<f64>> {
        match name {
            "total_cases" => Some(self.total_cases),
            "new_cases" => Some(self.new_cases),
            "total_deaths" => Some(self.total_deaths),
            "new_deaths" => Some(self.new_deaths),
            "icu_patients" => Some(self.icu_patients),
            "hosp_patients" => Some(self.hosp_patients),
            "total_vaccinations" => Some(self.total_vaccinations),
            "people_vaccinated" => Some(self.people_vaccinated),
            _ => None,
        }
    }

    fn metric_names() -> &'static [&'static str] {
        &COVID_METRICS
    }
}

impl FactRecord for MpoxFact {
    fn location_id(&self) -> i64 {
        self.location_id
    }

    fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn metric(&self, name: &str) -> Option<Option<f64>> {
        match name {
            "total_cases" => Some(self.total_cases),
            "total_deaths" => Some(self.total_deaths),
            "new_cases" => Some(self.new_cases),
            "new_deaths" => Some(self.new_deaths),
            "total_cases_per_million" => Some(self.total_cases_per_million),
            "total_deaths_per_million" => Some(self.total_deaths_per_million),
            "new_cases_per_million" => Some(self.new_cases_per_million),
            "new_deaths_per_million" => Some(self.new_deaths_per_million),
            _ => None,
        }
    }

    fn metric_names() -> &'static [&'static str] {
        &MPOX_METRICS
    }
}

impl CovidFact {
    /// Build a fact row from a resolved normalized row.
    pub fn from_normalized(
        fact_id: i64,
        location_id: i64,
        row: &NormalizedRow,
        now: DateTime<Utc>,
    ) -> Self {
        CovidFact {
            fact_id,
            location_id,
            date: row.date,
            total_cases: row.metric("total_cases"),
            new_cases: row.metric("new_cases"),
            total_deaths: row.metric("total_deaths"),
            new_deaths: row.metric("new_deaths"),
            icu_patients: row.metric("icu_patients"),
            hosp_patients: row.metric("hosp_patients"),
            total_vaccinations: row.metric("total_vaccinations"),
            people_vaccinated: row.metric("people_vaccinated"),
            created_at: now,
            updated_at: now,
        }
    }
}

impl MpoxFact {
    /// Build a fact row from a resolved normalized row.
    pub fn from_normalized(
        fact_id: i64,
        location_id: i64,
        row: &NormalizedRow,
        now: DateTime<Utc>,
    ) -> Self {
        MpoxFact {
            fact_id,
            location_id,
            date: row.date,
            total_cases: row.metric("total_cases"),
            total_deaths: row.metric("total_deaths"),
            new_cases: row.metric("new_cases"),
            new_deaths: row.metric("new_deaths"),
            total_cases_per_million: row.metric("total_cases_per_million"),
            total_deaths_per_million: row.metric("total_deaths_per_million"),
            new_cases_per_million: row.metric("new_cases_per_million"),
            new_deaths_per_million: row.metric("new_deaths_per_million"),
            created_at: now,
            updated_at: now,
        }
    }
}
