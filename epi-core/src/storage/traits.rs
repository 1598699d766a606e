use async_trait::async_trait;
use chrono::NaiveDate;

use crate::common::error::Result;
use crate::domain::{CovidFact, Location, MpoxFact};

/// Conjunctive row filter pushed down to the store.
///
/// Unset fields impose no constraint. A date bound excludes rows whose date
/// is null, since a null date cannot lie inside any range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactFilter {
    pub location_id: Option<i64>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FactFilter {
    pub fn matches(&self, location_id: i64, date: Option<NaiveDate>) -> bool {
        if let Some(wanted) = self.location_id {
            if location_id != wanted {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            match date {
                Some(d) if d >= from => {}
                _ => return false,
            }
        }
        if let Some(to) = self.date_to {
            match date {
                Some(d) if d <= to => {}
                _ => return false,
            }
        }
        true
    }
}

/// Storage trait for the star schema: the append-only location dimension and
/// the full-refresh fact tables.
///
/// The replace operations are all-or-nothing from the caller's perspective:
/// either the new fact set is fully visible afterwards, or the previous
/// contents remain untouched. Implementations must never expose a partially
/// replaced table.
#[async_trait]
pub trait Storage: Send + Sync {
    // Location dimension
    async fn load_locations(&self) -> Result<Vec<Location>>;
    async fn append_locations(&self, rows: &[Location]) -> Result<()>;

    // Fact tables (full refresh)
    async fn replace_covid_facts(&self, rows: Vec<CovidFact>) -> Result<()>;
    async fn replace_mpox_facts(&self, rows: Vec<MpoxFact>) -> Result<()>;

    // Fact reads with filter pushdown
    async fn covid_facts(&self, filter: &FactFilter) -> Result<Vec<CovidFact>>;
    async fn mpox_facts(&self, filter: &FactFilter) -> Result<Vec<MpoxFact>>;
}
