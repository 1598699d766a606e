//! The single authority for location surrogate ids.
//!
//! Both dataset loaders resolve raw location names through one shared
//! instance, so a name first seen in either extract gets exactly one id and
//! every later encounter, from any dataset, reuses it.

use std::collections::HashMap;
use std::sync::Mutex;

use epi_core::domain::Location;
use epi_core::storage::Storage;

use crate::common::error::{EtlError, Result};

#[derive(Debug, Default)]
struct DimensionInner {
    by_name: HashMap<String, i64>,
    rows: Vec<Location>,
    next_id: i64,
    unpersisted: Vec<Location>,
}

/// In-memory working copy of the location dimension for one pipeline run.
///
/// Lookup is exact string match: case and whitespace variants are distinct
/// locations. Ids are monotonically increasing and never reused, even
/// across runs (the counter resumes past the highest persisted id).
#[derive(Debug)]
pub struct LocationDimension {
    inner: Mutex<DimensionInner>,
}

impl LocationDimension {
    pub fn new() -> Self {
        Self::from_rows(Vec::new())
    }

    /// Rebuild the working copy from the persisted dimension rows.
    pub fn from_rows(rows: Vec<Location>) -> Self {
        let next_id = rows.iter().map(|l| l.location_id).max().unwrap_or(0) + 1;
        let by_name = rows
            .iter()
            .map(|l| (l.location_name.clone(), l.location_id))
            .collect();
        Self {
            inner: Mutex::new(DimensionInner {
                by_name,
                rows,
                next_id,
                unpersisted: Vec::new(),
            }),
        }
    }

    /// Load the persisted dimension from storage.
    pub async fn load(storage: &dyn Storage) -> Result<Self> {
        Ok(Self::from_rows(storage.load_locations().await?))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DimensionInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Exact-match lookup, assigning the next surrogate id on first
    /// encounter. Atomic with respect to concurrent callers, so two dataset
    /// loads racing on the same new name still get one id.
    pub fn get_or_create(&self, location_name: &str) -> Result<i64> {
        if location_name.is_empty() {
            return Err(EtlError::InvalidLocation(location_name.to_string()));
        }

        let mut inner = self.lock();
        if let Some(id) = inner.by_name.get(location_name) {
            return Ok(*id);
        }

        let id = inner.next_id;
        inner.next_id += 1;
        let row = Location {
            location_id: id,
            location_name: location_name.to_string(),
        };
        inner.by_name.insert(location_name.to_string(), id);
        inner.rows.push(row.clone());
        inner.unpersisted.push(row);
        Ok(id)
    }

    /// Read-only exact match.
    pub fn lookup(&self, location_name: &str) -> Option<i64> {
        self.lock().by_name.get(location_name).copied()
    }

    pub fn list_all(&self) -> Vec<Location> {
        self.lock().rows.clone()
    }

    /// Drain the rows created since the last drain, for appending to the
    /// persisted dimension before a fact swap.
    pub fn take_unpersisted(&self) -> Vec<Location> {
        std::mem::take(&mut self.lock().unpersisted)
    }

    pub fn len(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocationDimension {
    fn default() -> Self {
        Self::new()
    }
}
