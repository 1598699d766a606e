use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::common::error::{CoreError, Result};
use crate::domain::{CovidFact, Location, MpoxFact};
use crate::storage::traits::{FactFilter, Storage};

const COVID_COLUMNS: &str = "fact_id, location_id, date, total_cases, new_cases, total_deaths, \
     new_deaths, icu_patients, hosp_patients, total_vaccinations, people_vaccinated, \
     created_at, updated_at";

const MPOX_COLUMNS: &str = "fact_id, location_id, date, total_cases, total_deaths, new_cases, \
     new_deaths, total_cases_per_million, total_deaths_per_million, new_cases_per_million, \
     new_deaths_per_million, created_at, updated_at";

const CREATE_COVID_STAGING: &str = "CREATE TABLE f_covid_staging (
    fact_id            INTEGER PRIMARY KEY,
    location_id        INTEGER NOT NULL REFERENCES d_location(location_id),
    date               TEXT,
    total_cases        REAL,
    new_cases          REAL,
    total_deaths       REAL,
    new_deaths         REAL,
    icu_patients       REAL,
    hosp_patients      REAL,
    total_vaccinations REAL,
    people_vaccinated  REAL,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
)";

const CREATE_MPOX_STAGING: &str = "CREATE TABLE f_mpox_staging (
    fact_id                  INTEGER PRIMARY KEY,
    location_id              INTEGER NOT NULL REFERENCES d_location(location_id),
    date                     TEXT,
    total_cases              REAL,
    total_deaths             REAL,
    new_cases                REAL,
    new_deaths               REAL,
    total_cases_per_million  REAL,
    total_deaths_per_million REAL,
    new_cases_per_million    REAL,
    new_deaths_per_million   REAL,
    created_at               TEXT NOT NULL,
    updated_at               TEXT NOT NULL
)";

const COVID_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_f_covid_location_date ON f_covid(location_id, date)";
const MPOX_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_f_mpox_location_date ON f_mpox(location_id, date)";

/// SQLite storage backend for the star schema.
///
/// Fact replacement is staged: rows are written to a staging table first and
/// the live table is dropped only once the staging table holds the complete
/// new set, so a failed load leaves the previous contents in place.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Opening SQLite store at {}", path.display());
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        debug!("Running star schema migrations");
        let migration_sql = include_str!("../../migrations/001_create_star_schema.sql");
        conn.execute_batch(migration_sql).map_err(|e| CoreError::Database {
            message: format!("Failed to run star schema migration: {e}"),
        })?;
        Ok(())
    }

    /// Atomically retire the live table and promote the fully populated
    /// staging table in its place.
    fn swap_staging(conn: &mut Connection, table: &str, index_sql: &str) -> Result<()> {
        let tx = conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table};
             ALTER TABLE {table}_staging RENAME TO {table};"
        ))?;
        tx.execute_batch(index_sql)?;
        tx.commit()?;
        Ok(())
    }

    fn filtered_select(columns: &str, table: &str, filter: &FactFilter) -> (String, Vec<rusqlite::types::Value>) {
        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(location_id) = filter.location_id {
            clauses.push("location_id = ?");
            params.push(rusqlite::types::Value::Integer(location_id));
        }
        if let Some(from) = filter.date_from {
            clauses.push("date IS NOT NULL AND date >= ?");
            params.push(rusqlite::types::Value::Text(from.to_string()));
        }
        if let Some(to) = filter.date_to {
            clauses.push("date IS NOT NULL AND date <= ?");
            params.push(rusqlite::types::Value::Text(to.to_string()));
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY fact_id");
        (sql, params)
    }
}

fn covid_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CovidFact> {
    Ok(CovidFact {
        fact_id: row.get(0)?,
        location_id: row.get(1)?,
        date: row.get(2)?,
        total_cases: row.get(3)?,
        new_cases: row.get(4)?,
        total_deaths: row.get(5)?,
        new_deaths: row.get(6)?,
        icu_patients: row.get(7)?,
        hosp_patients: row.get(8)?,
        total_vaccinations: row.get(9)?,
        people_vaccinated: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn mpox_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MpoxFact> {
    Ok(MpoxFact {
        fact_id: row.get(0)?,
        location_id: row.get(1)?,
        date: row.get(2)?,
        total_cases: row.get(3)?,
        total_deaths: row.get(4)?,
        new_cases: row.get(5)?,
        new_deaths: row.get(6)?,
        total_cases_per_million: row.get(7)?,
        total_deaths_per_million: row.get(8)?,
        new_cases_per_million: row.get(9)?,
        new_deaths_per_million: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn load_locations(&self) -> Result<Vec<Location>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT location_id, location_name FROM d_location ORDER BY location_id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Location {
                    location_id: row.get(0)?,
                    location_name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn append_locations(&self, rows: &[Location]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO d_location (location_id, location_name) VALUES (?1, ?2)")?;
            for location in rows {
                stmt.execute(params![location.location_id, location.location_name])?;
            }
        }
        tx.commit()?;
        debug!("Appended {} dimension rows", rows.len());
        Ok(())
    }

    async fn replace_covid_facts(&self, rows: Vec<CovidFact>) -> Result<()> {
        let mut conn = self.conn.lock().await;

        conn.execute_batch("DROP TABLE IF EXISTS f_covid_staging")?;
        conn.execute_batch(CREATE_COVID_STAGING)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO f_covid_staging ({COVID_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ))?;
            for fact in &rows {
                stmt.execute(params![
                    fact.fact_id,
                    fact.location_id,
                    fact.date,
                    fact.total_cases,
                    fact.new_cases,
                    fact.total_deaths,
                    fact.new_deaths,
                    fact.icu_patients,
                    fact.hosp_patients,
                    fact.total_vaccinations,
                    fact.people_vaccinated,
                    fact.created_at,
                    fact.updated_at,
                ])?;
            }
        }
        tx.commit()?;

        Self::swap_staging(&mut conn, "f_covid", COVID_INDEX)?;
        info!("Replaced f_covid with {} rows", rows.len());
        Ok(())
    }

    async fn replace_mpox_facts(&self, rows: Vec<MpoxFact>) -> Result<()> {
        let mut conn = self.conn.lock().await;

        conn.execute_batch("DROP TABLE IF EXISTS f_mpox_staging")?;
        conn.execute_batch(CREATE_MPOX_STAGING)?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO f_mpox_staging ({MPOX_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
            ))?;
            for fact in &rows {
                stmt.execute(params![
                    fact.fact_id,
                    fact.location_id,
                    fact.date,
                    fact.total_cases,
                    fact.total_deaths,
                    fact.new_cases,
                    fact.new_deaths,
                    fact.total_cases_per_million,
                    fact.total_deaths_per_million,
                    fact.new_cases_per_million,
                    fact.new_deaths_per_million,
                    fact.created_at,
                    fact.updated_at,
                ])?;
            }
        }
        tx.commit()?;

        Self::swap_staging(&mut conn, "f_mpox", MPOX_INDEX)?;
        info!("Replaced f_mpox with {} rows", rows.len());
        Ok(())
    }

    async fn covid_facts(&self, filter: &FactFilter) -> Result<Vec<CovidFact>> {
        let conn = self.conn.lock().await;
        let (sql, params) = Self::filtered_select(COVID_COLUMNS, "f_covid", filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), covid_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn mpox_facts(&self, filter: &FactFilter) -> Result<Vec<MpoxFact>> {
        let conn = self.conn.lock().await;
        let (sql, params) = Self::filtered_select(MPOX_COLUMNS, "f_mpox", filter);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), mpox_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
