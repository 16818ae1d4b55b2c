// 🗄️ SQLite store - schema bootstrap, skip-on-conflict inserts, id resolution, run ledger

use crate::config::StoreConfig;
use crate::entities::{Attached, ChildRecord, ChildTable, PropertyEntity};
use crate::error::StoreError;
use crate::loader::PropertyStore;
use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

// ============================================================================
// RUN LEDGER ENTRY
// ============================================================================

/// One committed ETL run, written in the same transaction as the data it loaded
#[derive(Debug, Clone, PartialEq)]
pub struct IngestRun {
    pub run_id: Uuid,
    pub source_path: String,
    pub source_sha256: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub records: usize,
    pub properties_inserted: usize,
    pub valuations_inserted: usize,
    pub hoa_inserted: usize,
    pub rehab_inserted: usize,
}

impl IngestRun {
    pub fn start(source_path: &str, source_sha256: &str) -> Self {
        IngestRun {
            run_id: Uuid::new_v4(),
            source_path: source_path.to_string(),
            source_sha256: source_sha256.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            records: 0,
            properties_inserted: 0,
            valuations_inserted: 0,
            hoa_inserted: 0,
            rehab_inserted: 0,
        }
    }
}

/// Row counts of the four data tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub properties: i64,
    pub valuations: i64,
    pub hoa: i64,
    pub rehab: i64,
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS properties (
            property_id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL UNIQUE,
            street_address TEXT,
            city TEXT,
            state TEXT,
            zip_code TEXT,
            property_type TEXT,
            year_built INTEGER NOT NULL DEFAULT 0,
            sqft_mu INTEGER NOT NULL DEFAULT 0,
            sqft_total INTEGER NOT NULL DEFAULT 0,
            beds INTEGER NOT NULL DEFAULT 0,
            baths INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    // Child rows are keyed by row_hash (parent id + field values + occurrence)
    // so that re-running the same file skips them instead of duplicating them
    conn.execute(
        "CREATE TABLE IF NOT EXISTS valuations (
            valuation_id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id INTEGER NOT NULL REFERENCES properties(property_id),
            list_price NUMERIC,
            zestimate NUMERIC,
            rent_zestimate NUMERIC,
            redfin_value NUMERIC,
            expected_rent NUMERIC,
            previous_rent NUMERIC,
            arv NUMERIC,
            low_fmr NUMERIC,
            high_fmr NUMERIC,
            row_hash TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS hoa (
            hoa_id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id INTEGER NOT NULL REFERENCES properties(property_id),
            hoa_fee NUMERIC,
            hoa_flag TEXT,
            row_hash TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rehab (
            rehab_id INTEGER PRIMARY KEY AUTOINCREMENT,
            property_id INTEGER NOT NULL REFERENCES properties(property_id),
            underwriting_rehab NUMERIC,
            rehab_calculation NUMERIC,
            paint NUMERIC,
            flooring_flag TEXT,
            foundation_flag TEXT,
            roof_flag TEXT,
            hvac_flag TEXT,
            kitchen_flag TEXT,
            bathroom_flag TEXT,
            appliances_flag TEXT,
            windows_flag TEXT,
            landscaping_flag TEXT,
            trashout_flag TEXT,
            row_hash TEXT NOT NULL UNIQUE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id TEXT PRIMARY KEY,
            source_path TEXT NOT NULL,
            source_sha256 TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT NOT NULL,
            records INTEGER NOT NULL,
            properties_inserted INTEGER NOT NULL,
            valuations_inserted INTEGER NOT NULL,
            hoa_inserted INTEGER NOT NULL,
            rehab_inserted INTEGER NOT NULL
        )",
        [],
    )?;

    for table in ["valuations", "hoa", "rehab"] {
        conn.execute(
            &format!("CREATE INDEX IF NOT EXISTS idx_{table}_property ON {table}(property_id)"),
            [],
        )?;
    }

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

/// JSON value → SQLite value. Nested objects/arrays are stored as JSON text.
fn json_to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

/// Dedup key of a child row: SHA-256 over the owning property id, the field
/// values and `occurrence`, the 0-based count of earlier rows in the same batch
/// with that property id and those values.
pub fn child_row_hash(property_id: i64, values: &[Option<&Value>], occurrence: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(property_id.to_string());
    for value in values {
        hasher.update(b"|");
        match value {
            Some(v) => hasher.update(v.to_string()),
            None => hasher.update(b"null"),
        }
    }
    hasher.update(format!("#{occurrence}"));
    format!("{:x}", hasher.finalize())
}

fn insert_child_sql(table: ChildTable) -> String {
    let columns = table.columns();
    let placeholders = (1..=columns.len() + 2)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT OR IGNORE INTO {} (property_id, {}, row_hash) VALUES ({})",
        table.as_str(),
        columns.join(", "),
        placeholders
    )
}

// ============================================================================
// STATEMENTS
// ============================================================================

/// Insert-or-skip by address. Returns the number of rows actually inserted.
pub fn insert_properties(
    conn: &Connection,
    properties: &[PropertyEntity],
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO properties (
            address, street_address, city, state, zip_code,
            property_type, year_built, sqft_mu, sqft_total, beds, baths
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;

    let mut inserted = 0;
    for p in properties {
        inserted += stmt.execute(params![
            p.address,
            p.street_address,
            p.city,
            p.state,
            p.zip,
            p.property_type,
            p.year_built,
            p.sqft_mu,
            p.sqft_total,
            p.beds,
            p.baths,
        ])?;
    }

    Ok(inserted)
}

/// Insert-or-skip child rows of one kind. Returns the number of rows actually inserted.
///
/// `rows` must hold every row of this kind for the run: identical rows of one
/// property are told apart by their position among equals within this slice.
pub fn insert_children<T: ChildRecord>(
    conn: &Connection,
    rows: &[Attached<'_, T>],
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare_cached(&insert_child_sql(T::TABLE))?;
    let mut seen: HashMap<String, usize> = HashMap::new();

    let mut inserted = 0;
    for row in rows {
        let values = row.entity.values();
        let base = child_row_hash(row.property_id, &values, 0);
        let occurrence = seen.entry(base).or_insert(0);
        let row_hash = child_row_hash(row.property_id, &values, *occurrence);
        *occurrence += 1;

        let mut params = Vec::with_capacity(values.len() + 2);
        params.push(SqlValue::Integer(row.property_id));
        params.extend(values.iter().map(|v| json_to_sql(*v)));
        params.push(SqlValue::Text(row_hash));

        inserted += stmt.execute(params_from_iter(params))?;
    }

    Ok(inserted)
}

/// address → property_id for every property in the store
pub fn property_ids(conn: &Connection) -> Result<HashMap<String, i64>, StoreError> {
    let mut stmt = conn.prepare("SELECT property_id, address FROM properties")?;

    let ids = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?
        .collect::<Result<HashMap<_, _>, _>>()?;

    Ok(ids)
}

pub fn insert_run(conn: &Connection, run: &IngestRun) -> Result<(), StoreError> {
    let finished_at = run.finished_at.unwrap_or_else(Utc::now);

    conn.execute(
        "INSERT INTO ingest_runs (
            run_id, source_path, source_sha256, started_at, finished_at, records,
            properties_inserted, valuations_inserted, hoa_inserted, rehab_inserted
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            run.run_id.to_string(),
            run.source_path,
            run.source_sha256,
            run.started_at.to_rfc3339(),
            finished_at.to_rfc3339(),
            run.records as i64,
            run.properties_inserted as i64,
            run.valuations_inserted as i64,
            run.hoa_inserted as i64,
            run.rehab_inserted as i64,
        ],
    )?;

    Ok(())
}

pub fn count_runs(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get(0))?)
}

pub fn table_counts(conn: &Connection) -> Result<TableCounts, StoreError> {
    let count = |table: &str| -> Result<i64, StoreError> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?)
    };

    Ok(TableCounts {
        properties: count("properties")?,
        valuations: count("valuations")?,
        hoa: count("hoa")?,
        rehab: count("rehab")?,
    })
}

// ============================================================================
// SQLITE STORE
// ============================================================================

/// The run's single connection. Dropping it closes the connection, and SQLite
/// rolls back any transaction still open at that point.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = Connection::open_with_flags(&config.database_path, flags)?;
        Self::configure(conn, config.busy_timeout_ms)
    }

    /// Private in-memory store (tests, dry runs)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::configure(Connection::open_in_memory()?, 0)
    }

    fn configure(conn: Connection, busy_timeout_ms: u64) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_millis(busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(SqliteStore { conn })
    }

    pub fn setup_schema(&self) -> Result<(), StoreError> {
        setup_database(&self.conn)
    }

    pub fn table_counts(&self) -> Result<TableCounts, StoreError> {
        table_counts(&self.conn)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl PropertyStore for SqliteStore {
    fn begin(&mut self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn insert_properties(&mut self, properties: &[PropertyEntity]) -> Result<usize, StoreError> {
        insert_properties(&self.conn, properties)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        // Reads on this connection already see its own uncommitted inserts
        debug!("parent rows visible to this connection");
        Ok(())
    }

    fn resolve_property_ids(&mut self) -> Result<HashMap<String, i64>, StoreError> {
        property_ids(&self.conn)
    }

    fn insert_children<T: ChildRecord>(
        &mut self,
        rows: &[Attached<'_, T>],
    ) -> Result<usize, StoreError> {
        insert_children(&self.conn, rows)
    }

    fn record_run(&mut self, run: &IngestRun) -> Result<(), StoreError> {
        insert_run(&self.conn, run)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.conn.is_autocommit() {
            return Err(StoreError::NoTransaction("commit"));
        }
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }
}
