// 🚚 Pipeline - connect → extract → normalize → load, on one connection

use crate::config::EtlConfig;
use crate::db::{IngestRun, SqliteStore, TableCounts};
use crate::error::EtlError;
use crate::extract::extract;
use crate::loader::{LoadReport, Loader};
use crate::normalize::{normalize, NormalizeStats};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub normalize: NormalizeStats,
    pub load: LoadReport,
    /// Table sizes after commit, `None` if they could not be read
    pub counts: Option<TableCounts>,
}

/// Run the whole ETL against `input`.
///
/// Connection and extraction failures return before anything is written.
/// The store connection is closed when this returns, on every path.
pub fn run(input: &Path, config: &EtlConfig) -> Result<RunSummary, EtlError> {
    info!(database = %config.store.database_path.display(), "connecting to database");
    let mut store = SqliteStore::open(&config.store).map_err(|source| EtlError::Connection {
        path: config.store.database_path.clone(),
        source,
    })?;
    info!("database connection successful");

    let table = extract(input)?;
    let batch = normalize(&table);

    if config.store.bootstrap_schema {
        store.setup_schema().map_err(EtlError::Schema)?;
    }

    let ingest = IngestRun::start(&input.display().to_string(), &table.source_sha256);
    let report = Loader::new(&mut store, config.load).load(&batch, ingest)?;

    let counts = match store.table_counts() {
        Ok(counts) => Some(counts),
        Err(err) => {
            warn!(error = %err, "could not read table counts");
            None
        }
    };

    info!(run_id = %report.run.run_id, "ETL process finished");
    Ok(RunSummary {
        normalize: batch.stats,
        load: report,
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FlushMode, LoadConfig, StoreConfig};
    use crate::error::{ExtractError, LoadPhase};
    use crate::entities::ChildTable;
    use rusqlite::Connection;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        config: EtlConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config = EtlConfig {
                input_path: None,
                store: StoreConfig {
                    database_path: dir.path().join("property_db.sqlite"),
                    ..StoreConfig::default()
                },
                load: LoadConfig::default(),
            };
            Fixture { dir, config }
        }

        fn input(&self, json: &str) -> std::path::PathBuf {
            let path = self.dir.path().join("listings.json");
            fs::write(&path, json).unwrap();
            path
        }

        fn db(&self) -> Connection {
            Connection::open(&self.config.store.database_path).unwrap()
        }
    }

    const SCENARIO: &str = r#"[{"Address":"1 Main St","SQFT_Total":"900 sqft","Year_Built":null,"Valuation":[{"List_Price":100000}],"HOA":[],"Rehab":null}]"#;

    #[test]
    fn test_end_to_end_scenario() {
        let fixture = Fixture::new();
        let input = fixture.input(SCENARIO);

        let summary = run(&input, &fixture.config).unwrap();

        assert_eq!(
            summary.counts,
            Some(TableCounts { properties: 1, valuations: 1, hoa: 0, rehab: 0 })
        );

        let db = fixture.db();
        let (sqft_total, year_built): (i64, i64) = db
            .query_row(
                "SELECT sqft_total, year_built FROM properties WHERE address = '1 Main St'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(sqft_total, 900);
        assert_eq!(year_built, 0);

        let (list_price, others_null): (i64, bool) = db
            .query_row(
                "SELECT list_price,
                        zestimate IS NULL AND rent_zestimate IS NULL AND redfin_value IS NULL
                        AND expected_rent IS NULL AND previous_rent IS NULL AND arv IS NULL
                        AND low_fmr IS NULL AND high_fmr IS NULL
                 FROM valuations",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(list_price, 100000);
        assert!(others_null);

        println!("✅ End-to-end scenario PASSED");
    }

    #[test]
    fn test_rerun_is_idempotent() {
        let fixture = Fixture::new();
        let input = fixture.input(
            r#"[
                {"Address": "1 Main St", "Valuation": [{"List_Price": 1}], "Rehab": [{"Paint": 2}]},
                {"Address": "1 Main St", "City": "Elsewhere", "HOA": [{"HOA": 3}]},
                {"Address": "2 Elm St", "HOA": [{"HOA": 4, "HOA_Flag": "Yes"}]}
            ]"#,
        );

        let first = run(&input, &fixture.config).unwrap();
        let second = run(&input, &fixture.config).unwrap();

        assert_eq!(first.counts, second.counts);
        assert_eq!(
            first.counts,
            Some(TableCounts { properties: 2, valuations: 1, hoa: 2, rehab: 1 })
        );
        assert_eq!(second.load.properties.inserted, 0);
        assert_eq!(second.load.valuations.inserted, 0);
        assert_eq!(second.load.hoa.inserted, 0);
        assert_eq!(second.load.rehab.inserted, 0);
        assert_eq!(first.normalize.duplicates_collapsed, 1);

        let runs: i64 = fixture
            .db()
            .query_row("SELECT COUNT(*) FROM ingest_runs", [], |row| row.get(0))
            .unwrap();
        assert_eq!(runs, 2);
    }

    #[test]
    fn test_repeated_hoa_entries_are_kept_once_each() {
        let fixture = Fixture::new();
        let input = fixture.input(
            r#"[{"Address": "1 Main St", "HOA": [{"HOA": 0, "HOA_Flag": "No"}, {"HOA": 0, "HOA_Flag": "No"}]}]"#,
        );

        let first = run(&input, &fixture.config).unwrap();
        let second = run(&input, &fixture.config).unwrap();

        assert_eq!(first.load.hoa.inserted, 2);
        assert_eq!(second.load.hoa.inserted, 0);
        assert_eq!(second.counts.map(|c| c.hoa), Some(2));
    }

    #[test]
    fn test_missing_input_touches_nothing() {
        let fixture = Fixture::new();
        let missing = fixture.dir.path().join("nope.json");

        let err = run(&missing, &fixture.config).unwrap_err();

        assert_eq!(err.phase(), "extract");
        assert!(matches!(err, EtlError::Extract(ExtractError::FileNotFound { .. })));
        let tables: i64 = fixture
            .db()
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0, "schema must not be created when extraction fails");
    }

    #[test]
    fn test_malformed_input() {
        let fixture = Fixture::new();
        let input = fixture.input("{ not json");

        let err = run(&input, &fixture.config).unwrap_err();

        assert!(matches!(err, EtlError::Extract(ExtractError::MalformedJson { .. })));
    }

    #[test]
    fn test_connection_failure_aborts_before_extraction() {
        let fixture = Fixture::new();
        let mut config = fixture.config.clone();
        config.store.database_path = fixture.dir.path().join("no_such_dir").join("db.sqlite");

        // Input does not exist either; the connection error must win
        let err = run(&fixture.dir.path().join("nope.json"), &config).unwrap_err();

        assert_eq!(err.phase(), "connect");
        assert!(matches!(err, EtlError::Connection { .. }));
    }

    #[test]
    fn test_rehab_failure_reports_phase_and_rolls_back() {
        let fixture = Fixture::new();
        let input = fixture.input(
            r#"[{"Address": "1 Main St", "Valuation": [{"List_Price": 1}], "Rehab": [{"Paint": 2}]}]"#,
        );
        {
            // Pre-create the schema, then break the rehab table
            let store = SqliteStore::open(&fixture.config.store).unwrap();
            store.setup_schema().unwrap();
            store.connection().execute_batch("DROP TABLE rehab").unwrap();
        }
        let mut config = fixture.config.clone();
        config.store.bootstrap_schema = false;

        let err = run(&input, &config).unwrap_err();

        match &err {
            EtlError::Load(load) => {
                assert_eq!(load.phase, LoadPhase::InsertChildren(ChildTable::Rehab));
            }
            other => panic!("expected load error, got {other:?}"),
        }
        let db = fixture.db();
        let count = |table: &str| -> i64 {
            db.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .unwrap()
        };
        assert_eq!(count("valuations"), 0);
        assert_eq!(count("properties"), 0);
        assert_eq!(count("ingest_runs"), 0);
    }

    #[test]
    fn test_intermediate_commit_leaves_parents() {
        let fixture = Fixture::new();
        let input = fixture.input(
            r#"[{"Address": "1 Main St", "Valuation": [{"List_Price": 1}], "Rehab": [{"Paint": 2}]}]"#,
        );
        {
            let store = SqliteStore::open(&fixture.config.store).unwrap();
            store.setup_schema().unwrap();
            store.connection().execute_batch("DROP TABLE rehab").unwrap();
        }
        let mut config = fixture.config.clone();
        config.store.bootstrap_schema = false;
        config.load.flush_mode = FlushMode::IntermediateCommit;

        assert!(run(&input, &config).is_err());

        let db = fixture.db();
        let properties: i64 = db
            .query_row("SELECT COUNT(*) FROM properties", [], |row| row.get(0))
            .unwrap();
        let valuations: i64 = db
            .query_row("SELECT COUNT(*) FROM valuations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(properties, 1);
        assert_eq!(valuations, 0);
    }
}
