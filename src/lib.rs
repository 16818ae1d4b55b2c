// Property ETL - Core Library
// JSON property listings → properties / valuations / hoa / rehab tables

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod extract;
pub mod loader;
pub mod logging;
pub mod normalize;
pub mod pipeline;

// Re-export commonly used types
pub use config::{EtlConfig, FlushMode, LoadConfig, StoreConfig};
pub use db::{setup_database, table_counts, IngestRun, SqliteStore, TableCounts};
pub use entities::{
    Attached, ChildRecord, ChildTable,
    HoaEntity, PropertyEntity, RehabEntity, ValuationEntity,
};
pub use error::{EtlError, ExtractError, LoadError, LoadPhase, StoreError};
pub use extract::{extract, SourceRecord, SourceTable};
pub use loader::{LoadReport, Loader, PropertyStore, TableLoad};
pub use normalize::{normalize, NormalizeStats, NormalizedBatch, RecordChildren};
pub use pipeline::{run, RunSummary};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
