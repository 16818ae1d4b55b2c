// ⚠️ Error taxonomy for an ETL run
// Every failure carries the phase it happened in, so the caller can report it precisely.

use crate::entities::ChildTable;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// EXTRACTION
// ============================================================================

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("JSON file not found at {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "could not decode JSON in {} (expected an array of objects): {source}",
        .path.display()
    )]
    MalformedJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// ============================================================================
// STORE
// ============================================================================

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("no open transaction to {0}")]
    NoTransaction(&'static str),
}

// ============================================================================
// LOAD
// ============================================================================

/// Step of the load state machine that was running when a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Begin,
    InsertParents,
    Flush,
    ResolveIdentifiers,
    InsertChildren(ChildTable),
    RecordRun,
    Commit,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Begin => write!(f, "begin transaction"),
            LoadPhase::InsertParents => write!(f, "insert into 'properties'"),
            LoadPhase::Flush => write!(f, "flush parent rows"),
            LoadPhase::ResolveIdentifiers => write!(f, "resolve property ids"),
            LoadPhase::InsertChildren(table) => write!(f, "insert into '{}'", table.as_str()),
            LoadPhase::RecordRun => write!(f, "record run in ledger"),
            LoadPhase::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Error, Debug)]
#[error("load failed during {phase}: {source}")]
pub struct LoadError {
    pub phase: LoadPhase,
    #[source]
    pub source: StoreError,
}

impl LoadError {
    pub fn new(phase: LoadPhase, source: StoreError) -> Self {
        LoadError { phase, source }
    }
}

// ============================================================================
// RUN
// ============================================================================

/// The single aggregated failure of a run
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("database connection failed ({}): {source}", .path.display())]
    Connection {
        path: PathBuf,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("schema setup failed: {0}")]
    Schema(#[source] StoreError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

impl EtlError {
    /// Short tag naming the run phase that failed
    pub fn phase(&self) -> &'static str {
        match self {
            EtlError::Connection { .. } => "connect",
            EtlError::Extract(_) => "extract",
            EtlError::Schema(_) => "schema",
            EtlError::Load(_) => "load",
        }
    }
}
