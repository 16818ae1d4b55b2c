// ⚙️ Configuration - defaults → TOML file → environment → CLI

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_FILE: &str = "property_etl.toml";
pub const CONFIG_PATH_VAR: &str = "PROPERTY_ETL_CONFIG";

// ============================================================================
// STORE
// ============================================================================

/// Connection parameters for the SQLite store
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database_path: PathBuf,
    pub create_if_missing: bool,
    pub busy_timeout_ms: u64,
    /// Create the tables if they do not exist yet
    pub bootstrap_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_path: PathBuf::from("property_db.sqlite"),
            create_if_missing: true,
            busy_timeout_ms: 5000,
            bootstrap_schema: true,
        }
    }
}

// ============================================================================
// LOAD
// ============================================================================

/// How parent rows are made visible before their ids are read back
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    /// Parents stay in the load transaction; any failure undoes the whole run
    #[default]
    Transactional,

    /// Parents are committed before ids are resolved; a later failure only
    /// rolls back child rows and the run ledger entry
    IntermediateCommit,
}

impl FromStr for FlushMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "transactional" => Ok(FlushMode::Transactional),
            "intermediate_commit" | "intermediate-commit" => Ok(FlushMode::IntermediateCommit),
            other => bail!(
                "unknown flush mode '{other}' (expected transactional or intermediate_commit)"
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub flush_mode: FlushMode,
}

// ============================================================================
// ETL CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    pub input_path: Option<PathBuf>,
    pub store: StoreConfig,
    pub load: LoadConfig,
}

impl EtlConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&contents).with_context(|| format!("in '{}'", path.display()))
    }

    /// Defaults, then the config file (if any), then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            Err(_) => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `PROPERTY_ETL_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(input) = lookup("PROPERTY_ETL_INPUT") {
            self.input_path = Some(PathBuf::from(input));
        }
        if let Some(database) = lookup("PROPERTY_ETL_DATABASE") {
            self.store.database_path = PathBuf::from(database);
        }
        if let Some(timeout) = lookup("PROPERTY_ETL_BUSY_TIMEOUT_MS") {
            self.store.busy_timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| {
                    format!("PROPERTY_ETL_BUSY_TIMEOUT_MS is not a number: '{timeout}'")
                })?;
        }
        if let Some(create) = lookup("PROPERTY_ETL_CREATE_DB") {
            self.store.create_if_missing = matches!(create.trim(), "1" | "true" | "TRUE" | "True");
        }
        if let Some(mode) = lookup("PROPERTY_ETL_FLUSH_MODE") {
            self.load.flush_mode = mode.parse()?;
        }
        Ok(())
    }

    pub fn input_path(&self) -> Result<&Path> {
        match &self.input_path {
            Some(path) => Ok(path.as_path()),
            None => bail!("no input file given (pass a path or set PROPERTY_ETL_INPUT)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EtlConfig::default();

        assert_eq!(config.input_path, None);
        assert_eq!(config.store.database_path, PathBuf::from("property_db.sqlite"));
        assert!(config.store.create_if_missing);
        assert!(config.store.bootstrap_schema);
        assert_eq!(config.load.flush_mode, FlushMode::Transactional);
        assert!(config.input_path().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EtlConfig::from_toml_str(
            r#"
            input_path = "data/listings.json"

            [store]
            database_path = "/var/lib/etl/property.sqlite"

            [load]
            flush_mode = "intermediate_commit"
            "#,
        )
        .unwrap();

        assert_eq!(config.input_path().unwrap(), Path::new("data/listings.json"));
        assert_eq!(config.store.database_path, PathBuf::from("/var/lib/etl/property.sqlite"));
        assert_eq!(config.store.busy_timeout_ms, 5000);
        assert_eq!(config.load.flush_mode, FlushMode::IntermediateCommit);
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = EtlConfig::from_toml_str("input_path = \"from_file.json\"").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("PROPERTY_ETL_INPUT", "from_env.json"),
            ("PROPERTY_ETL_BUSY_TIMEOUT_MS", "250"),
            ("PROPERTY_ETL_CREATE_DB", "false"),
            ("PROPERTY_ETL_FLUSH_MODE", "intermediate-commit"),
        ]);

        config.apply_env(|key| env.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.input_path().unwrap(), Path::new("from_env.json"));
        assert_eq!(config.store.busy_timeout_ms, 250);
        assert!(!config.store.create_if_missing);
        assert_eq!(config.load.flush_mode, FlushMode::IntermediateCommit);
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = EtlConfig::default();

        assert!(config
            .apply_env(|key| (key == "PROPERTY_ETL_BUSY_TIMEOUT_MS").then(|| "soon".to_string()))
            .is_err());
        assert!(config
            .apply_env(|key| (key == "PROPERTY_ETL_FLUSH_MODE").then(|| "eventually".to_string()))
            .is_err());
    }

    #[test]
    fn test_unknown_toml_type_is_error() {
        assert!(EtlConfig::from_toml_str("[store]\nbusy_timeout_ms = \"fast\"").is_err());
    }
}
