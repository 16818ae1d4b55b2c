// 📂 Extractor - JSON file → in-memory table of source records

use crate::error::ExtractError;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

// ============================================================================
// SOURCE TABLE
// ============================================================================

/// One denormalized JSON object from the input file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    fields: Value,
}

impl SourceRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        SourceRecord {
            fields: Value::Object(fields),
        }
    }

    /// Value of a column, `None` when the key is absent
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// The whole record as a JSON object
    pub fn as_value(&self) -> &Value {
        &self.fields
    }
}

/// Rows in file order; columns are the union of observed keys in first-seen order
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    pub columns: Vec<String>,
    pub records: Vec<SourceRecord>,
    /// SHA-256 of the file bytes, empty when not built from a file
    pub source_sha256: String,
}

impl SourceTable {
    pub fn from_objects(objects: Vec<Map<String, Value>>) -> Self {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        let mut records = Vec::with_capacity(objects.len());

        for object in objects {
            for key in object.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
            records.push(SourceRecord::new(object));
        }

        SourceTable {
            columns,
            records,
            source_sha256: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Read a UTF-8 JSON array of objects from `path`.
///
/// Only reads the file; nothing downstream is touched on failure.
pub fn extract(path: &Path) -> Result<SourceTable, ExtractError> {
    info!(path = %path.display(), "extracting records");

    let bytes = fs::read(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => ExtractError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ExtractError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })?;

    // from_slice also rejects invalid UTF-8
    let objects: Vec<Map<String, Value>> =
        serde_json::from_slice(&bytes).map_err(|source| ExtractError::MalformedJson {
            path: path.to_path_buf(),
            source,
        })?;

    let mut table = SourceTable::from_objects(objects);
    table.source_sha256 = format!("{:x}", Sha256::digest(&bytes));
    info!(
        records = table.len(),
        columns = table.columns.len(),
        "extracted records"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(contents: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_extract_builds_column_union() {
        let file = write_temp(
            br#"[
                {"Address": "1 Main St", "City": "Austin"},
                {"Address": "2 Main St", "Bed": 3}
            ]"#,
        );

        let table = extract(file.path()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.columns, vec!["Address", "City", "Bed"]);
        assert_eq!(table.records[1].get("Bed"), Some(&Value::from(3)));
        assert_eq!(table.records[1].get("City"), None);
        assert_eq!(table.source_sha256.len(), 64);
    }

    #[test]
    fn test_extract_empty_array() {
        let file = write_temp(b"[]");

        let table = extract(file.path()).unwrap();

        assert!(table.is_empty());
        assert!(table.columns.is_empty());
    }

    #[test]
    fn test_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let err = extract(&path).unwrap_err();

        assert!(matches!(err, ExtractError::FileNotFound { .. }), "got {err:?}");
    }

    #[test]
    fn test_malformed_json() {
        let broken = write_temp(br#"[{"Address": "1 Main St",]"#);
        let not_array = write_temp(br#"{"Address": "1 Main St"}"#);
        let not_objects = write_temp(b"[1, 2, 3]");
        let not_utf8 = write_temp(&[b'[', b'"', 0xff, 0xfe, b'"', b']']);

        for file in [&broken, &not_array, &not_objects, &not_utf8] {
            let err = extract(file.path()).unwrap_err();
            assert!(matches!(err, ExtractError::MalformedJson { .. }), "got {err:?}");
        }
    }

    #[test]
    fn test_directory_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();

        let err = extract(dir.path()).unwrap_err();

        assert!(matches!(err, ExtractError::Unreadable { .. }), "got {err:?}");
    }
}
