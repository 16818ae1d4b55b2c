// 🔍 Normalizer - source table → deduplicated properties + per-record children
// Dedup is stable and first-seen-wins by address, so the first record's
// attribute values are the ones that reach the store.

use crate::entities::{HoaEntity, PropertyEntity, RehabEntity, ValuationEntity};
use crate::extract::SourceTable;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

// ============================================================================
// TYPE COERCION
// ============================================================================

/// Integer coercion for non-nullable numeric columns.
///
/// Absent, null, non-scalar and unparseable values all become 0. Floats and
/// numeric strings are truncated toward zero.
pub fn coerce_int(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_int(s).unwrap_or(0),
        Some(Value::Bool(b)) => i64::from(*b),
        _ => 0,
    }
}

/// `SQFT_Total` coercion: `"1200 sqft"` → 1200, absent or unparseable → 0.
///
/// The suffix match is case-sensitive and only strips a trailing `" sqft"`.
pub fn coerce_sqft(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let number = trimmed.strip_suffix(" sqft").unwrap_or(trimmed).trim();
            parse_int(number).unwrap_or(0)
        }
        other => coerce_int(other),
    }
}

/// Text coercion for string columns; numbers and booleans are rendered as text
pub fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    text.parse::<i64>().ok().or_else(|| {
        text.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f as i64)
    })
}

// serde adapters used by the entity structs

pub(crate) fn de_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_int(value.as_ref()))
}

pub(crate) fn de_sqft<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_sqft(value.as_ref()))
}

pub(crate) fn de_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_text(value.as_ref()))
}

pub(crate) fn de_natural_key<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    coerce_text(value.as_ref())
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| D::Error::custom("Address is missing or not a scalar"))
}

/// Only an actual list is expanded; a lone object, scalar or null yields nothing.
/// List elements that are not objects are dropped.
pub(crate) fn de_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    let mut entities = Vec::with_capacity(items.len());
    for item in items {
        if !item.is_object() {
            debug!(element = %item, "dropping non-object list element");
            continue;
        }
        match serde_json::from_value(item) {
            Ok(entity) => entities.push(entity),
            Err(err) => debug!(error = %err, "dropping unreadable list element"),
        }
    }
    Ok(entities)
}

// ============================================================================
// NORMALIZED OUTPUT
// ============================================================================

/// Child entities found on one source record, keyed by that record's address
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordChildren {
    #[serde(rename = "Address", deserialize_with = "de_natural_key")]
    pub address: String,

    #[serde(rename = "Valuation", default, deserialize_with = "de_list")]
    pub valuations: Vec<ValuationEntity>,

    #[serde(rename = "HOA", default, deserialize_with = "de_list")]
    pub hoa: Vec<HoaEntity>,

    #[serde(rename = "Rehab", default, deserialize_with = "de_list")]
    pub rehab: Vec<RehabEntity>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub records: usize,
    pub duplicates_collapsed: usize,
    pub records_without_address: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// One entity per distinct address, in order of first appearance
    pub properties: Vec<PropertyEntity>,

    /// One entry per keyed source record, in file order (duplicates included)
    pub children: Vec<RecordChildren>,

    pub stats: NormalizeStats,
}

impl NormalizedBatch {
    pub fn valuation_count(&self) -> usize {
        self.children.iter().map(|c| c.valuations.len()).sum()
    }

    pub fn hoa_count(&self) -> usize {
        self.children.iter().map(|c| c.hoa.len()).sum()
    }

    pub fn rehab_count(&self) -> usize {
        self.children.iter().map(|c| c.rehab.len()).sum()
    }
}

// ============================================================================
// NORMALIZATION
// ============================================================================

pub fn normalize(table: &SourceTable) -> NormalizedBatch {
    let mut batch = NormalizedBatch {
        stats: NormalizeStats {
            records: table.len(),
            ..NormalizeStats::default()
        },
        ..NormalizedBatch::default()
    };
    let mut seen = HashSet::new();

    for (index, record) in table.records.iter().enumerate() {
        let property = match PropertyEntity::deserialize(record.as_value()) {
            Ok(property) => property,
            Err(err) => {
                warn!(record = index, error = %err, "skipping record without a usable address");
                batch.stats.records_without_address += 1;
                continue;
            }
        };

        // A record that yields a property always yields its children too
        match RecordChildren::deserialize(record.as_value()) {
            Ok(children) => batch.children.push(children),
            Err(err) => warn!(record = index, error = %err, "skipping children of record"),
        }

        if seen.insert(property.address.clone()) {
            batch.properties.push(property);
        } else {
            debug!(address = %property.address, "collapsing duplicate address");
            batch.stats.duplicates_collapsed += 1;
        }
    }

    info!(
        properties = batch.properties.len(),
        duplicates = batch.stats.duplicates_collapsed,
        skipped = batch.stats.records_without_address,
        valuations = batch.valuation_count(),
        hoa = batch.hoa_count(),
        rehab = batch.rehab_count(),
        "normalized records"
    );

    batch
}
