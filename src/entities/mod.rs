// Entity Models
// One parent (property, keyed by address) and three child kinds owned by it.
//
// Each child kind:
// - maps 1:1 from a nested JSON object (missing keys stay null)
// - knows its table and column order
// - is attached to a store-assigned property id before insertion

pub mod hoa;
pub mod property;
pub mod rehab;
pub mod valuation;

pub use hoa::HoaEntity;
pub use property::PropertyEntity;
pub use rehab::RehabEntity;
pub use valuation::ValuationEntity;

use serde_json::Value;

// ============================================================================
// CHILD TABLES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildTable {
    Valuations,
    Hoa,
    Rehab,
}

impl ChildTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChildTable::Valuations => "valuations",
            ChildTable::Hoa => "hoa",
            ChildTable::Rehab => "rehab",
        }
    }

    /// Store columns after `property_id`, in insertion order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            ChildTable::Valuations => &[
                "list_price",
                "zestimate",
                "rent_zestimate",
                "redfin_value",
                "expected_rent",
                "previous_rent",
                "arv",
                "low_fmr",
                "high_fmr",
            ],
            ChildTable::Hoa => &["hoa_fee", "hoa_flag"],
            ChildTable::Rehab => &[
                "underwriting_rehab",
                "rehab_calculation",
                "paint",
                "flooring_flag",
                "foundation_flag",
                "roof_flag",
                "hvac_flag",
                "kitchen_flag",
                "bathroom_flag",
                "appliances_flag",
                "windows_flag",
                "landscaping_flag",
                "trashout_flag",
            ],
        }
    }
}

/// A child entity that can be written as one row of its table
pub trait ChildRecord {
    const TABLE: ChildTable;

    /// Field values in the order of `TABLE.columns()`
    fn values(&self) -> Vec<Option<&Value>>;
}

/// A child entity paired with the id of the property that owns it
#[derive(Debug, Clone, Copy)]
pub struct Attached<'a, T> {
    pub property_id: i64,
    pub entity: &'a T,
}

impl<'a, T: ChildRecord> Attached<'a, T> {
    pub fn new(property_id: i64, entity: &'a T) -> Self {
        Attached { property_id, entity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_line_up_with_columns() {
        let valuation = ValuationEntity::default();
        let hoa = HoaEntity::default();
        let rehab = RehabEntity::default();

        assert_eq!(valuation.values().len(), ChildTable::Valuations.columns().len());
        assert_eq!(hoa.values().len(), ChildTable::Hoa.columns().len());
        assert_eq!(rehab.values().len(), ChildTable::Rehab.columns().len());
    }
}
