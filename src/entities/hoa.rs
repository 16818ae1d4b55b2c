// HOA Entity - fee record for a property

use super::{ChildRecord, ChildTable};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HoaEntity {
    /// Stored as `hoa_fee`
    #[serde(rename = "HOA")]
    pub hoa_fee: Option<Value>,

    #[serde(rename = "HOA_Flag")]
    pub hoa_flag: Option<Value>,
}

impl ChildRecord for HoaEntity {
    const TABLE: ChildTable = ChildTable::Hoa;

    fn values(&self) -> Vec<Option<&Value>> {
        vec![self.hoa_fee.as_ref(), self.hoa_flag.as_ref()]
    }
}
