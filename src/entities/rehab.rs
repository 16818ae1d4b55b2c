// Rehab Entity - renovation estimate and per-area flags for a property

use super::{ChildRecord, ChildTable};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RehabEntity {
    #[serde(rename = "Underwriting_Rehab")]
    pub underwriting_rehab: Option<Value>,

    #[serde(rename = "Rehab_Calculation")]
    pub rehab_calculation: Option<Value>,

    #[serde(rename = "Paint")]
    pub paint: Option<Value>,

    #[serde(rename = "Flooring_Flag")]
    pub flooring_flag: Option<Value>,

    #[serde(rename = "Foundation_Flag")]
    pub foundation_flag: Option<Value>,

    #[serde(rename = "Roof_Flag")]
    pub roof_flag: Option<Value>,

    #[serde(rename = "HVAC_Flag")]
    pub hvac_flag: Option<Value>,

    #[serde(rename = "Kitchen_Flag")]
    pub kitchen_flag: Option<Value>,

    #[serde(rename = "Bathroom_Flag")]
    pub bathroom_flag: Option<Value>,

    #[serde(rename = "Appliances_Flag")]
    pub appliances_flag: Option<Value>,

    #[serde(rename = "Windows_Flag")]
    pub windows_flag: Option<Value>,

    #[serde(rename = "Landscaping_Flag")]
    pub landscaping_flag: Option<Value>,

    #[serde(rename = "Trashout_Flag")]
    pub trashout_flag: Option<Value>,
}

impl ChildRecord for RehabEntity {
    const TABLE: ChildTable = ChildTable::Rehab;

    fn values(&self) -> Vec<Option<&Value>> {
        vec![
            self.underwriting_rehab.as_ref(),
            self.rehab_calculation.as_ref(),
            self.paint.as_ref(),
            self.flooring_flag.as_ref(),
            self.foundation_flag.as_ref(),
            self.roof_flag.as_ref(),
            self.hvac_flag.as_ref(),
            self.kitchen_flag.as_ref(),
            self.bathroom_flag.as_ref(),
            self.appliances_flag.as_ref(),
            self.windows_flag.as_ref(),
            self.landscaping_flag.as_ref(),
            self.trashout_flag.as_ref(),
        ]
    }
}
