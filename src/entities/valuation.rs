// Valuation Entity - one point of a property's valuation history

use super::{ChildRecord, ChildTable};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValuationEntity {
    #[serde(rename = "List_Price")]
    pub list_price: Option<Value>,

    #[serde(rename = "Zestimate")]
    pub zestimate: Option<Value>,

    #[serde(rename = "Rent_Zestimate")]
    pub rent_zestimate: Option<Value>,

    #[serde(rename = "Redfin_Value")]
    pub redfin_value: Option<Value>,

    #[serde(rename = "Expected_Rent")]
    pub expected_rent: Option<Value>,

    #[serde(rename = "Previous_Rent")]
    pub previous_rent: Option<Value>,

    #[serde(rename = "ARV")]
    pub arv: Option<Value>,

    #[serde(rename = "Low_FMR")]
    pub low_fmr: Option<Value>,

    #[serde(rename = "High_FMR")]
    pub high_fmr: Option<Value>,
}

impl ChildRecord for ValuationEntity {
    const TABLE: ChildTable = ChildTable::Valuations;

    fn values(&self) -> Vec<Option<&Value>> {
        vec![
            self.list_price.as_ref(),
            self.zestimate.as_ref(),
            self.rent_zestimate.as_ref(),
            self.redfin_value.as_ref(),
            self.expected_rent.as_ref(),
            self.previous_rent.as_ref(),
            self.arv.as_ref(),
            self.low_fmr.as_ref(),
            self.high_fmr.as_ref(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_stay_null() {
        let valuation: ValuationEntity =
            serde_json::from_value(json!({ "List_Price": 100000, "Extra": "ignored" })).unwrap();

        assert_eq!(valuation.list_price, Some(json!(100000)));
        assert_eq!(valuation.zestimate, None);
        assert_eq!(valuation.values().iter().filter(|v| v.is_some()).count(), 1);
    }
}
