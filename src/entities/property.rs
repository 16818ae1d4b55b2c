// Property Entity - the parent row, unique by address

use crate::normalize::{de_int, de_natural_key, de_sqft, de_text};
use serde::Deserialize;

/// One row of `properties`, read leniently from a source record.
///
/// Numeric fields never come out null: missing or unparseable values become 0
/// because the store columns are non-nullable integers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PropertyEntity {
    /// Natural key. Records without a usable address fail to deserialize.
    #[serde(rename = "Address", deserialize_with = "de_natural_key")]
    pub address: String,

    #[serde(rename = "Street_Address", default, deserialize_with = "de_text")]
    pub street_address: Option<String>,

    #[serde(rename = "City", default, deserialize_with = "de_text")]
    pub city: Option<String>,

    #[serde(rename = "State", default, deserialize_with = "de_text")]
    pub state: Option<String>,

    #[serde(rename = "Zip", default, deserialize_with = "de_text")]
    pub zip: Option<String>,

    #[serde(rename = "Property_Type", default, deserialize_with = "de_text")]
    pub property_type: Option<String>,

    #[serde(rename = "Year_Built", default, deserialize_with = "de_int")]
    pub year_built: i64,

    #[serde(rename = "SQFT_MU", default, deserialize_with = "de_int")]
    pub sqft_mu: i64,

    #[serde(rename = "SQFT_Total", default, deserialize_with = "de_sqft")]
    pub sqft_total: i64,

    #[serde(rename = "Bed", default, deserialize_with = "de_int")]
    pub beds: i64,

    #[serde(rename = "Bath", default, deserialize_with = "de_int")]
    pub baths: i64,
}

impl PropertyEntity {
    /// Property with only an address; every other attribute at its default
    pub fn new(address: impl Into<String>) -> Self {
        PropertyEntity {
            address: address.into(),
            street_address: None,
            city: None,
            state: None,
            zip: None,
            property_type: None,
            year_built: 0,
            sqft_mu: 0,
            sqft_total: 0,
            beds: 0,
            baths: 0,
        }
    }
}
