//! Shipping-rate API payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use evmarket_core::Vnd;

/// Every response is wrapped as `{code, message, data}`; `code` 200 is success.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Province {
    #[serde(rename = "ProvinceID")]
    pub id: i64,
    #[serde(rename = "ProvinceName")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct District {
    #[serde(rename = "DistrictID")]
    pub id: i64,
    #[serde(rename = "DistrictName")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ward {
    #[serde(rename = "WardCode")]
    pub code: String,
    #[serde(rename = "WardName")]
    pub name: String,
}

/// Delivery address by administrative names, as customers type them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryArea {
    pub province: String,
    pub district: String,
    pub ward: String,
}

/// Codes the fee and lead-time endpoints take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedArea {
    #[serde(rename = "to_district_id")]
    pub district_id: i64,
    #[serde(rename = "to_ward_code")]
    pub ward_code: String,
}

/// Package dimensions in grams and centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Parcel {
    pub weight: u32,
    pub length: u32,
    pub width: u32,
    pub height: u32,
}

impl Parcel {
    /// The parcel every quote is priced for.
    pub const STANDARD: Self = Self {
        weight: 500,
        length: 20,
        width: 15,
        height: 10,
    };
}

#[derive(Debug, Serialize)]
pub(crate) struct FeeRequest<'a> {
    #[serde(flatten)]
    pub area: &'a ResolvedArea,
    #[serde(flatten)]
    pub parcel: Parcel,
    pub service_type_id: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeeResponse {
    pub total: Vnd,
}

#[derive(Debug, Serialize)]
pub(crate) struct LeadTimeRequest<'a> {
    #[serde(flatten)]
    pub area: &'a ResolvedArea,
    pub service_id: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeadTimeResponse {
    /// Unix timestamp of the expected delivery.
    pub leadtime: i64,
}

/// Fee and expected delivery for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingQuote {
    pub fee: Vnd,
    pub expected_delivery: Option<DateTime<Utc>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_request_shape() {
        let area = ResolvedArea {
            district_id: 1454,
            ward_code: "21211".to_string(),
        };
        let request = FeeRequest {
            area: &area,
            parcel: Parcel::STANDARD,
            service_type_id: 2,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "to_district_id": 1454,
                "to_ward_code": "21211",
                "weight": 500,
                "length": 20,
                "width": 15,
                "height": 10,
                "service_type_id": 2
            })
        );
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<Vec<Province>> =
            serde_json::from_str(r#"{"code":400,"message":"Token is not valid","data":null}"#)
                .unwrap();
        assert_eq!(envelope.code, 400);
        assert!(envelope.data.is_none());
    }
}
