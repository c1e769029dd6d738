//! Response bodies returned by the Coset node.

use alloy::primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};

use crate::oracle::CostBreakdown;
use crate::CosetError;

/// Settlement info the node may return in the `PAYMENT-RESPONSE` header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<Address>,
    /// Transaction hash, if settlement succeeded. `None` on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    pub network: String,
}

/// Body of `get-data` and `get-data-without-check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse {
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Body of `get-data-update-price`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    #[serde(deserialize_with = "de_u128")]
    pub price: u128,
}

/// Gas portion of the provider's price, denominated in the payment token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodGasFee {
    #[serde(deserialize_with = "de_u128")]
    pub token: u128,
}

/// Provider-reported cost of an update, in token base units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceDetails {
    #[serde(deserialize_with = "de_u128")]
    pub total_cost: u128,
    pub method_gas_fee: MethodGasFee,
    #[serde(deserialize_with = "de_u128")]
    pub provider_amount: u128,
    #[serde(deserialize_with = "de_u128")]
    pub update_price: u128,
}

/// Body of a successful `update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub tx: Option<String>,
    pub price_details: PriceDetails,
}

impl TryFrom<&PriceDetails> for CostBreakdown {
    type Error = CosetError;

    fn try_from(details: &PriceDetails) -> Result<Self, Self::Error> {
        let platform_fee = details
            .update_price
            .checked_sub(details.provider_amount)
            .ok_or_else(|| {
                CosetError::Protocol(format!(
                    "provider amount {} exceeds update price {}",
                    details.provider_amount, details.update_price
                ))
            })?;
        Ok(CostBreakdown {
            total: details.total_cost,
            gas_fee: details.method_gas_fee.token,
            platform_fee,
            data_provider_fee: details.provider_amount,
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

/// Accept an unsigned integer either as a JSON number or a decimal string.
/// Chain values usually arrive as strings because they overflow JS numbers.
pub fn de_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(u128::from(n)),
        NumberOrString::String(s) => s
            .trim()
            .parse::<u128>()
            .map_err(|e| serde::de::Error::custom(format!("invalid amount {s:?}: {e}"))),
    }
}

/// Same as [`de_u128`] for values that must fit in 64 bits (seconds, timestamps).
pub fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = de_u128(deserializer)?;
    u64::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("value {value} does not fit in u64")))
}
