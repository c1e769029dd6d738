use alloy::primitives::{Address, FixedBytes};
use serde::{Deserialize, Serialize};

/// Core payment data that gets signed via EIP-712.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentData {
    pub from: Address,
    pub to: Address,
    pub value: String,
    pub token: Address,
    pub valid_after: u64,
    pub valid_before: u64,
    pub nonce: FixedBytes<32>,
    pub signature: String,
}

/// Wire-format payment payload (sent in PAYMENT-SIGNATURE header, base64-encoded JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub payload: PaymentData,
}

/// EIP-712 domain overrides a node may attach to its requirements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentExtra {
    pub name: String,
    pub version: String,
}

/// A single entry in the `accepts` array of a 402 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub asset: Address,
    /// Amount in token base units, as a decimal string.
    pub amount: String,
    pub pay_to: Address,
    pub max_timeout_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<PaymentExtra>,
}

/// The 402 response body returned by the Coset node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredBody {
    pub x402_version: u32,
    pub accepts: Vec<PaymentRequirements>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
