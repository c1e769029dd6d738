//! Oracle identity and the values read from or reported about it.

use std::fmt;

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::network::{Network, PaymentToken, TokenInfo, TokenRegistry};
use crate::CosetError;

/// Identifies one oracle endpoint and the token used to pay for its refreshes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleReference {
    network: Network,
    address: Address,
    payment_token: PaymentToken,
    token: TokenInfo,
}

impl OracleReference {
    /// Validate the oracle address and resolve the payment token on `network`.
    pub fn new(
        network: Network,
        oracle_address: &str,
        payment_token: PaymentToken,
        registry: &TokenRegistry,
    ) -> Result<Self, CosetError> {
        let address = parse_address(oracle_address)
            .ok_or_else(|| CosetError::Config("Invalid oracle address".to_string()))?;
        let token = registry.resolve(network, payment_token)?;
        Ok(Self {
            network,
            address,
            payment_token,
            token,
        })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn payment_token(&self) -> PaymentToken {
        self.payment_token
    }

    /// Contract address of the payment token on this network.
    pub fn token_address(&self) -> Address {
        self.token.address
    }

    pub fn token_decimals(&self) -> u32 {
        self.token.decimals
    }
}

/// Parse a `0x`-prefixed 20-byte hex address.
fn parse_address(s: &str) -> Option<Address> {
    let hex = s.trim().strip_prefix("0x")?;
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    hex.parse().ok()
}

/// Freshness metadata published by the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetadata {
    /// Recommended refresh interval in seconds. 0 means no recommendation.
    #[serde(deserialize_with = "crate::response::de_u64")]
    pub recommended_update_duration: u64,
    /// Unix seconds of the last on-chain update.
    #[serde(deserialize_with = "crate::response::de_u64")]
    pub last_update_timestamp: u64,
}

impl UpdateMetadata {
    /// See [`crate::staleness::is_stale`].
    pub fn is_stale_at(&self, now: u64) -> bool {
        crate::staleness::is_stale(self, now)
    }
}

/// An amount of some token in base units plus the decimals needed to show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount {
    pub units: u128,
    pub decimals: u32,
}

impl TokenAmount {
    pub fn new(units: u128, decimals: u32) -> Self {
        Self { units, decimals }
    }

    /// Lossy float value in whole tokens.
    pub fn as_f64(&self) -> f64 {
        self.units as f64 / 10f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for TokenAmount {
    /// Renders whole tokens without trailing zeros, e.g. `1.5` for 1_500_000 at 6 decimals.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(scale) = 10u128.checked_pow(self.decimals) else {
            return write!(f, "{}e-{}", self.units, self.decimals);
        };
        let whole = self.units / scale;
        let frac = self.units % scale;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{:0width$}", frac, width = self.decimals as usize);
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

/// Token balance as reported by the balance accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenBalance {
    /// Base units as a decimal string.
    pub units: String,
    /// Whole tokens, for display only.
    pub amount: f64,
}

impl TokenBalance {
    pub fn from_units(units: U256, decimals: u32) -> Self {
        let units = units.to_string();
        let amount = units.parse::<f64>().unwrap_or(0.0) / 10f64.powi(decimals as i32);
        Self { units, amount }
    }

    /// Base units as an integer; a malformed string is a protocol error.
    pub fn units(&self) -> Result<U256, CosetError> {
        self.units
            .trim()
            .parse::<U256>()
            .map_err(|e| CosetError::Protocol(format!("invalid balance units {:?}: {e}", self.units)))
    }
}

/// What an update cost, in token base units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub total: u128,
    pub gas_fee: u128,
    pub platform_fee: u128,
    pub data_provider_fee: u128,
}

impl CostBreakdown {
    /// The breakdown reported on every failed update.
    pub const ZERO: CostBreakdown = CostBreakdown {
        total: 0,
        gas_fee: 0,
        platform_fee: 0,
        data_provider_fee: 0,
    };
}

/// Options for a paid update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Bypass the spending limit.
    #[serde(default)]
    pub force: bool,
}

impl UpdateOptions {
    pub fn forced() -> Self {
        Self { force: true }
    }
}

/// Result of a read. `status == false` means `data` is absent and `message` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadResult {
    pub status: bool,
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_formatted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_update_duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_update_recommended: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReadResult {
    /// Data together with the metadata it was read alongside.
    pub fn with_metadata(data: serde_json::Value, metadata: &UpdateMetadata, now: u64) -> Self {
        Self {
            status: true,
            data: Some(data),
            last_update_timestamp: Some(metadata.last_update_timestamp),
            last_update_formatted: format_timestamp(metadata.last_update_timestamp),
            recommended_update_duration: Some(metadata.recommended_update_duration),
            is_update_recommended: Some(metadata.is_stale_at(now)),
            message: None,
        }
    }

    /// Data with no metadata attached (e.g. straight from a refresh).
    pub fn data_only(data: Option<serde_json::Value>) -> Self {
        Self {
            status: true,
            data,
            last_update_timestamp: None,
            last_update_formatted: None,
            recommended_update_duration: None,
            is_update_recommended: None,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: false,
            data: None,
            last_update_timestamp: None,
            last_update_formatted: None,
            recommended_update_duration: None,
            is_update_recommended: None,
            message: Some(message.into()),
        }
    }
}

fn format_timestamp(ts: u64) -> Option<String> {
    let secs = i64::try_from(ts).ok()?;
    chrono::DateTime::from_timestamp(secs, 0).map(|dt| dt.to_rfc3339())
}

/// Result of an update. A failed update always carries [`CostBreakdown::ZERO`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub status: bool,
    pub spent: CostBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl UpdateResult {
    pub fn succeeded(
        spent: CostBreakdown,
        data: Option<serde_json::Value>,
        tx: Option<String>,
    ) -> Self {
        Self {
            status: true,
            spent,
            data,
            tx,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: false,
            spent: CostBreakdown::ZERO,
            data: None,
            tx: None,
            message: Some(message.into()),
        }
    }
}

/// Outcome of a strict read: the data was fresh, had to be refreshed, or
/// could not be obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Fresh(ReadResult),
    Refreshed(UpdateResult),
    Failed(String),
}

impl ReadOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            ReadOutcome::Fresh(r) => r.status,
            ReadOutcome::Refreshed(u) => u.status,
            ReadOutcome::Failed(_) => false,
        }
    }

    /// Fold into a single read contract. A failed refresh becomes a failed
    /// read carrying the update's message.
    pub fn into_read_result(self) -> ReadResult {
        match self {
            ReadOutcome::Fresh(read) => read,
            ReadOutcome::Refreshed(update) if update.status => ReadResult::data_only(update.data),
            ReadOutcome::Refreshed(update) => ReadResult::failed(
                update
                    .message
                    .unwrap_or_else(|| "update failed".to_string()),
            ),
            ReadOutcome::Failed(message) => ReadResult::failed(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MANTLE_USDC;

    const ORACLE: &str = "0x0000000000000000000000000000000000000001";

    #[test]
    fn oracle_reference_resolves_token() {
        let oracle = OracleReference::new(
            Network::Mantle,
            ORACLE,
            PaymentToken::Usdc,
            &TokenRegistry::builtin(),
        )
        .unwrap();
        assert_eq!(oracle.token_address(), MANTLE_USDC);
        assert_eq!(oracle.address(), Address::with_last_byte(1));
        assert_eq!(oracle.token_decimals(), 6);
    }

    #[test]
    fn oracle_reference_rejects_bad_addresses() {
        let registry = TokenRegistry::builtin();
        for bad in ["", "0x", "0x1234", "1234567890123456789012345678901234567890", "0xZZ00000000000000000000000000000000000001"] {
            let err = OracleReference::new(Network::Mantle, bad, PaymentToken::Usdc, &registry)
                .unwrap_err();
            assert_eq!(err.to_string(), "config error: Invalid oracle address");
        }
    }

    #[test]
    fn oracle_reference_rejects_unsupported_token() {
        let err = OracleReference::new(
            Network::CronosTestnet,
            ORACLE,
            PaymentToken::Usdc,
            &TokenRegistry::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, CosetError::Config(_)));
    }

    #[test]
    fn token_amount_display() {
        assert_eq!(TokenAmount::new(1_500_000, 6).to_string(), "1.5");
        assert_eq!(TokenAmount::new(2_000_000, 6).to_string(), "2");
        assert_eq!(TokenAmount::new(1, 6).to_string(), "0.000001");
        assert_eq!(TokenAmount::new(42, 0).to_string(), "42");
        assert!((TokenAmount::new(250_000, 6).as_f64() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn balance_units_parse() {
        let balance = TokenBalance::from_units(U256::from(5_000_000u64), 6);
        assert_eq!(balance.units, "5000000");
        assert!((balance.amount - 5.0).abs() < f64::EPSILON);
        assert_eq!(balance.units().unwrap(), U256::from(5_000_000u64));

        let bad = TokenBalance {
            units: "five".to_string(),
            amount: 5.0,
        };
        assert!(matches!(bad.units(), Err(CosetError::Protocol(_))));
    }

    #[test]
    fn metadata_accepts_string_numbers() {
        let meta: UpdateMetadata = serde_json::from_value(serde_json::json!({
            "recommendedUpdateDuration": "3600",
            "lastUpdateTimestamp": 1_700_000_000u64,
        }))
        .unwrap();
        assert_eq!(meta.recommended_update_duration, 3600);
        assert_eq!(meta.last_update_timestamp, 1_700_000_000);
    }

    #[test]
    fn read_result_with_metadata() {
        let meta = UpdateMetadata {
            recommended_update_duration: 60,
            last_update_timestamp: 1_700_000_000,
        };
        let read = ReadResult::with_metadata(serde_json::json!({"price": 1}), &meta, 1_700_000_100);
        assert!(read.status);
        assert_eq!(read.is_update_recommended, Some(true));
        assert_eq!(
            read.last_update_formatted.as_deref(),
            Some("2023-11-14T22:13:20+00:00")
        );

        let json = serde_json::to_value(&read).unwrap();
        assert_eq!(json["recommendedUpdateDuration"], 60);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn failed_update_is_zeroed() {
        let result = UpdateResult::failed("Spending limit exceeded");
        assert!(!result.status);
        assert_eq!(result.spent, CostBreakdown::ZERO);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["spent"]["platformFee"], 0);
        assert_eq!(json["message"], "Spending limit exceeded");
    }

    #[test]
    fn read_outcome_folds() {
        let fresh = ReadOutcome::Fresh(ReadResult::data_only(Some(serde_json::json!(1))));
        assert!(fresh.is_success());
        assert_eq!(fresh.into_read_result().data, Some(serde_json::json!(1)));

        let refreshed = ReadOutcome::Refreshed(UpdateResult::succeeded(
            CostBreakdown::ZERO,
            Some(serde_json::json!(2)),
            None,
        ));
        let read = refreshed.into_read_result();
        assert!(read.status);
        assert_eq!(read.data, Some(serde_json::json!(2)));

        let failed_refresh =
            ReadOutcome::Refreshed(UpdateResult::failed("Insufficient token balance for payment"));
        assert!(!failed_refresh.is_success());
        let read = failed_refresh.into_read_result();
        assert!(!read.status);
        assert_eq!(
            read.message.as_deref(),
            Some("Insufficient token balance for payment")
        );

        let failed = ReadOutcome::Failed("network error: down".into()).into_read_result();
        assert!(!failed.status);
        assert!(failed.data.is_none());
    }
}
