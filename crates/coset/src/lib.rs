//! Core types for the Coset oracle client.
//!
//! A Coset oracle is an on-chain contract that publishes data together with
//! freshness metadata. Reading is free; refreshing is bought per request over
//! HTTP 402 (x402) with an EIP-712 signed payment authorization.
//!
//! This crate holds everything that does not need a signer or an orchestrator:
//!
//! - Network and token table ([`Network`], [`PaymentToken`], [`TokenRegistry`], [`OracleReference`])
//! - Freshness decision ([`staleness::is_stale`])
//! - Local spend accounting ([`SpendGuard`])
//! - Payment challenge handling ([`PaymentChallenge`] → [`FundedChallenge`] → [`Authorization`])
//! - Remote state access ([`OracleAccessor`], [`HttpAccessor`], [`ChainAccessor`])
//!
//! The orchestrating client lives in the `coset-client` crate.

// Core types and traits
pub mod constants;
pub mod error;
pub mod network;
pub mod oracle;
pub mod payment;
pub mod response;
pub mod scheme;

// Decisions and accounting
pub mod spend;
pub mod staleness;

// Payment negotiation building blocks
pub mod challenge;
pub mod eip712;

// Remote state
pub mod accessor;
pub mod chain_accessor;
pub mod http_accessor;

use alloy::sol;

// EIP-712 struct for payment authorizations.
// The sol! macro derives SolStruct which provides eip712_signing_hash().
sol! {
    #[derive(Debug, serde::Serialize, serde::Deserialize)]
    struct PaymentAuthorization {
        address from;
        address to;
        uint256 value;
        address token;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

// Oracle contract surface read by the on-chain accessor.
sol! {
    #[sol(rpc)]
    interface IOracle {
        function recommendedUpdateDuration() external view returns (uint256);
        function lastUpdateTimestamp() external view returns (uint256);
        function dataUpdatePrice() external view returns (uint256);
        function getData() external view returns (bytes memory);
        function getDataWithoutCheck() external view returns (bytes memory);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
    }
}

// Re-exports
pub use constants::*;
pub use error::CosetError;
pub use network::{
    Network, PaymentToken, TokenInfo, TokenRegistry, CRONOS_USDC, MANTLE_USDC, USDC_DECIMALS,
};
pub use oracle::*;
pub use payment::*;
pub use response::*;
pub use scheme::SchemeClient;

pub use accessor::OracleAccessor;
pub use chain_accessor::ChainAccessor;
pub use challenge::{decode_payment, encode_payment, Authorization, FundedChallenge, PaymentChallenge};
pub use http_accessor::HttpAccessor;
pub use spend::{SpendGuard, SpendLimit, SpendState};
