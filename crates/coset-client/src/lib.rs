//! Client for Coset on-chain oracles.
//!
//! Reads oracle data for free and pays for refreshes over x402: the update
//! request is answered with 402, the client checks its token balance, signs an
//! EIP-712 payment authorization and retries once with the `PAYMENT-SIGNATURE`
//! header. Spend is tracked locally against an optional limit.
//!
//! # Quick Example
//!
//! ```no_run
//! use coset_client::{ClientConfig, Coset, UpdateOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), coset_client::CosetError> {
//! let config = ClientConfig::from_env()?;
//! let coset = Coset::from_config(&config)?;
//!
//! if let Some(result) = coset.optional_update().await {
//!     println!("refreshed: {} (spent {})", result.status, result.spent.total);
//! }
//! let read = coset.read().await;
//! println!("{:?}", read.data);
//! # let _ = UpdateOptions::forced();
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod negotiation;
mod scheme_client;

pub use client::Coset;
pub use config::ClientConfig;
pub use negotiation::{decode_settlement, PaidResponse, PaymentNegotiator};
pub use scheme_client::CosetSchemeClient;

// Re-export commonly needed types from core
pub use coset::{
    ChainAccessor, ChainConfig, CosetError, CostBreakdown, HttpAccessor, Network, OracleAccessor,
    OracleReference, PaymentToken, ReadOutcome, ReadResult, SchemeClient, SpendLimit, SpendState,
    TokenAmount, TokenRegistry, UpdateMetadata, UpdateOptions, UpdateResult,
};
