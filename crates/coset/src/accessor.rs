//! Read-only access to remote oracle state.
//!
//! Two implementations ship with this crate: [`crate::HttpAccessor`] talks to
//! the Coset node's JSON endpoints, [`crate::ChainAccessor`] reads the oracle
//! contract directly over JSON-RPC.

use alloy::primitives::Address;

use crate::error::CosetError;
use crate::oracle::{TokenBalance, UpdateMetadata};

/// Remote reads the update pipeline depends on. None of these have side effects.
pub trait OracleAccessor: Send + Sync {
    /// Token balance of `owner` for the token contract at `token`.
    fn get_balance(
        &self,
        owner: Address,
        token: Address,
    ) -> impl std::future::Future<Output = Result<TokenBalance, CosetError>> + Send;

    /// Recommended refresh interval and last update time.
    fn get_update_metadata(
        &self,
    ) -> impl std::future::Future<Output = Result<UpdateMetadata, CosetError>> + Send;

    /// Latest data, whether or not it is fresh.
    fn get_data_without_check(
        &self,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, CosetError>> + Send;

    /// Latest data, failing with [`CosetError::StaleData`] when the provider
    /// refuses to serve stale data.
    fn get_data(
        &self,
    ) -> impl std::future::Future<Output = Result<serde_json::Value, CosetError>> + Send;

    /// Current price of one update, in payment token base units.
    fn get_update_price(&self)
        -> impl std::future::Future<Output = Result<u128, CosetError>> + Send;
}
