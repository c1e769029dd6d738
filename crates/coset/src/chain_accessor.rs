use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;

use crate::accessor::OracleAccessor;
use crate::oracle::{OracleReference, TokenBalance, UpdateMetadata};
use crate::{CosetError, IOracle, IERC20};

/// [`OracleAccessor`] reading the oracle contract directly through an alloy provider.
///
/// `getData()` reverts when the oracle considers its data stale; any failure
/// of that call is reported as [`CosetError::StaleData`].
pub struct ChainAccessor<P> {
    provider: P,
    oracle: Address,
    token_decimals: u32,
}

impl<P: Provider> ChainAccessor<P> {
    pub fn new(provider: P, oracle: &OracleReference) -> Self {
        Self {
            provider,
            oracle: oracle.address(),
            token_decimals: oracle.token_decimals(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: Provider + Send + Sync> OracleAccessor for ChainAccessor<P> {
    async fn get_balance(&self, owner: Address, token: Address) -> Result<TokenBalance, CosetError> {
        let contract = IERC20::new(token, &self.provider);
        let balance = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| CosetError::Network(format!("balanceOf failed: {e}")))?;
        Ok(TokenBalance::from_units(balance, self.token_decimals))
    }

    async fn get_update_metadata(&self) -> Result<UpdateMetadata, CosetError> {
        let contract = IOracle::new(self.oracle, &self.provider);
        let duration = contract.recommendedUpdateDuration();
        let last_update = contract.lastUpdateTimestamp();
        let (duration, last_update) = tokio::join!(duration.call(), last_update.call());
        let duration = duration
            .map_err(|e| CosetError::Network(format!("recommendedUpdateDuration failed: {e}")))?;
        let last_update = last_update
            .map_err(|e| CosetError::Network(format!("lastUpdateTimestamp failed: {e}")))?;
        Ok(UpdateMetadata {
            recommended_update_duration: to_u64(duration, "recommendedUpdateDuration")?,
            last_update_timestamp: to_u64(last_update, "lastUpdateTimestamp")?,
        })
    }

    async fn get_data_without_check(&self) -> Result<serde_json::Value, CosetError> {
        let contract = IOracle::new(self.oracle, &self.provider);
        let raw = contract
            .getDataWithoutCheck()
            .call()
            .await
            .map_err(|e| CosetError::Network(format!("getDataWithoutCheck failed: {e}")))?;
        Ok(decode_data(&raw))
    }

    async fn get_data(&self) -> Result<serde_json::Value, CosetError> {
        let contract = IOracle::new(self.oracle, &self.provider);
        let raw = contract
            .getData()
            .call()
            .await
            .map_err(|e| CosetError::StaleData(format!("getData reverted: {e}")))?;
        Ok(decode_data(&raw))
    }

    async fn get_update_price(&self) -> Result<u128, CosetError> {
        let contract = IOracle::new(self.oracle, &self.provider);
        let price = contract
            .dataUpdatePrice()
            .call()
            .await
            .map_err(|e| CosetError::Network(format!("dataUpdatePrice failed: {e}")))?;
        price
            .try_into()
            .map_err(|_| CosetError::Protocol(format!("dataUpdatePrice {price} overflows u128")))
    }
}

fn to_u64(value: U256, field: &str) -> Result<u64, CosetError> {
    value
        .try_into()
        .map_err(|_| CosetError::Protocol(format!("{field} {value} overflows u64")))
}

/// Oracle payloads are JSON documents stored as bytes. Anything that does not
/// parse as JSON is returned as a 0x-prefixed hex string.
fn decode_data(raw: &Bytes) -> serde_json::Value {
    if raw.is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(raw)
        .unwrap_or_else(|_| serde_json::Value::String(format!("0x{}", alloy::hex::encode(raw))))
}
