use alloy::primitives::Address;
use serde::de::DeserializeOwned;
use url::Url;

use crate::accessor::OracleAccessor;
use crate::network::Network;
use crate::oracle::{OracleReference, TokenBalance, UpdateMetadata};
use crate::response::{DataResponse, PriceResponse};
use crate::CosetError;

/// [`OracleAccessor`] over the Coset node's JSON endpoints.
///
/// Every request carries `networkName` and `oracleAddress` as query
/// parameters; `get-balance` adds `ownerAddress` and `tokenAddress`.
#[derive(Debug, Clone)]
pub struct HttpAccessor {
    http: reqwest::Client,
    base_url: Url,
    network: Network,
    oracle_address: Address,
}

impl HttpAccessor {
    pub fn new(base_url: &str, oracle: &OracleReference) -> Result<Self, CosetError> {
        Self::with_http_client(base_url, oracle, reqwest::Client::new())
    }

    /// Use a preconfigured client (timeouts, proxies, shared connection pool).
    pub fn with_http_client(
        base_url: &str,
        oracle: &OracleReference,
        http: reqwest::Client,
    ) -> Result<Self, CosetError> {
        Ok(Self {
            http,
            base_url: parse_base_url(base_url)?,
            network: oracle.network(),
            oracle_address: oracle.address(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn send(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<reqwest::Response, CosetError> {
        let url = endpoint(&self.base_url, path)?;
        let mut query = vec![
            ("networkName", self.network.to_string()),
            ("oracleAddress", self.oracle_address.to_string()),
        ];
        query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        tracing::debug!(%url, "GET");
        self.http
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|e| CosetError::transport(path, e))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<T, CosetError> {
        let resp = self.send(path, extra).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CosetError::Http {
                status: status.as_u16(),
                body,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| CosetError::Protocol(format!("{path}: malformed response: {e}")))
    }
}

impl OracleAccessor for HttpAccessor {
    async fn get_balance(&self, owner: Address, token: Address) -> Result<TokenBalance, CosetError> {
        self.get_json(
            "get-balance",
            &[
                ("ownerAddress", owner.to_string()),
                ("tokenAddress", token.to_string()),
            ],
        )
        .await
    }

    async fn get_update_metadata(&self) -> Result<UpdateMetadata, CosetError> {
        self.get_json("get-update-metadata", &[]).await
    }

    async fn get_data_without_check(&self) -> Result<serde_json::Value, CosetError> {
        let resp: DataResponse = self.get_json("get-data-without-check", &[]).await?;
        Ok(resp.data)
    }

    async fn get_data(&self) -> Result<serde_json::Value, CosetError> {
        let resp = self.send("get-data", &[]).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CosetError::StaleData(format!("{status}: {body}")));
        }
        let resp: DataResponse = resp
            .json()
            .await
            .map_err(|e| CosetError::Protocol(format!("get-data: malformed response: {e}")))?;
        Ok(resp.data)
    }

    async fn get_update_price(&self) -> Result<u128, CosetError> {
        let resp: PriceResponse = self.get_json("get-data-update-price", &[]).await?;
        Ok(resp.price)
    }
}

/// Parse an API base URL, making sure relative endpoints resolve beneath it.
pub fn parse_base_url(base_url: &str) -> Result<Url, CosetError> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| CosetError::Config(format!("invalid API url {base_url:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CosetError::Config(format!(
            "API url must be http(s): {base_url}"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve an endpoint name against the base URL.
pub fn endpoint(base_url: &Url, path: &str) -> Result<Url, CosetError> {
    base_url
        .join(path)
        .map_err(|e| CosetError::Config(format!("invalid endpoint {path:?}: {e}")))
}
