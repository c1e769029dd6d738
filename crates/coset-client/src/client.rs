use std::sync::{Mutex, MutexGuard};

use alloy::primitives::Address;
use alloy::providers::RootProvider;
use url::Url;

use coset::http_accessor::{endpoint, parse_base_url};
use coset::staleness::{is_stale, unix_now};
use coset::{
    ChainAccessor, ChainConfig, CosetError, CostBreakdown, HttpAccessor, OracleAccessor,
    OracleReference, ReadOutcome, ReadResult, SchemeClient, SpendGuard, SpendLimit, SpendState,
    TokenAmount, UpdateOptions, UpdateResponse, UpdateResult,
};

use crate::config::ClientConfig;
use crate::negotiation::PaymentNegotiator;
use crate::scheme_client::CosetSchemeClient;

/// Client for one Coset oracle.
///
/// Reads are free. Updates are paid for over x402 with the payer key held by
/// the scheme client, gated by a local spending limit and recorded only once
/// the provider reports what they cost.
///
/// One instance tracks one spend total. Calls to [`Coset::update`] on the same
/// instance must not overlap: the limit is checked before the payment and the
/// cost recorded after, so two concurrent updates can both pass the check.
pub struct Coset<A: OracleAccessor, S: SchemeClient> {
    oracle: OracleReference,
    accessor: A,
    negotiator: PaymentNegotiator<S>,
    update_url: Url,
    spend: Mutex<SpendGuard>,
}

impl<A: OracleAccessor, S: SchemeClient> Coset<A, S> {
    /// `api_url` is the Coset node base URL; updates are posted to `<api_url>/update`.
    pub fn new(
        oracle: OracleReference,
        accessor: A,
        scheme: S,
        api_url: &str,
    ) -> Result<Self, CosetError> {
        Self::with_http_client(oracle, accessor, scheme, api_url, reqwest::Client::new())
    }

    /// Same as [`Coset::new`] with a preconfigured reqwest client for paid requests.
    pub fn with_http_client(
        oracle: OracleReference,
        accessor: A,
        scheme: S,
        api_url: &str,
        http: reqwest::Client,
    ) -> Result<Self, CosetError> {
        let update_url = endpoint(&parse_base_url(api_url)?, "update")?;
        let negotiator = PaymentNegotiator::with_http_client(scheme, oracle.token_address(), http);
        Ok(Self {
            oracle,
            accessor,
            negotiator,
            update_url,
            spend: Mutex::new(SpendGuard::new()),
        })
    }

    pub fn oracle(&self) -> &OracleReference {
        &self.oracle
    }

    pub fn accessor(&self) -> &A {
        &self.accessor
    }

    /// Payer address.
    pub fn address(&self) -> Address {
        self.negotiator.payer()
    }

    fn spend_guard(&self) -> MutexGuard<'_, SpendGuard> {
        match self.spend.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("spend guard mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Read the latest data without a freshness check.
    pub async fn read(&self) -> ReadResult {
        self.read_with(false).await
    }

    /// Read the latest data, letting the provider refuse stale data.
    pub async fn read_checked(&self) -> ReadResult {
        self.read_with(true).await
    }

    async fn read_with(&self, checked: bool) -> ReadResult {
        match self.try_read(checked).await {
            Ok(read) => read,
            Err(e) => {
                tracing::warn!(error = %e, checked, "read failed");
                ReadResult::failed(e.to_string())
            }
        }
    }

    async fn try_read(&self, checked: bool) -> Result<ReadResult, CosetError> {
        let (data, metadata) = if checked {
            tokio::try_join!(self.accessor.get_data(), self.accessor.get_update_metadata())?
        } else {
            tokio::try_join!(
                self.accessor.get_data_without_check(),
                self.accessor.get_update_metadata()
            )?
        };
        if data.is_null() {
            return Err(CosetError::NoData);
        }
        Ok(ReadResult::with_metadata(data, &metadata, unix_now()))
    }

    /// Whether the oracle's data has outlived its recommended update duration.
    pub async fn is_update_needed(&self) -> Result<bool, CosetError> {
        let metadata = self.accessor.get_update_metadata().await?;
        Ok(is_stale(&metadata, unix_now()))
    }

    /// Pay for a data refresh.
    ///
    /// Never returns an error: failures come back as a failed result with a
    /// zero cost breakdown. Nothing is added to the spend total unless the
    /// provider accepted the payment and reported a total cost.
    pub async fn update(&self, options: UpdateOptions) -> UpdateResult {
        match self.try_update(options).await {
            Ok(result) => result,
            Err(e) if e.is_local() => {
                tracing::info!(error = %e, force = options.force, "update refused");
                UpdateResult::failed(e.to_string())
            }
            Err(e) => {
                tracing::warn!(error = %e, force = options.force, "update failed");
                UpdateResult::failed(e.to_string())
            }
        }
    }

    async fn try_update(&self, options: UpdateOptions) -> Result<UpdateResult, CosetError> {
        let allowed = self.spend_guard().can_spend(options.force);
        if !allowed {
            return Err(CosetError::SpendingLimitExceeded);
        }

        let body = serde_json::json!({
            "networkName": self.oracle.network().as_str(),
            "oracleAddress": self.oracle.address().to_string(),
            "paymentToken": self.oracle.payment_token().symbol(),
            "tokenAddress": self.oracle.token_address().to_string(),
        });

        let paid = self
            .negotiator
            .pay_and_fetch(self.update_url.as_str(), &body, &self.accessor)
            .await?;

        let resp: UpdateResponse = paid
            .response
            .json()
            .await
            .map_err(|e| CosetError::Protocol(format!("malformed update response: {e}")))?;
        // The payment has settled once the body parses, so the total counts
        // against the limit even when the fee fields are inconsistent.
        let total = resp.price_details.total_cost;
        let spent_total = {
            let mut guard = self.spend_guard();
            guard.record(total);
            guard.spent()
        };
        let spent = CostBreakdown::try_from(&resp.price_details).inspect_err(|e| {
            tracing::warn!(
                error = %e,
                total = %total,
                spent_total = %spent_total,
                "paid update returned an inconsistent cost breakdown"
            );
        })?;

        let tx = resp
            .tx
            .or_else(|| paid.settlement.and_then(|s| s.transaction));

        tracing::info!(
            oracle = %self.oracle.address(),
            total = %spent.total,
            spent_total = %spent_total,
            tx = tx.as_deref().unwrap_or("-"),
            "oracle updated"
        );

        Ok(UpdateResult::succeeded(spent, resp.data, tx))
    }

    /// Update only when the data is stale. `None` means no update was needed.
    pub async fn optional_update(&self) -> Option<UpdateResult> {
        match self.is_update_needed().await {
            Ok(false) => {
                tracing::debug!("data is fresh, skipping update");
                None
            }
            Ok(true) => Some(self.update(UpdateOptions::default()).await),
            Err(e) => {
                tracing::warn!(error = %e, "could not check freshness");
                Some(UpdateResult::failed(e.to_string()))
            }
        }
    }

    /// Checked read that pays for a refresh when the provider reports stale data.
    pub async fn strict_read(&self, options: UpdateOptions) -> ReadOutcome {
        match self.try_read(true).await {
            Ok(read) => ReadOutcome::Fresh(read),
            Err(CosetError::StaleData(reason)) => {
                tracing::info!(%reason, "data is stale, refreshing");
                ReadOutcome::Refreshed(self.update(options).await)
            }
            Err(e) => {
                tracing::warn!(error = %e, "strict read failed");
                ReadOutcome::Failed(e.to_string())
            }
        }
    }

    /// Current price of one update, queried from the provider every time.
    pub async fn update_cost(&self) -> Result<TokenAmount, CosetError> {
        let price = self.accessor.get_update_price().await?;
        Ok(TokenAmount::new(price, self.oracle.token_decimals()))
    }

    /// Set the ceiling in token base units. Checked at the start of the next update.
    pub fn set_spending_limit(&self, limit: i128) {
        self.spend_guard().set_limit(limit);
    }

    pub fn clear_spending_limit(&self) {
        self.spend_guard().clear_limit();
    }

    /// Total recorded spend in token base units.
    pub fn spent(&self) -> u128 {
        self.spend_guard().spent()
    }

    pub fn spending_limit(&self) -> SpendLimit {
        self.spend_guard().limit()
    }

    pub fn spend_state(&self) -> SpendState {
        self.spend_guard().state()
    }
}

impl<A: OracleAccessor> Coset<A, CosetSchemeClient> {
    /// Build a client from `config`, reading oracle state through `accessor`.
    pub fn from_config_with_accessor(
        config: &ClientConfig,
        make_accessor: impl FnOnce(&OracleReference, reqwest::Client) -> Result<A, CosetError>,
    ) -> Result<Self, CosetError> {
        let oracle = OracleReference::new(
            config.network,
            &config.oracle_address,
            config.payment_token,
            &config.token_registry(),
        )?;
        let scheme = CosetSchemeClient::from_private_key(
            &config.private_key,
            ChainConfig::for_network(config.network),
        )?;
        let http = config.http_client()?;
        let accessor = make_accessor(&oracle, http.clone())?;
        let coset = Self::with_http_client(oracle, accessor, scheme, &config.api_url, http)?;
        if let Some(limit) = config.spending_limit {
            coset.set_spending_limit(limit);
        }
        tracing::debug!(
            network = %config.network,
            oracle = %coset.oracle.address(),
            payer = %coset.address(),
            "coset client ready"
        );
        Ok(coset)
    }
}

impl Coset<HttpAccessor, CosetSchemeClient> {
    /// Build a client that talks to the Coset node over HTTP for everything.
    pub fn from_config(config: &ClientConfig) -> Result<Self, CosetError> {
        Self::from_config_with_accessor(config, |oracle, http| {
            HttpAccessor::with_http_client(&config.api_url, oracle, http)
        })
    }
}

impl Coset<ChainAccessor<RootProvider>, CosetSchemeClient> {
    /// Build a client that reads oracle state and balances from the chain
    /// over JSON-RPC. Updates are still bought from the Coset node.
    pub fn from_config_on_chain(config: &ClientConfig) -> Result<Self, CosetError> {
        let rpc_url: Url = config
            .rpc_url()
            .parse()
            .map_err(|e| CosetError::Config(format!("invalid RPC url: {e}")))?;
        Self::from_config_with_accessor(config, |oracle, _http| {
            Ok(ChainAccessor::new(RootProvider::new_http(rpc_url), oracle))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use alloy::primitives::U256;
    use alloy::signers::local::PrivateKeySigner;
    use coset::{Network, PaymentToken, TokenBalance, TokenRegistry, UpdateMetadata};

    /// Nothing listens on port 1, so any paid request fails fast.
    const DEAD_API: &str = "http://127.0.0.1:1";

    struct StubAccessor {
        metadata: UpdateMetadata,
        data: serde_json::Value,
        stale: bool,
        price: u128,
        calls: AtomicUsize,
    }

    impl StubAccessor {
        fn fresh(data: serde_json::Value) -> Self {
            Self {
                metadata: UpdateMetadata {
                    recommended_update_duration: 3600,
                    last_update_timestamp: unix_now(),
                },
                data,
                stale: false,
                price: 250_000,
                calls: AtomicUsize::new(0),
            }
        }

        fn stale(data: serde_json::Value) -> Self {
            Self {
                metadata: UpdateMetadata {
                    recommended_update_duration: 3600,
                    last_update_timestamp: unix_now() - 3600,
                },
                stale: true,
                ..Self::fresh(data)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl OracleAccessor for StubAccessor {
        async fn get_balance(&self, _owner: Address, _token: Address) -> Result<TokenBalance, CosetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TokenBalance::from_units(U256::from(1_000_000u64), 6))
        }

        async fn get_update_metadata(&self) -> Result<UpdateMetadata, CosetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.metadata)
        }

        async fn get_data_without_check(&self) -> Result<serde_json::Value, CosetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.data.clone())
        }

        async fn get_data(&self) -> Result<serde_json::Value, CosetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.stale {
                return Err(CosetError::StaleData("409: stale".to_string()));
            }
            Ok(self.data.clone())
        }

        async fn get_update_price(&self) -> Result<u128, CosetError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.price)
        }
    }

    fn client(accessor: StubAccessor) -> Coset<StubAccessor, CosetSchemeClient> {
        let oracle = OracleReference::new(
            Network::Mantle,
            "0x0000000000000000000000000000000000000001",
            PaymentToken::Usdc,
            &TokenRegistry::builtin(),
        )
        .unwrap();
        let scheme = CosetSchemeClient::new(PrivateKeySigner::random());
        Coset::new(oracle, accessor, scheme, DEAD_API).unwrap()
    }

    #[tokio::test]
    async fn read_fills_metadata() {
        let coset = client(StubAccessor::fresh(serde_json::json!({"price": 7})));
        let read = coset.read().await;
        assert!(read.status);
        assert_eq!(read.data, Some(serde_json::json!({"price": 7})));
        assert_eq!(read.recommended_update_duration, Some(3600));
        assert_eq!(read.is_update_recommended, Some(false));
        assert!(read.last_update_formatted.is_some());
    }

    #[tokio::test]
    async fn read_without_data_fails() {
        let coset = client(StubAccessor::fresh(serde_json::Value::Null));
        let read = coset.read().await;
        assert!(!read.status);
        assert_eq!(read.message.as_deref(), Some("No data found"));
    }

    #[tokio::test]
    async fn update_over_limit_touches_nothing() {
        let coset = client(StubAccessor::stale(serde_json::json!(1)));
        coset.set_spending_limit(0);

        let result = coset.update(UpdateOptions::default()).await;
        assert!(!result.status);
        assert_eq!(result.message.as_deref(), Some("Spending limit exceeded"));
        assert_eq!(result.spent, CostBreakdown::ZERO);
        assert_eq!(coset.accessor().calls(), 0);
        assert_eq!(coset.spent(), 0);
    }

    #[tokio::test]
    async fn negative_limit_counts_as_exceeded() {
        let coset = client(StubAccessor::stale(serde_json::json!(1)));
        coset.set_spending_limit(-1);
        let result = coset.update(UpdateOptions::default()).await;
        assert_eq!(result.message.as_deref(), Some("Spending limit exceeded"));
        assert_eq!(coset.spending_limit(), SpendLimit::Limited(-1));
    }

    #[tokio::test]
    async fn forced_update_bypasses_limit() {
        let coset = client(StubAccessor::stale(serde_json::json!(1)));
        coset.set_spending_limit(0);

        // Passes the gate, then fails on the unreachable node.
        let result = coset.update(UpdateOptions::forced()).await;
        assert!(!result.status);
        assert_ne!(result.message.as_deref(), Some("Spending limit exceeded"));
        assert_eq!(coset.spent(), 0);
    }

    #[tokio::test]
    async fn fresh_data_needs_no_update() {
        let coset = client(StubAccessor::fresh(serde_json::json!(1)));
        assert!(!coset.is_update_needed().await.unwrap());
        assert!(coset.optional_update().await.is_none());
    }

    #[tokio::test]
    async fn stale_data_needs_update() {
        let coset = client(StubAccessor::stale(serde_json::json!(1)));
        assert!(coset.is_update_needed().await.unwrap());
    }

    #[tokio::test]
    async fn strict_read_returns_fresh_data() {
        let coset = client(StubAccessor::fresh(serde_json::json!({"price": 7})));
        match coset.strict_read(UpdateOptions::default()).await {
            ReadOutcome::Fresh(read) => assert_eq!(read.data, Some(serde_json::json!({"price": 7}))),
            other => panic!("expected fresh read, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn strict_read_refreshes_stale_data() {
        let coset = client(StubAccessor::stale(serde_json::json!(1)));
        let outcome = coset.strict_read(UpdateOptions::default()).await;
        let ReadOutcome::Refreshed(update) = &outcome else {
            panic!("expected refresh, got {outcome:?}");
        };
        // The refresh itself fails against the dead node and records nothing.
        assert!(!update.status);
        assert_eq!(update.spent, CostBreakdown::ZERO);
        assert!(!outcome.is_success());
        assert_eq!(coset.spent(), 0);
    }

    #[tokio::test]
    async fn update_cost_uses_token_decimals() {
        let coset = client(StubAccessor::fresh(serde_json::json!(1)));
        let cost = coset.update_cost().await.unwrap();
        assert_eq!(cost, TokenAmount::new(250_000, 6));
        assert_eq!(cost.to_string(), "0.25");
        coset.update_cost().await.unwrap();
        assert_eq!(coset.accessor().calls(), 2);
    }

    #[test]
    fn spending_limit_can_be_cleared() {
        let coset = client(StubAccessor::fresh(serde_json::json!(1)));
        coset.set_spending_limit(10);
        assert_eq!(coset.spending_limit(), SpendLimit::Limited(10));
        coset.clear_spending_limit();
        assert_eq!(coset.spend_state().spending_limit, SpendLimit::Unbounded);
    }

    #[test]
    fn from_config_applies_limit() {
        let mut config = ClientConfig::new(
            "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "0x0000000000000000000000000000000000000001",
            "http://127.0.0.1:3000",
        );
        config.spending_limit = Some(1_000);
        let coset = Coset::from_config(&config).unwrap();
        assert_eq!(coset.spending_limit(), SpendLimit::Limited(1_000));
        assert_eq!(
            coset.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
                .parse::<Address>()
                .unwrap()
        );

        let on_chain = Coset::from_config_on_chain(&config).unwrap();
        assert_eq!(on_chain.spending_limit(), SpendLimit::Limited(1_000));
        assert_eq!(on_chain.address(), coset.address());

        config.rpc_url = Some("not a url".to_string());
        assert!(matches!(
            Coset::from_config_on_chain(&config).err().unwrap(),
            CosetError::Config(_)
        ));

        config.oracle_address = "oracle".to_string();
        let err = Coset::from_config(&config).err().unwrap();
        assert_eq!(err.to_string(), "config error: Invalid oracle address");
    }
}
