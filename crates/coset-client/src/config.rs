use std::time::Duration;

use alloy::primitives::Address;

use coset::{CosetError, Network, PaymentToken, TokenRegistry, USDC_DECIMALS};

/// Client configuration, normally loaded from `COSET_*` environment variables.
#[derive(Clone)]
pub struct ClientConfig {
    pub private_key: String,
    pub oracle_address: String,
    pub network: Network,
    pub payment_token: PaymentToken,
    /// Registers `payment_token` on `network` at this address, overriding the built-in table.
    pub token_address: Option<Address>,
    pub token_decimals: u32,
    pub api_url: String,
    /// Ceiling in token base units. `None` means unbounded.
    pub spending_limit: Option<i128>,
    /// Per-request deadline. `None` means requests wait indefinitely.
    pub request_timeout: Option<Duration>,
    /// JSON-RPC endpoint for on-chain reads. `None` uses the network's public RPC.
    pub rpc_url: Option<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("private_key", &"<redacted>")
            .field("oracle_address", &self.oracle_address)
            .field("network", &self.network)
            .field("payment_token", &self.payment_token)
            .field("token_address", &self.token_address)
            .field("token_decimals", &self.token_decimals)
            .field("api_url", &self.api_url)
            .field("spending_limit", &self.spending_limit)
            .field("request_timeout", &self.request_timeout)
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl ClientConfig {
    /// Minimal configuration; everything optional keeps its default.
    pub fn new(
        private_key: impl Into<String>,
        oracle_address: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Self {
        Self {
            private_key: private_key.into(),
            oracle_address: oracle_address.into(),
            network: Network::Mantle,
            payment_token: PaymentToken::Usdc,
            token_address: None,
            token_decimals: USDC_DECIMALS,
            api_url: api_url.into(),
            spending_limit: None,
            request_timeout: None,
            rpc_url: None,
        }
    }

    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, CosetError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CosetError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| CosetError::Config(format!("{key} must be set")))
        };

        let private_key = required("COSET_PRIVATE_KEY")?;
        let oracle_address = required("COSET_ORACLE_ADDRESS")?;
        let api_url = required("COSET_API_URL")?;

        let network = var("COSET_NETWORK")
            .map(|v| v.parse::<Network>())
            .transpose()?
            .unwrap_or(Network::Mantle);

        let payment_token = var("COSET_PAYMENT_TOKEN")
            .map(|v| v.parse::<PaymentToken>())
            .transpose()?
            .unwrap_or(PaymentToken::Usdc);

        let token_address = var("COSET_TOKEN_ADDRESS")
            .map(|v| {
                v.trim().parse::<Address>().map_err(|e| {
                    CosetError::Config(format!("COSET_TOKEN_ADDRESS is not an address: {e}"))
                })
            })
            .transpose()?;

        let token_decimals = var("COSET_TOKEN_DECIMALS")
            .map(|v| {
                v.trim().parse::<u32>().map_err(|e| {
                    CosetError::Config(format!("COSET_TOKEN_DECIMALS is not a number: {e}"))
                })
            })
            .transpose()?
            .unwrap_or(USDC_DECIMALS);

        let spending_limit = var("COSET_SPENDING_LIMIT")
            .map(|v| {
                v.trim().parse::<i128>().map_err(|e| {
                    CosetError::Config(format!("COSET_SPENDING_LIMIT is not an integer: {e}"))
                })
            })
            .transpose()?;

        let request_timeout = var("COSET_TIMEOUT_SECS")
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| {
                        CosetError::Config(format!("COSET_TIMEOUT_SECS is not a number: {e}"))
                    })
            })
            .transpose()?;

        let rpc_url = var("COSET_RPC_URL");

        Ok(Self {
            private_key,
            oracle_address,
            network,
            payment_token,
            token_address,
            token_decimals,
            api_url,
            spending_limit,
            request_timeout,
            rpc_url,
        })
    }

    /// Built-in token table plus the configured override, if any.
    pub fn token_registry(&self) -> TokenRegistry {
        let registry = TokenRegistry::builtin();
        match self.token_address {
            Some(address) => registry.with_token(
                self.network,
                self.payment_token,
                address,
                self.token_decimals,
            ),
            None => registry,
        }
    }

    /// RPC endpoint for on-chain reads.
    pub fn rpc_url(&self) -> &str {
        self.rpc_url
            .as_deref()
            .unwrap_or_else(|| self.network.rpc_url())
    }

    /// A reqwest client honouring `request_timeout`, shared by every call the client makes.
    pub fn http_client(&self) -> Result<reqwest::Client, CosetError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| CosetError::Config(format!("failed to build http client: {e}")))
    }
}
