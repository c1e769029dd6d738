use alloy::primitives::{Address, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;

use coset::{
    eip712::{encode_signature_hex, random_nonce, signing_hash},
    staleness::unix_now,
    ChainConfig, CosetError, PaymentAuthorization, PaymentData, PaymentPayload,
    PaymentRequirements, SchemeClient, VALID_AFTER_SKEW_SECS,
};

/// Client-side scheme implementation: creates and signs EIP-712 payment payloads.
///
/// Owns the payer key for the lifetime of the client.
pub struct CosetSchemeClient {
    signer: PrivateKeySigner,
    config: ChainConfig,
}

impl CosetSchemeClient {
    /// Create a new client with Mantle mainnet defaults.
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self {
            signer,
            config: ChainConfig::default(),
        }
    }

    /// Create a new client with a custom chain configuration.
    pub fn with_chain_config(signer: PrivateKeySigner, config: ChainConfig) -> Self {
        Self { signer, config }
    }

    /// Parse a hex private key (with or without `0x`).
    pub fn from_private_key(key: &str, config: ChainConfig) -> Result<Self, CosetError> {
        let key = key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let signer: PrivateKeySigner = key
            .parse()
            .map_err(|_| CosetError::Config("invalid private key".to_string()))?;
        Ok(Self::with_chain_config(signer, config))
    }

    pub fn chain_config(&self) -> &ChainConfig {
        &self.config
    }
}

impl std::fmt::Debug for CosetSchemeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosetSchemeClient")
            .field("address", &self.signer.address())
            .field("chain_id", &self.config.chain_id)
            .finish_non_exhaustive()
    }
}

impl SchemeClient for CosetSchemeClient {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn create_payment_payload(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentPayload, CosetError> {
        if requirements.scheme != self.config.scheme_name {
            return Err(CosetError::UnsupportedScheme(format!(
                "cannot sign for scheme {}",
                requirements.scheme
            )));
        }
        // The EIP-712 domain is bound to our chain id; a signature for any
        // other network would never verify.
        if requirements.network != self.config.network {
            return Err(CosetError::Protocol(format!(
                "payment requested on {}, signer is configured for {}",
                requirements.network, self.config.network
            )));
        }

        let token = requirements.asset;
        let now = unix_now();

        let valid_after = now.saturating_sub(VALID_AFTER_SKEW_SECS);
        let valid_before = now.saturating_add(requirements.max_timeout_seconds);

        let nonce = random_nonce();

        let value = requirements
            .amount
            .parse::<U256>()
            .map_err(|e| CosetError::Protocol(format!("invalid amount: {e}")))?;

        let auth = PaymentAuthorization {
            from: self.signer.address(),
            to: requirements.pay_to,
            value,
            token,
            validAfter: U256::from(valid_after),
            validBefore: U256::from(valid_before),
            nonce,
        };

        let hash = signing_hash(&auth, &self.config, requirements.extra.as_ref());
        let sig = self
            .signer
            .sign_hash_sync(&hash)
            .map_err(|e| CosetError::Signature(format!("signing failed: {e}")))?;

        tracing::debug!(
            payer = %auth.from,
            pay_to = %auth.to,
            token = %token,
            value = %value,
            "signed payment authorization"
        );

        Ok(PaymentPayload {
            x402_version,
            scheme: requirements.scheme.clone(),
            network: requirements.network.clone(),
            payload: PaymentData {
                from: self.signer.address(),
                to: requirements.pay_to,
                value: requirements.amount.clone(),
                token,
                valid_after,
                valid_before,
                nonce,
                signature: encode_signature_hex(&sig),
            },
        })
    }
}
