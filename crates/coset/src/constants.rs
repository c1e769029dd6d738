use crate::network::Network;

/// x402 protocol version sent with every payment payload.
pub const X402_VERSION: u32 = 1;

/// x402 scheme name for EIP-712 token payments accepted by the Coset node.
pub const SCHEME_NAME: &str = "exact";

/// Request header carrying the base64-encoded payment payload.
pub const PAYMENT_SIGNATURE_HEADER: &str = "PAYMENT-SIGNATURE";

/// Response header carrying the settlement result, if the node reports one.
pub const PAYMENT_RESPONSE_HEADER: &str = "payment-response";

/// Default EIP-712 domain name when the challenge does not name one.
pub const EIP712_DOMAIN_NAME: &str = "coset";

/// Default EIP-712 domain version.
pub const EIP712_DOMAIN_VERSION: &str = "1";

/// Seconds subtracted from "now" for the start of an authorization's validity
/// window, to tolerate clock drift between client and node.
pub const VALID_AFTER_SKEW_SECS: u64 = 60;

/// Runtime chain configuration used when signing payment authorizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub network: String,
    pub scheme_name: String,
    pub eip712_domain_name: String,
    pub eip712_domain_version: String,
}

impl ChainConfig {
    /// Configuration for one of the supported networks.
    pub fn for_network(network: Network) -> Self {
        Self {
            chain_id: network.chain_id(),
            network: network.caip2(),
            scheme_name: SCHEME_NAME.to_string(),
            eip712_domain_name: EIP712_DOMAIN_NAME.to_string(),
            eip712_domain_version: EIP712_DOMAIN_VERSION.to_string(),
        }
    }
}

impl Default for ChainConfig {
    /// Defaults to Mantle mainnet.
    fn default() -> Self {
        Self::for_network(Network::Mantle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_config_follows_network() {
        let config = ChainConfig::for_network(Network::CronosTestnet);
        assert_eq!(config.chain_id, 338);
        assert_eq!(config.network, "eip155:338");
        assert_eq!(config.scheme_name, SCHEME_NAME);
    }

    #[test]
    fn default_is_mantle() {
        assert_eq!(ChainConfig::default().chain_id, 5000);
    }
}
