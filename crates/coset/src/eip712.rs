//! EIP-712 typed-data signing, signature recovery, and nonce generation.
//!
//! The domain defaults to the network's [`ChainConfig`]; a node may override
//! the domain name and version through the requirement's `extra` field.

use std::borrow::Cow;

use alloy::primitives::{Address, FixedBytes, Signature, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};

use crate::payment::PaymentExtra;
use crate::PaymentAuthorization;
use crate::{ChainConfig, CosetError};

/// Build the EIP-712 domain for a chain, token and optional node override.
pub fn payment_domain(
    config: &ChainConfig,
    token: Address,
    extra: Option<&PaymentExtra>,
) -> Eip712Domain {
    let (name, version) = match extra {
        Some(extra) => (extra.name.clone(), extra.version.clone()),
        None => (
            config.eip712_domain_name.clone(),
            config.eip712_domain_version.clone(),
        ),
    };
    Eip712Domain {
        name: Some(Cow::Owned(name)),
        version: Some(Cow::Owned(version)),
        chain_id: Some(U256::from(config.chain_id)),
        verifying_contract: Some(token),
        salt: None,
    }
}

/// Compute the EIP-712 signing hash of an authorization.
pub fn signing_hash(
    auth: &PaymentAuthorization,
    config: &ChainConfig,
    extra: Option<&PaymentExtra>,
) -> B256 {
    let domain = payment_domain(config, auth.token, extra);
    auth.eip712_signing_hash(&domain)
}

/// Recover the signer of an authorization from a 65-byte signature.
pub fn recover_signer(
    auth: &PaymentAuthorization,
    signature_bytes: &[u8],
    config: &ChainConfig,
    extra: Option<&PaymentExtra>,
) -> Result<Address, CosetError> {
    if signature_bytes.len() != 65 {
        return Err(CosetError::Signature(format!(
            "signature must be 65 bytes, got {}",
            signature_bytes.len()
        )));
    }
    let sig = Signature::from_raw(signature_bytes)
        .map_err(|e| CosetError::Signature(format!("invalid signature: {e}")))?;
    let hash = signing_hash(auth, config, extra);
    sig.recover_address_from_prehash(&hash)
        .map_err(|e| CosetError::Signature(format!("recovery failed: {e}")))
}

/// Generate a random 32-byte nonce (keccak256 of 32 random bytes).
pub fn random_nonce() -> FixedBytes<32> {
    use alloy::primitives::keccak256;
    let mut bytes = [0u8; 32];
    rand::fill(&mut bytes);
    keccak256(bytes)
}

/// Encode a Signature to a hex string with 0x prefix (65 bytes -> 0x + 130 hex).
pub fn encode_signature_hex(sig: &Signature) -> String {
    format!("0x{}", alloy::hex::encode(sig.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::local::PrivateKeySigner;
    use alloy::signers::SignerSync;

    fn auth(from: Address) -> PaymentAuthorization {
        PaymentAuthorization {
            from,
            to: Address::repeat_byte(2),
            value: U256::from(1000u64),
            token: crate::network::MANTLE_USDC,
            validAfter: U256::from(0u64),
            validBefore: U256::from(u64::MAX),
            nonce: FixedBytes::ZERO,
        }
    }

    #[test]
    fn sign_and_recover() {
        let signer = PrivateKeySigner::random();
        let auth = auth(signer.address());
        let config = ChainConfig::default();

        let hash = signing_hash(&auth, &config, None);
        let sig = signer.sign_hash_sync(&hash).unwrap();
        let hex = encode_signature_hex(&sig);
        assert_eq!(hex.len(), 132);
        let bytes = alloy::hex::decode(hex.strip_prefix("0x").unwrap()).unwrap();

        assert_eq!(
            recover_signer(&auth, &bytes, &config, None).unwrap(),
            signer.address()
        );
    }

    #[test]
    fn domain_override_changes_hash() {
        let auth = auth(Address::ZERO);
        let config = ChainConfig::default();
        let extra = PaymentExtra {
            name: "USD Coin".to_string(),
            version: "2".to_string(),
        };
        assert_ne!(
            signing_hash(&auth, &config, None),
            signing_hash(&auth, &config, Some(&extra))
        );
    }

    #[test]
    fn chain_id_is_bound() {
        let auth = auth(Address::ZERO);
        let mantle = ChainConfig::for_network(crate::Network::Mantle);
        let cronos = ChainConfig::for_network(crate::Network::Cronos);
        assert_ne!(
            signing_hash(&auth, &mantle, None),
            signing_hash(&auth, &cronos, None)
        );
    }

    #[test]
    fn short_signature_rejected() {
        let err = recover_signer(&auth(Address::ZERO), &[0u8; 64], &ChainConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, CosetError::Signature(_)));
    }

    #[test]
    fn random_nonce_is_unique() {
        assert_ne!(random_nonce(), random_nonce());
    }
}
