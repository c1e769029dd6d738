//! Two-phase payment protocol: a 402 challenge is selected, checked against
//! the payer's balance, and only then signed.
//!
//! [`PaymentChallenge::fund`] is the only way to obtain a [`FundedChallenge`],
//! and only a funded challenge can be authorized, so a payment that the
//! balance cannot cover never reaches the signer.

use alloy::primitives::{Address, U256};
use base64::Engine;

use crate::oracle::TokenBalance;
use crate::payment::{PaymentPayload, PaymentRequiredBody, PaymentRequirements};
use crate::scheme::SchemeClient;
use crate::{CosetError, X402_VERSION};

/// A payment requirement chosen from a node's 402 response.
#[derive(Debug, Clone)]
pub struct PaymentChallenge {
    x402_version: u32,
    requirements: PaymentRequirements,
    required: U256,
}

impl PaymentChallenge {
    /// Pick the requirement matching our scheme and payment token.
    pub fn select(
        body: PaymentRequiredBody,
        scheme_name: &str,
        token: Address,
    ) -> Result<Self, CosetError> {
        if body.x402_version != X402_VERSION {
            return Err(CosetError::Protocol(format!(
                "unsupported x402 version {}, expected {X402_VERSION}",
                body.x402_version
            )));
        }
        let offered: Vec<String> = body
            .accepts
            .iter()
            .map(|r| format!("{}/{}", r.scheme, r.asset))
            .collect();
        let requirements = body
            .accepts
            .into_iter()
            .find(|r| r.scheme == scheme_name && r.asset == token)
            .ok_or_else(|| {
                CosetError::UnsupportedScheme(format!(
                    "no {scheme_name} requirement for token {token} in {offered:?}"
                ))
            })?;
        let required = requirements
            .amount
            .trim()
            .parse::<U256>()
            .map_err(|e| {
                CosetError::Protocol(format!("invalid amount {:?}: {e}", requirements.amount))
            })?;
        Ok(Self {
            x402_version: body.x402_version,
            requirements,
            required,
        })
    }

    pub fn requirements(&self) -> &PaymentRequirements {
        &self.requirements
    }

    pub fn required_amount(&self) -> U256 {
        self.required
    }

    /// Check the payer can cover the challenge. Aborts the negotiation with
    /// [`CosetError::InsufficientBalance`] when it cannot.
    pub fn fund(self, balance: &TokenBalance) -> Result<FundedChallenge, CosetError> {
        let available = balance.units()?;
        if available < self.required {
            tracing::warn!(
                required = %self.required,
                available = %available,
                asset = %self.requirements.asset,
                "balance does not cover payment, aborting before signing"
            );
            return Err(CosetError::InsufficientBalance {
                required: self.required.to_string(),
                available: available.to_string(),
            });
        }
        Ok(FundedChallenge { challenge: self })
    }
}

/// A challenge the payer's balance is known to cover.
#[derive(Debug, Clone)]
pub struct FundedChallenge {
    challenge: PaymentChallenge,
}

impl FundedChallenge {
    pub fn requirements(&self) -> &PaymentRequirements {
        &self.challenge.requirements
    }

    /// Sign the payment. Consumes the challenge: one challenge, one signature.
    pub async fn authorize<S: SchemeClient>(self, scheme: &S) -> Result<Authorization, CosetError> {
        let payload = scheme
            .create_payment_payload(self.challenge.x402_version, &self.challenge.requirements)
            .await?;
        let header = encode_payment(&payload)?;
        Ok(Authorization { payload, header })
    }
}

/// A signed payment ready to attach to the retried request.
#[derive(Debug, Clone)]
pub struct Authorization {
    payload: PaymentPayload,
    header: String,
}

impl Authorization {
    pub fn payload(&self) -> &PaymentPayload {
        &self.payload
    }

    /// Value for the `PAYMENT-SIGNATURE` header.
    pub fn header_value(&self) -> &str {
        &self.header
    }
}

/// Base64-encode a payment payload for the PAYMENT-SIGNATURE header.
pub fn encode_payment(payload: &PaymentPayload) -> Result<String, CosetError> {
    let json = serde_json::to_vec(payload)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(&json))
}

/// Decode a payment payload from the PAYMENT-SIGNATURE header.
pub fn decode_payment(encoded: &str) -> Result<PaymentPayload, CosetError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| CosetError::Protocol(format!("invalid base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CosetError::Protocol(format!("invalid payment JSON: {e}")))
}
