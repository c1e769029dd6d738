//! Signer capability used by the payment negotiation layer.

use crate::error::CosetError;
use crate::payment::{PaymentPayload, PaymentRequirements};
use alloy::primitives::Address;

/// Client-side scheme: owns the payer key and creates signed payment payloads.
pub trait SchemeClient: Send + Sync {
    /// Address of the paying account.
    fn address(&self) -> Address;

    /// Create a signed payment payload for the given requirements.
    fn create_payment_payload(
        &self,
        x402_version: u32,
        requirements: &PaymentRequirements,
    ) -> impl std::future::Future<Output = Result<PaymentPayload, CosetError>> + Send;
}
