use alloy::primitives::Address;
use base64::Engine;
use reqwest::StatusCode;

use coset::{
    CosetError, OracleAccessor, PaymentChallenge, PaymentPayload, PaymentRequiredBody,
    SchemeClient, SettleResponse, PAYMENT_RESPONSE_HEADER, PAYMENT_SIGNATURE_HEADER, SCHEME_NAME,
};

/// A successful response from a paid endpoint.
#[derive(Debug)]
pub struct PaidResponse {
    pub response: reqwest::Response,
    /// Settlement info from the `PAYMENT-RESPONSE` header, if any.
    pub settlement: Option<SettleResponse>,
    /// The payment attached to the request; `None` when the node did not ask for one.
    pub payment: Option<PaymentPayload>,
}

/// HTTP POST wrapper that pays for 402 responses.
///
/// One logical call is at most two requests: the initial attempt and, after a
/// 402 challenge the payer's balance covers, a single retry carrying a
/// `PAYMENT-SIGNATURE` header. A rejected retry is returned as an error, never
/// retried again.
pub struct PaymentNegotiator<S: SchemeClient> {
    http: reqwest::Client,
    scheme: S,
    token: Address,
}

impl<S: SchemeClient> PaymentNegotiator<S> {
    /// `token` is the contract address of the token we pay with.
    pub fn new(scheme: S, token: Address) -> Self {
        Self::with_http_client(scheme, token, reqwest::Client::new())
    }

    /// Create a negotiator with a custom reqwest::Client.
    pub fn with_http_client(scheme: S, token: Address, http: reqwest::Client) -> Self {
        Self {
            http,
            scheme,
            token,
        }
    }

    pub fn scheme(&self) -> &S {
        &self.scheme
    }

    pub fn payer(&self) -> Address {
        self.scheme.address()
    }

    /// POST `body` to `url`, paying if the node answers 402.
    ///
    /// The payer's balance is read from `balances` before anything is signed;
    /// a shortfall aborts with [`CosetError::InsufficientBalance`] and no retry.
    pub async fn pay_and_fetch<A: OracleAccessor>(
        &self,
        url: &str,
        body: &serde_json::Value,
        balances: &A,
    ) -> Result<PaidResponse, CosetError> {
        let resp = self.post(url, body, None).await?;

        if resp.status() != StatusCode::PAYMENT_REQUIRED {
            let response = ensure_success(resp).await?;
            return Ok(PaidResponse {
                response,
                settlement: None,
                payment: None,
            });
        }

        let required: PaymentRequiredBody = resp
            .json()
            .await
            .map_err(|e| CosetError::Protocol(format!("failed to parse 402 body: {e}")))?;

        let challenge = PaymentChallenge::select(required, SCHEME_NAME, self.token)?;
        tracing::info!(
            url,
            amount = %challenge.required_amount(),
            asset = %challenge.requirements().asset,
            "payment required"
        );

        let balance = balances
            .get_balance(self.payer(), challenge.requirements().asset)
            .await?;
        let authorization = challenge.fund(&balance)?.authorize(&self.scheme).await?;

        let resp = self
            .post(url, body, Some(authorization.header_value()))
            .await?;
        let settlement = decode_settlement(&resp);
        let response = ensure_success(resp).await?;

        tracing::info!(
            url,
            transaction = settlement
                .as_ref()
                .and_then(|s| s.transaction.as_deref())
                .unwrap_or("-"),
            "paid request accepted"
        );

        Ok(PaidResponse {
            response,
            settlement,
            payment: Some(authorization.payload().clone()),
        })
    }

    async fn post(
        &self,
        url: &str,
        body: &serde_json::Value,
        payment: Option<&str>,
    ) -> Result<reqwest::Response, CosetError> {
        let mut req = self.http.post(url).json(body);
        if let Some(header) = payment {
            req = req.header(PAYMENT_SIGNATURE_HEADER, header);
        }
        let context = if payment.is_some() {
            "paid request"
        } else {
            "request"
        };
        req.send()
            .await
            .map_err(|e| CosetError::transport(context, e))
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, CosetError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "request rejected");
    Err(CosetError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Read the settlement header, accepting base64 JSON or plain JSON.
pub fn decode_settlement(resp: &reqwest::Response) -> Option<SettleResponse> {
    let raw = resp
        .headers()
        .get(PAYMENT_RESPONSE_HEADER)
        .and_then(|v| v.to_str().ok())?;
    parse_settlement(raw)
}

fn parse_settlement(raw: &str) -> Option<SettleResponse> {
    base64::engine::general_purpose::STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<SettleResponse>(&bytes).ok())
        .or_else(|| serde_json::from_str::<SettleResponse>(raw).ok())
}
