//! Remote capabilities and their HTTP clients.
//!
//! A capability answers yes or no. Any failure to obtain that answer is a
//! [`RemoteError`], which the gateway reports as unavailability rather than
//! as a verdict.

use async_trait::async_trait;
use domain::Money;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Path of the payment operation under a bank's base URL.
pub const PROCESS_PAYMENT_PATH: &str = "/process-payment";

/// Path of the verification operation under a police service's base URL.
pub const VERIFY_CITIZEN_PATH: &str = "/verify-citizen";

/// Failure to obtain an answer from a remote capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("service error: HTTP {0}")]
    Status(u16),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Captures a payment. `true` means the charge was accepted.
#[async_trait]
pub trait PaymentCapability: Send + Sync {
    async fn process_payment(&self, card_reference: &str, amount: Money)
    -> Result<bool, RemoteError>;
}

/// Checks a citizen record. `true` means the citizen is clean.
#[async_trait]
pub trait VerificationCapability: Send + Sync {
    async fn verify_citizen(&self, national_id: &str, license_ref: &str)
    -> Result<bool, RemoteError>;
}

/// Body of a payment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessPaymentRequest {
    pub card_reference: String,
    pub amount_cents: i64,
}

/// Body of a verification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCitizenRequest {
    pub national_id: String,
    pub license_ref: String,
}

/// Body of every remote answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAnswer {
    pub approved: bool,
}

async fn post_for_answer<B: Serialize + Sync>(
    client: &Client,
    url: String,
    body: &B,
) -> Result<bool, RemoteError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| RemoteError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(RemoteError::Status(response.status().as_u16()));
    }

    let answer: RemoteAnswer = response
        .json()
        .await
        .map_err(|e| RemoteError::Decode(e.to_string()))?;

    Ok(answer.approved)
}

/// HTTP client for a bank endpoint.
#[derive(Debug, Clone)]
pub struct HttpPaymentClient {
    client: Client,
    base_url: String,
}

impl HttpPaymentClient {
    /// Creates a client for the bank at `base_url` (e.g. "http://127.0.0.1:1099").
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PaymentCapability for HttpPaymentClient {
    async fn process_payment(
        &self,
        card_reference: &str,
        amount: Money,
    ) -> Result<bool, RemoteError> {
        let request = ProcessPaymentRequest {
            card_reference: card_reference.to_string(),
            amount_cents: amount.cents(),
        };
        post_for_answer(
            &self.client,
            format!("{}{}", self.base_url, PROCESS_PAYMENT_PATH),
            &request,
        )
        .await
    }
}

/// HTTP client for a police service endpoint.
#[derive(Debug, Clone)]
pub struct HttpVerificationClient {
    client: Client,
    base_url: String,
}

impl HttpVerificationClient {
    /// Creates a client for the police service at `base_url`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl VerificationCapability for HttpVerificationClient {
    async fn verify_citizen(
        &self,
        national_id: &str,
        license_ref: &str,
    ) -> Result<bool, RemoteError> {
        let request = VerifyCitizenRequest {
            national_id: national_id.to_string(),
            license_ref: license_ref.to_string(),
        };
        post_for_answer(
            &self.client,
            format!("{}{}", self.base_url, VERIFY_CITIZEN_PATH),
            &request,
        )
        .await
    }
}
