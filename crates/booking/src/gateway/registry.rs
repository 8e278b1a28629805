//! Name-based registry of remote endpoints.
//!
//! Endpoints are bound under a service name and looked up on every call, so
//! rebinding a name takes effect for the next request.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use super::remote::{
    HttpPaymentClient, HttpVerificationClient, PaymentCapability, VerificationCapability,
};

/// Error from registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("no endpoint bound under '{0}'")]
    NotBound(String),
}

type Bindings<T> = Arc<RwLock<HashMap<String, Arc<T>>>>;

/// Registry of payment and verification endpoints.
#[derive(Clone, Default)]
pub struct ServiceRegistry {
    payment: Bindings<dyn PaymentCapability>,
    verification: Bindings<dyn VerificationCapability>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with HTTP clients bound under the given names.
    pub async fn with_http_endpoints(
        payment_name: &str,
        payment_url: &str,
        verification_name: &str,
        verification_url: &str,
    ) -> Self {
        let registry = Self::new();
        let client = reqwest::Client::new();
        registry
            .bind_payment(
                payment_name,
                Arc::new(HttpPaymentClient::with_client(client.clone(), payment_url)),
            )
            .await;
        registry
            .bind_verification(
                verification_name,
                Arc::new(HttpVerificationClient::with_client(client, verification_url)),
            )
            .await;
        info!(
            payment = %payment_name,
            payment_url = %payment_url,
            verification = %verification_name,
            verification_url = %verification_url,
            "remote endpoints bound"
        );
        registry
    }

    /// Binds (or rebinds) a payment endpoint.
    pub async fn bind_payment(&self, name: &str, endpoint: Arc<dyn PaymentCapability>) {
        debug!(name, "binding payment endpoint");
        self.payment.write().await.insert(name.to_string(), endpoint);
    }

    /// Binds (or rebinds) a verification endpoint.
    pub async fn bind_verification(&self, name: &str, endpoint: Arc<dyn VerificationCapability>) {
        debug!(name, "binding verification endpoint");
        self.verification
            .write()
            .await
            .insert(name.to_string(), endpoint);
    }

    /// Removes any endpoint bound under `name`.
    pub async fn unbind(&self, name: &str) {
        self.payment.write().await.remove(name);
        self.verification.write().await.remove(name);
    }

    pub async fn lookup_payment(
        &self,
        name: &str,
    ) -> Result<Arc<dyn PaymentCapability>, LookupError> {
        self.payment
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotBound(name.to_string()))
    }

    pub async fn lookup_verification(
        &self,
        name: &str,
    ) -> Result<Arc<dyn VerificationCapability>, LookupError> {
        self.verification
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::NotBound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::simulated::SimulatedBank;

    #[tokio::test]
    async fn test_lookup_unbound_name() {
        let registry = ServiceRegistry::new();
        let result = registry.lookup_payment("PaymentService").await;
        assert_eq!(
            result.err(),
            Some(LookupError::NotBound("PaymentService".to_string()))
        );
    }

    #[tokio::test]
    async fn test_bind_and_unbind() {
        let registry = ServiceRegistry::new();
        registry
            .bind_payment("PaymentService", Arc::new(SimulatedBank::new()))
            .await;
        assert!(registry.lookup_payment("PaymentService").await.is_ok());
        // Same name in the other table is a separate binding
        assert!(registry.lookup_verification("PaymentService").await.is_err());

        registry.unbind("PaymentService").await;
        assert!(registry.lookup_payment("PaymentService").await.is_err());
    }

    #[tokio::test]
    async fn test_http_endpoints_bound() {
        let registry = ServiceRegistry::with_http_endpoints(
            "PaymentService",
            "http://127.0.0.1:1099",
            "PoliceService",
            "http://127.0.0.1:1100",
        )
        .await;
        assert!(registry.lookup_payment("PaymentService").await.is_ok());
        assert!(registry.lookup_verification("PoliceService").await.is_ok());
    }
}
