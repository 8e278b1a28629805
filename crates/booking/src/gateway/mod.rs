//! Remote service gateway.
//!
//! Resolves a named endpoint through the [`ServiceRegistry`] and invokes one
//! capability with a bounded wait. A lookup failure, transport error or
//! timeout is returned as [`GatewayUnavailable`]; the gateway never turns it
//! into a verdict and never retries.

pub mod registry;
pub mod remote;
pub mod simulated;

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use domain::Money;

pub use registry::{LookupError, ServiceRegistry};
pub use remote::{
    HttpPaymentClient, HttpVerificationClient, PaymentCapability, RemoteError,
    VerificationCapability,
};
pub use simulated::{FailureMode, SimulatedBank, SimulatedPolice};

/// Default registry name of the payment service.
pub const DEFAULT_PAYMENT_SERVICE: &str = "PaymentService";

/// Default registry name of the verification service.
pub const DEFAULT_VERIFICATION_SERVICE: &str = "PoliceService";

/// A remote capability reachable through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Payment,
    Verification,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Payment => "payment",
            Capability::Verification => "verification",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer of the payment capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentVerdict {
    Accepted,
    Declined,
}

impl PaymentVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentVerdict::Accepted => "accepted",
            PaymentVerdict::Declined => "declined",
        }
    }
}

impl From<bool> for PaymentVerdict {
    fn from(accepted: bool) -> Self {
        if accepted {
            PaymentVerdict::Accepted
        } else {
            PaymentVerdict::Declined
        }
    }
}

/// Answer of the verification capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationVerdict {
    Clean,
    Flagged,
}

impl VerificationVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationVerdict::Clean => "clean",
            VerificationVerdict::Flagged => "flagged",
        }
    }
}

impl From<bool> for VerificationVerdict {
    fn from(clean: bool) -> Self {
        if clean {
            VerificationVerdict::Clean
        } else {
            VerificationVerdict::Flagged
        }
    }
}

/// No verdict could be obtained from a capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{capability} service unavailable: {cause}")]
pub struct GatewayUnavailable {
    pub capability: Capability,
    pub cause: String,
}

impl GatewayUnavailable {
    pub fn new(capability: Capability, cause: impl Into<String>) -> Self {
        Self {
            capability,
            cause: cause.into(),
        }
    }
}

/// Invokes remote capabilities on behalf of the booking flows.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn invoke_payment(
        &self,
        card_reference: &str,
        amount: Money,
    ) -> Result<PaymentVerdict, GatewayUnavailable>;

    async fn invoke_verification(
        &self,
        national_id: &str,
        license_ref: &str,
    ) -> Result<VerificationVerdict, GatewayUnavailable>;
}

/// Names and time bound used by [`RemoteServiceGateway`].
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub payment_service: String,
    pub verification_service: String,
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            payment_service: DEFAULT_PAYMENT_SERVICE.to_string(),
            verification_service: DEFAULT_VERIFICATION_SERVICE.to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Gateway that looks endpoints up in a [`ServiceRegistry`] on every call.
#[derive(Clone)]
pub struct RemoteServiceGateway {
    registry: ServiceRegistry,
    config: GatewayConfig,
}

impl RemoteServiceGateway {
    pub fn new(registry: ServiceRegistry, config: GatewayConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Awaits a remote answer within the configured timeout.
    async fn bounded<F>(&self, capability: Capability, call: F) -> Result<bool, GatewayUnavailable>
    where
        F: Future<Output = Result<bool, RemoteError>> + Send,
    {
        match tokio::time::timeout(self.config.timeout, call).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(e)) => Err(GatewayUnavailable::new(capability, e.to_string())),
            Err(_) => Err(GatewayUnavailable::new(
                capability,
                format!("no answer within {}ms", self.config.timeout.as_millis()),
            )),
        }
    }

    fn record(capability: Capability, outcome: &'static str, started: Instant) {
        metrics::counter!(
            "gateway_calls_total",
            "capability" => capability.as_str(),
            "outcome" => outcome
        )
        .increment(1);
        metrics::histogram!("gateway_call_duration_seconds", "capability" => capability.as_str())
            .record(started.elapsed().as_secs_f64());
    }
}

#[async_trait]
impl RemoteGateway for RemoteServiceGateway {
    #[tracing::instrument(skip(self, card_reference), fields(capability = "payment"))]
    async fn invoke_payment(
        &self,
        card_reference: &str,
        amount: Money,
    ) -> Result<PaymentVerdict, GatewayUnavailable> {
        let started = Instant::now();
        let result = match self
            .registry
            .lookup_payment(&self.config.payment_service)
            .await
        {
            Ok(endpoint) => {
                self.bounded(
                    Capability::Payment,
                    endpoint.process_payment(card_reference, amount),
                )
                .await
            }
            Err(e) => Err(GatewayUnavailable::new(Capability::Payment, e.to_string())),
        };

        let result = result.map(PaymentVerdict::from);
        match &result {
            Ok(verdict) => {
                tracing::info!(verdict = verdict.as_str(), "payment answered");
                Self::record(Capability::Payment, verdict.as_str(), started);
            }
            Err(e) => {
                tracing::warn!(cause = %e.cause, "payment unavailable");
                Self::record(Capability::Payment, "unavailable", started);
            }
        }
        result
    }

    #[tracing::instrument(skip(self, national_id), fields(capability = "verification"))]
    async fn invoke_verification(
        &self,
        national_id: &str,
        license_ref: &str,
    ) -> Result<VerificationVerdict, GatewayUnavailable> {
        let started = Instant::now();
        let result = match self
            .registry
            .lookup_verification(&self.config.verification_service)
            .await
        {
            Ok(endpoint) => {
                self.bounded(
                    Capability::Verification,
                    endpoint.verify_citizen(national_id, license_ref),
                )
                .await
            }
            Err(e) => Err(GatewayUnavailable::new(
                Capability::Verification,
                e.to_string(),
            )),
        };

        let result = result.map(VerificationVerdict::from);
        match &result {
            Ok(verdict) => {
                tracing::info!(verdict = verdict.as_str(), "verification answered");
                Self::record(Capability::Verification, verdict.as_str(), started);
            }
            Err(e) => {
                tracing::warn!(cause = %e.cause, "verification unavailable");
                Self::record(Capability::Verification, "unavailable", started);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn gateway(timeout_ms: u64) -> (RemoteServiceGateway, SimulatedBank, SimulatedPolice) {
        let bank = SimulatedBank::new();
        let police = SimulatedPolice::new();
        let registry = ServiceRegistry::new();
        registry
            .bind_payment(DEFAULT_PAYMENT_SERVICE, Arc::new(bank.clone()))
            .await;
        registry
            .bind_verification(DEFAULT_VERIFICATION_SERVICE, Arc::new(police.clone()))
            .await;
        let config = GatewayConfig {
            timeout: Duration::from_millis(timeout_ms),
            ..GatewayConfig::default()
        };
        (RemoteServiceGateway::new(registry, config), bank, police)
    }

    #[tokio::test]
    async fn test_payment_verdicts() {
        let (gateway, bank, _) = gateway(1000).await;

        let verdict = gateway
            .invoke_payment("CARD-ON-FILE", Money::from_units(100))
            .await
            .unwrap();
        assert_eq!(verdict, PaymentVerdict::Accepted);

        let verdict = gateway
            .invoke_payment("CARD-ON-FILE", Money::from_units(50_000))
            .await
            .unwrap();
        assert_eq!(verdict, PaymentVerdict::Declined);
        assert_eq!(bank.call_count(), 2);
    }

    #[tokio::test]
    async fn test_unbound_name_is_unavailable() {
        let (gateway, bank, _) = gateway(1000).await;
        gateway.registry().unbind(DEFAULT_PAYMENT_SERVICE).await;

        let err = gateway
            .invoke_payment("CARD-ON-FILE", Money::from_units(100))
            .await
            .unwrap_err();
        assert_eq!(err.capability, Capability::Payment);
        assert!(err.cause.contains("PaymentService"));
        assert_eq!(bank.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_is_unavailable_not_declined() {
        let (gateway, bank, _) = gateway(1000).await;
        bank.set_failure_mode(FailureMode::Unreachable).await;

        let result = gateway
            .invoke_payment("CARD-ON-FILE", Money::from_units(100))
            .await;
        assert!(matches!(
            result,
            Err(GatewayUnavailable {
                capability: Capability::Payment,
                ..
            })
        ));
        // Issued once, no retry
        assert_eq!(bank.call_count(), 1);
    }

    #[tokio::test]
    async fn test_hang_is_bounded_by_timeout() {
        let (gateway, _, police) = gateway(30).await;
        police.set_failure_mode(FailureMode::Hang).await;

        let err = gateway
            .invoke_verification("AB123", "LICENSE-CHECK")
            .await
            .unwrap_err();
        assert_eq!(err.capability, Capability::Verification);
        assert!(err.cause.contains("30ms"));
        assert_eq!(police.call_count(), 1);
    }

    #[tokio::test]
    async fn test_verification_verdicts() {
        let (gateway, _, _) = gateway(1000).await;
        assert_eq!(
            gateway
                .invoke_verification("BX00001", "LICENSE-CHECK")
                .await
                .unwrap(),
            VerificationVerdict::Flagged
        );
        assert_eq!(
            gateway
                .invoke_verification("AX00001", "LICENSE-CHECK")
                .await
                .unwrap(),
            VerificationVerdict::Clean
        );
    }

    #[tokio::test]
    async fn test_rebinding_takes_effect() {
        let (gateway, first, _) = gateway(1000).await;
        let second = SimulatedBank::new();
        gateway
            .registry()
            .bind_payment(DEFAULT_PAYMENT_SERVICE, Arc::new(second.clone()))
            .await;

        gateway
            .invoke_payment("CARD-ON-FILE", Money::from_units(1))
            .await
            .unwrap();
        assert_eq!(first.call_count(), 0);
        assert_eq!(second.call_count(), 1);
    }
}
