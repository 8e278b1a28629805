//! Simulated remote services.
//!
//! Used by tests and served over HTTP by the `remote-services` binary.
//! Both simulators count calls and can be switched into a failure mode.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use domain::Money;
use tokio::sync::RwLock;

use super::remote::{PaymentCapability, RemoteError, VerificationCapability};

/// Amount at or above which the simulated bank declines a charge.
pub const PAYMENT_CEILING: Money = Money::from_cents(5_000_000);

/// How a simulator behaves when called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Answers normally.
    #[default]
    Healthy,
    /// Fails immediately with a transport error.
    Unreachable,
    /// Never answers.
    Hang,
}

#[derive(Debug, Default)]
struct SimulatorState {
    mode: RwLock<FailureMode>,
    calls: AtomicUsize,
}

impl SimulatorState {
    /// Records a call and applies the failure mode.
    async fn enter(&self, service: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mode = *self.mode.read().await;
        match mode {
            FailureMode::Healthy => Ok(()),
            FailureMode::Unreachable => Err(RemoteError::Transport(format!(
                "{service}: connection refused"
            ))),
            FailureMode::Hang => std::future::pending().await,
        }
    }
}

/// Bank that accepts any charge below [`PAYMENT_CEILING`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedBank {
    state: Arc<SimulatorState>,
}

impl SimulatedBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure_mode(&self, mode: FailureMode) {
        *self.state.mode.write().await = mode;
    }

    /// Returns the number of payment calls received.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentCapability for SimulatedBank {
    async fn process_payment(
        &self,
        card_reference: &str,
        amount: Money,
    ) -> Result<bool, RemoteError> {
        self.state.enter("bank").await?;
        let accepted = amount < PAYMENT_CEILING;
        tracing::info!(card_reference, %amount, accepted, "bank charge evaluated");
        Ok(accepted)
    }
}

/// Police service that flags national ids starting with `B`.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPolice {
    state: Arc<SimulatorState>,
}

impl SimulatedPolice {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failure_mode(&self, mode: FailureMode) {
        *self.state.mode.write().await = mode;
    }

    /// Returns the number of verification calls received.
    pub fn call_count(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationCapability for SimulatedPolice {
    async fn verify_citizen(
        &self,
        national_id: &str,
        license_ref: &str,
    ) -> Result<bool, RemoteError> {
        self.state.enter("police").await?;
        let clean = !national_id.starts_with('B');
        tracing::info!(national_id, license_ref, clean, "citizen record checked");
        Ok(clean)
    }
}
