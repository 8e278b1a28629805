//! Registration guard: citizen verification before account creation.

use chrono::Utc;
use common::CustomerId;
use domain::{Customer, Role};
use rental_store::RentalStore;

use crate::error::{BookingError, Result};
use crate::gateway::{RemoteGateway, VerificationVerdict};

/// License reference sent when the profile does not carry one.
pub const DEFAULT_LICENSE_REF: &str = "LICENSE-CHECK";

/// What to do when the verification service cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerificationFailurePolicy {
    /// Admit the registration without a verdict.
    #[default]
    FailOpen,
    /// Reject the registration.
    FailClosed,
}

impl VerificationFailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationFailurePolicy::FailOpen => "open",
            VerificationFailurePolicy::FailClosed => "closed",
        }
    }
}

impl std::str::FromStr for VerificationFailurePolicy {
    type Err = BookingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" | "fail-open" | "fail_open" => Ok(VerificationFailurePolicy::FailOpen),
            "closed" | "fail-closed" | "fail_closed" => Ok(VerificationFailurePolicy::FailClosed),
            other => Err(BookingError::Validation(format!(
                "unknown verification failure policy: {other}"
            ))),
        }
    }
}

/// Sign-up data for a new account.
#[derive(Debug, Clone)]
pub struct CustomerProfile {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub national_id: Option<String>,
    pub license_ref: Option<String>,
}

/// Result of a registration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Accepted(Customer),
    Rejected { reason: String },
}

/// Creates customer accounts, verifying clients against the police service.
pub struct RegistrationGuard<S, G>
where
    S: RentalStore,
    G: RemoteGateway,
{
    store: S,
    gateway: G,
    policy: VerificationFailurePolicy,
}

impl<S, G> RegistrationGuard<S, G>
where
    S: RentalStore,
    G: RemoteGateway,
{
    pub fn new(store: S, gateway: G, policy: VerificationFailurePolicy) -> Self {
        Self {
            store,
            gateway,
            policy,
        }
    }

    pub fn policy(&self) -> VerificationFailurePolicy {
        self.policy
    }

    /// Registers a customer.
    ///
    /// Only the client role is verified. A flagged citizen is rejected and
    /// nothing is stored.
    #[tracing::instrument(skip(self, profile), fields(role = %profile.role))]
    pub async fn register_customer(
        &self,
        mut profile: CustomerProfile,
    ) -> Result<RegistrationOutcome> {
        profile.email = normalize_email(&profile.email)?;
        if self.store.email_registered(&profile.email).await? {
            return Err(BookingError::EmailTaken(profile.email));
        }

        if profile.role.requires_verification() {
            let national_id = profile
                .national_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| {
                    BookingError::Validation("national id is required for clients".to_string())
                })?;
            let license_ref = profile.license_ref.as_deref().unwrap_or(DEFAULT_LICENSE_REF);

            match self
                .gateway
                .invoke_verification(national_id, license_ref)
                .await
            {
                Ok(VerificationVerdict::Clean) => {}
                Ok(VerificationVerdict::Flagged) => {
                    return Ok(Self::reject("citizen verification failed".to_string()));
                }
                Err(unavailable) => match self.policy {
                    VerificationFailurePolicy::FailOpen => {
                        tracing::warn!(
                            cause = %unavailable.cause,
                            "verification unavailable, admitting under fail-open policy"
                        );
                    }
                    VerificationFailurePolicy::FailClosed => {
                        return Ok(Self::reject(format!(
                            "verification service unavailable: {}",
                            unavailable.cause
                        )));
                    }
                },
            }
        }

        let customer = Customer {
            id: CustomerId::new(),
            full_name: profile.full_name,
            email: profile.email,
            phone: profile.phone,
            role: profile.role,
            national_id: profile.national_id,
            created_at: Utc::now(),
        };
        self.store.insert_customer(&customer).await?;

        metrics::counter!("registrations_total", "outcome" => "accepted").increment(1);
        tracing::info!(customer_id = %customer.id, "customer registered");
        Ok(RegistrationOutcome::Accepted(customer))
    }

    fn reject(reason: String) -> RegistrationOutcome {
        metrics::counter!("registrations_total", "outcome" => "rejected").increment(1);
        tracing::info!(%reason, "registration rejected");
        RegistrationOutcome::Rejected { reason }
    }
}

/// Emails are stored trimmed and lowercased so every store compares them the same way.
fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err(BookingError::Validation("email is required".to_string()));
    }
    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rental_store::InMemoryRentalStore;

    use crate::gateway::{
        DEFAULT_VERIFICATION_SERVICE, FailureMode, GatewayConfig, RemoteServiceGateway,
        ServiceRegistry, SimulatedPolice,
    };

    async fn guard(
        policy: VerificationFailurePolicy,
    ) -> (
        RegistrationGuard<InMemoryRentalStore, RemoteServiceGateway>,
        InMemoryRentalStore,
        SimulatedPolice,
    ) {
        let store = InMemoryRentalStore::new();
        let police = SimulatedPolice::new();
        let registry = ServiceRegistry::new();
        registry
            .bind_verification(DEFAULT_VERIFICATION_SERVICE, Arc::new(police.clone()))
            .await;
        let gateway = RemoteServiceGateway::new(
            registry,
            GatewayConfig {
                timeout: Duration::from_millis(50),
                ..GatewayConfig::default()
            },
        );
        (
            RegistrationGuard::new(store.clone(), gateway, policy),
            store,
            police,
        )
    }

    fn profile(role: Role, national_id: Option<&str>) -> CustomerProfile {
        CustomerProfile {
            full_name: "Omar Tazi".to_string(),
            email: "omar@example.com".to_string(),
            phone: Some("+212611111111".to_string()),
            role,
            national_id: national_id.map(str::to_string),
            license_ref: None,
        }
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!(
            "open".parse::<VerificationFailurePolicy>().unwrap(),
            VerificationFailurePolicy::FailOpen
        );
        assert_eq!(
            "Fail-Closed".parse::<VerificationFailurePolicy>().unwrap(),
            VerificationFailurePolicy::FailClosed
        );
        assert!("maybe".parse::<VerificationFailurePolicy>().is_err());
        assert_eq!(
            VerificationFailurePolicy::default(),
            VerificationFailurePolicy::FailOpen
        );
    }

    #[tokio::test]
    async fn test_clean_client_accepted() {
        let (guard, store, police) = guard(VerificationFailurePolicy::FailOpen).await;
        let outcome = guard
            .register_customer(profile(Role::Client, Some("AB123456")))
            .await
            .unwrap();

        let RegistrationOutcome::Accepted(customer) = outcome else {
            panic!("expected accepted registration");
        };
        assert!(store.get_customer(customer.id).await.unwrap().is_some());
        assert_eq!(police.call_count(), 1);
    }

    #[tokio::test]
    async fn test_flagged_client_rejected_and_not_stored() {
        let (guard, store, _) = guard(VerificationFailurePolicy::FailOpen).await;
        let outcome = guard
            .register_customer(profile(Role::Client, Some("BE777777")))
            .await
            .unwrap();

        assert!(matches!(outcome, RegistrationOutcome::Rejected { .. }));
        assert!(!store.email_registered("omar@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_skips_verification() {
        let (guard, _, police) = guard(VerificationFailurePolicy::FailClosed).await;
        police.set_failure_mode(FailureMode::Unreachable).await;

        let outcome = guard
            .register_customer(profile(Role::Owner, None))
            .await
            .unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Accepted(_)));
        assert_eq!(police.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_fail_open_admits() {
        let (guard, _, police) = guard(VerificationFailurePolicy::FailOpen).await;
        police.set_failure_mode(FailureMode::Hang).await;

        let outcome = guard
            .register_customer(profile(Role::Client, Some("AB1")))
            .await
            .unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Accepted(_)));
    }

    #[tokio::test]
    async fn test_unavailable_fail_closed_rejects() {
        let (guard, store, police) = guard(VerificationFailurePolicy::FailClosed).await;
        police.set_failure_mode(FailureMode::Unreachable).await;

        let outcome = guard
            .register_customer(profile(Role::Client, Some("AB1")))
            .await
            .unwrap();
        assert!(matches!(outcome, RegistrationOutcome::Rejected { .. }));
        assert!(!store.email_registered("omar@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_checked_before_verification() {
        let (guard, _, police) = guard(VerificationFailurePolicy::FailOpen).await;
        guard
            .register_customer(profile(Role::Client, Some("AB1")))
            .await
            .unwrap();

        let result = guard
            .register_customer(profile(Role::Client, Some("AB2")))
            .await;
        assert!(matches!(result, Err(BookingError::EmailTaken(_))));
        assert_eq!(police.call_count(), 1);
    }

    #[tokio::test]
    async fn test_client_without_national_id() {
        let (guard, _, police) = guard(VerificationFailurePolicy::FailOpen).await;
        let result = guard.register_customer(profile(Role::Client, None)).await;
        assert!(matches!(result, Err(BookingError::Validation(_))));
        assert_eq!(police.call_count(), 0);
    }

    #[tokio::test]
    async fn test_email_stored_normalized() {
        let (guard, store, _) = guard(VerificationFailurePolicy::FailOpen).await;
        let mut mixed = profile(Role::Owner, None);
        mixed.email = "  Mixed@Example.COM ".to_string();

        let RegistrationOutcome::Accepted(customer) = guard.register_customer(mixed).await.unwrap()
        else {
            panic!("expected accepted registration");
        };
        assert_eq!(customer.email, "mixed@example.com");
        let stored = store.get_customer(customer.id).await.unwrap().unwrap();
        assert_eq!(stored.email, "mixed@example.com");

        let mut again = profile(Role::Owner, None);
        again.email = "MIXED@example.com".to_string();
        let result = guard.register_customer(again).await;
        assert!(matches!(result, Err(BookingError::EmailTaken(email)) if email == "mixed@example.com"));
    }

    #[tokio::test]
    async fn test_blank_email_rejected() {
        let (guard, store, _) = guard(VerificationFailurePolicy::FailOpen).await;
        let mut blank = profile(Role::Owner, None);
        blank.email = "   ".to_string();

        let result = guard.register_customer(blank).await;
        assert!(matches!(result, Err(BookingError::Validation(_))));
        assert!(!store.email_registered("").await.unwrap());
    }
}
