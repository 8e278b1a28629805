//! Booking orchestration for the rental system.
//!
//! Payment capture and citizen verification live in remote services that
//! share no transaction with the local store and answer only yes or no.
//! This crate drives the local writes around those calls:
//!
//! 1. Check availability and persist a pending reservation and payment
//! 2. Invoke the payment capability through the gateway
//! 3. Commit the confirmed or cancelled outcome in one write
//!
//! A run interrupted between steps 1 and 3 leaves a pending pair that the
//! [`PendingReconciler`] resolves once it is older than a grace window.

pub mod availability;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod reconciliation;
pub mod registration;
pub mod saga;

pub use availability::AvailabilityIndex;
pub use error::{BookingError, Result};
pub use gateway::{
    Capability, GatewayConfig, GatewayUnavailable, PaymentVerdict, RemoteGateway,
    RemoteServiceGateway, ServiceRegistry, VerificationVerdict,
};
pub use lifecycle::LifecycleManager;
pub use reconciliation::{PendingReconciler, SweepReport};
pub use registration::{
    CustomerProfile, RegistrationGuard, RegistrationOutcome, VerificationFailurePolicy,
};
pub use saga::{BookingReceipt, BookingSaga, ReservationRequest};
