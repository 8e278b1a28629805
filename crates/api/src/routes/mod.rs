//! HTTP route handlers.

pub mod auth;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod reservations;
pub mod vehicles;

use std::str::FromStr;

use booking::{
    BookingSaga, LifecycleManager, RegistrationGuard, RemoteServiceGateway,
    VerificationFailurePolicy,
};
use rental_store::RentalStore;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RentalStore> {
    pub store: S,
    pub saga: BookingSaga<S, RemoteServiceGateway>,
    pub registration: RegistrationGuard<S, RemoteServiceGateway>,
    pub lifecycle: LifecycleManager<S>,
}

impl<S: RentalStore + Clone> AppState<S> {
    pub fn new(
        store: S,
        gateway: RemoteServiceGateway,
        policy: VerificationFailurePolicy,
    ) -> Self {
        Self {
            saga: BookingSaga::new(store.clone(), gateway.clone()),
            registration: RegistrationGuard::new(store.clone(), gateway, policy),
            lifecycle: LifecycleManager::new(store.clone()),
            store,
        }
    }
}

/// Parses a path or body identifier.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = uuid::Error>,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
