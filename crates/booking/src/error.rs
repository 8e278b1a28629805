//! Booking error types.

use domain::DomainError;
use rental_store::StoreError;
use thiserror::Error;

/// Errors returned by the booking flows.
///
/// Gateway unavailability never appears here: the saga and the guard turn it
/// into an outcome before returning.
#[derive(Debug, Error)]
pub enum BookingError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The vehicle is flagged unavailable or already booked for the range.
    #[error("Vehicle {0} is not available for the requested dates")]
    Unavailable(String),

    /// The entity is not in a status that allows the operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The request is malformed.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another account already uses this email.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    /// The bank accepted the charge but the booking was resolved meanwhile.
    /// The captured amount must be refunded by hand.
    #[error("Payment {payment_id} captured but reservation {reservation_id} was already resolved")]
    ChargeUnrecorded {
        reservation_id: String,
        payment_id: String,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(DomainError),

    /// Store error.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl BookingError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        BookingError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<DomainError> for BookingError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidTransition { .. } => BookingError::InvalidState(e.to_string()),
            DomainError::InvalidDateRange { .. } | DomainError::AmountOverflow => {
                BookingError::Validation(e.to_string())
            }
            other => BookingError::Domain(other),
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::VehicleConflict(id) => BookingError::Unavailable(id.to_string()),
            StoreError::NotFound { entity, id } => BookingError::NotFound { entity, id },
            StoreError::StaleState { .. } => BookingError::InvalidState(e.to_string()),
            StoreError::DuplicateEmail(email) => BookingError::EmailTaken(email),
            other => BookingError::Store(other),
        }
    }
}

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;

#[cfg(test)]
mod tests {
    use super::*;
    use common::VehicleId;

    #[test]
    fn test_store_conflict_maps_to_unavailable() {
        let id = VehicleId::new();
        let err: BookingError = StoreError::VehicleConflict(id).into();
        assert!(matches!(err, BookingError::Unavailable(s) if s == id.to_string()));
    }

    #[test]
    fn test_transition_maps_to_invalid_state() {
        let err: BookingError = DomainError::InvalidTransition {
            entity: "reservation",
            from: "COMPLETED",
            action: "cancel",
        }
        .into();
        assert!(matches!(err, BookingError::InvalidState(_)));
        assert_eq!(
            err.to_string(),
            "Invalid state: Cannot cancel reservation in COMPLETED status"
        );
    }

    #[test]
    fn test_amount_overflow_is_validation() {
        let err: BookingError = DomainError::AmountOverflow.into();
        assert!(matches!(err, BookingError::Validation(_)));
    }
}
