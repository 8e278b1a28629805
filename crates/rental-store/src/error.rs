use common::VehicleId;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the rental store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The vehicle is flagged unavailable or already has a non-cancelled
    /// reservation overlapping the requested range.
    #[error("Vehicle {0} is not available for the requested range")]
    VehicleConflict(VehicleId),

    /// A guarded write found the row in a different status than expected.
    #[error("Stale {entity} {id}: expected {expected}, found {actual}")]
    StaleState {
        entity: &'static str,
        id: String,
        expected: &'static str,
        actual: String,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another customer already registered this email.
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// A stored value could not be mapped back to a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
