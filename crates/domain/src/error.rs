//! Domain error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by domain rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The end date precedes the start date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    /// A status transition not allowed from the current status.
    #[error("Cannot {action} {entity} in {from} status")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        action: &'static str,
    },

    /// The computed amount does not fit in the money representation.
    #[error("Amount overflow")]
    AmountOverflow,

    /// A persisted status string that does not name a known status.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// A role string that does not name a known role.
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}
