//! Reservation entity and its status state machine.

use chrono::{DateTime, Utc};
use common::{CustomerId, ReservationId, VehicleId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{DateRange, Money};

/// The status of a reservation in its lifecycle.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed ──┬──► Completed
///           │                └──► Cancelled
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Written before the payment call; outcome not yet known.
    #[default]
    Pending,

    /// Payment captured, vehicle held.
    Confirmed,

    /// Declined, unreachable payment, or cancelled later (terminal state).
    Cancelled,

    /// Rental finished, beyond cancellation (terminal state).
    Completed,
}

impl ReservationStatus {
    /// Returns true if the payment outcome may still be recorded.
    pub fn awaits_outcome(&self) -> bool {
        matches!(self, ReservationStatus::Pending)
    }

    /// Returns true if a confirmed booking may be cancelled from this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed)
    }

    /// Returns true if the rental can be marked as finished.
    pub fn can_complete(&self) -> bool {
        matches!(self, ReservationStatus::Confirmed)
    }

    /// Returns true if the reservation takes part in availability checks.
    pub fn blocks_vehicle(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Cancelled | ReservationStatus::Completed
        )
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ReservationStatus::Pending),
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELLED" => Ok(ReservationStatus::Cancelled),
            "COMPLETED" => Ok(ReservationStatus::Completed),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// A booking of one vehicle by one customer over an inclusive date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub period: DateRange,
    pub total: Money,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Creates a pending reservation priced at `max(1, days) * daily_rate`.
    pub fn pending(
        customer_id: CustomerId,
        vehicle_id: VehicleId,
        period: DateRange,
        daily_rate: Money,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            id: ReservationId::new(),
            customer_id,
            vehicle_id,
            period,
            total: daily_rate.times(period.billable_days())?,
            status: ReservationStatus::Pending,
            created_at,
        })
    }

    /// Records an accepted payment.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.transition(ReservationStatus::awaits_outcome, "confirm")?;
        self.status = ReservationStatus::Confirmed;
        Ok(())
    }

    /// Records a declined or unreachable payment.
    pub fn decline(&mut self) -> Result<(), DomainError> {
        self.transition(ReservationStatus::awaits_outcome, "decline")?;
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }

    /// Cancels a confirmed booking.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition(ReservationStatus::can_cancel, "cancel")?;
        self.status = ReservationStatus::Cancelled;
        Ok(())
    }

    /// Marks a confirmed booking as finished.
    pub fn complete(&mut self) -> Result<(), DomainError> {
        self.transition(ReservationStatus::can_complete, "complete")?;
        self.status = ReservationStatus::Completed;
        Ok(())
    }

    fn transition(
        &self,
        allowed: fn(&ReservationStatus) -> bool,
        action: &'static str,
    ) -> Result<(), DomainError> {
        if allowed(&self.status) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                entity: "reservation",
                from: self.status.as_str(),
                action,
            })
        }
    }
}
