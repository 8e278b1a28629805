//! Payment entity, one per reservation.

use chrono::{DateTime, Utc};
use common::{PaymentId, ReservationId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::Money;

/// The status of a payment.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Paid ──► Refunded
///           └──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// The payment attached to exactly one reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub amount: Money,
    /// Opaque token handed to the payment capability.
    pub card_reference: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a pending payment for a reservation total.
    pub fn pending(
        reservation_id: ReservationId,
        amount: Money,
        card_reference: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            reservation_id,
            amount,
            card_reference: card_reference.into(),
            status: PaymentStatus::Pending,
            created_at,
        }
    }

    pub fn mark_paid(&mut self) -> Result<(), DomainError> {
        self.require(PaymentStatus::Pending, "mark paid")?;
        self.status = PaymentStatus::Paid;
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<(), DomainError> {
        self.require(PaymentStatus::Pending, "mark failed")?;
        self.status = PaymentStatus::Failed;
        Ok(())
    }

    /// Refunds a captured payment.
    pub fn refund(&mut self) -> Result<(), DomainError> {
        self.require(PaymentStatus::Paid, "refund")?;
        self.status = PaymentStatus::Refunded;
        Ok(())
    }

    fn require(&self, expected: PaymentStatus, action: &'static str) -> Result<(), DomainError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                entity: "payment",
                from: self.status.as_str(),
                action,
            })
        }
    }
}
