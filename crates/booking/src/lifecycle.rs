//! Reservation lifecycle after the booking saga: cancel, complete, refund.

use chrono::{NaiveDate, Utc};
use common::{PaymentId, ReservationId};
use domain::{Payment, PaymentStatus, Reservation, ReservationStatus};
use rental_store::{RentalStore, StoreError};

use crate::error::{BookingError, Result};

/// Applies lifecycle transitions to confirmed bookings.
///
/// Closing a reservation frees its vehicle unless another confirmed
/// reservation of the same vehicle reaches today or later.
pub struct LifecycleManager<S: RentalStore> {
    store: S,
}

impl<S: RentalStore> LifecycleManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Cancels a confirmed reservation.
    ///
    /// A cancelled reservation is returned unchanged. Pending and completed
    /// reservations cannot be cancelled. The payment is left as is.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.cancel_on(reservation_id, Utc::now().date_naive()).await
    }

    /// Like [`cancel`](Self::cancel), with `today` supplied by the caller.
    pub async fn cancel_on(
        &self,
        reservation_id: ReservationId,
        today: NaiveDate,
    ) -> Result<Reservation> {
        let mut reservation = self.load(reservation_id).await?;
        if reservation.status == ReservationStatus::Cancelled {
            tracing::debug!(%reservation_id, "already cancelled");
            return Ok(reservation);
        }

        let expected = reservation.status;
        reservation.cancel()?;
        let released = match self
            .store
            .close_reservation(&reservation, expected, today)
            .await
        {
            Ok(released) => released,
            // Lost a race with another cancel of the same reservation
            Err(StoreError::StaleState { .. }) => {
                let current = self.load(reservation_id).await?;
                if current.status == ReservationStatus::Cancelled {
                    tracing::debug!(%reservation_id, "cancelled concurrently");
                    return Ok(current);
                }
                return Err(BookingError::InvalidState(format!(
                    "reservation {reservation_id} moved to {} during cancel",
                    current.status
                )));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(%reservation_id, released, "reservation cancelled");
        Ok(reservation)
    }

    /// Marks a confirmed reservation as finished (vehicle returned).
    #[tracing::instrument(skip(self))]
    pub async fn complete(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.complete_on(reservation_id, Utc::now().date_naive()).await
    }

    /// Like [`complete`](Self::complete), with `today` supplied by the caller.
    pub async fn complete_on(
        &self,
        reservation_id: ReservationId,
        today: NaiveDate,
    ) -> Result<Reservation> {
        let mut reservation = self.load(reservation_id).await?;

        let expected = reservation.status;
        reservation.complete()?;
        let released = self
            .store
            .close_reservation(&reservation, expected, today)
            .await?;

        tracing::info!(%reservation_id, released, "reservation completed");
        Ok(reservation)
    }

    /// Refunds a paid payment. The reservation is not consulted.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, payment_id: PaymentId) -> Result<Payment> {
        let mut payment = self
            .store
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("payment", payment_id))?;

        payment.refund()?;
        self.store
            .update_payment(&payment, PaymentStatus::Paid)
            .await?;

        tracing::info!(%payment_id, amount = %payment.amount, "payment refunded");
        Ok(payment)
    }

    async fn load(&self, reservation_id: ReservationId) -> Result<Reservation> {
        self.store
            .get_reservation(reservation_id)
            .await?
            .ok_or_else(|| BookingError::not_found("reservation", reservation_id))
    }
}
