//! Booking saga: reserve a vehicle and capture its payment in one request.
//!
//! ```text
//! START → availability check → AVAILABLE | Unavailable error
//! AVAILABLE → pending reservation + pending payment written → payment call
//!   → Accepted → CONFIRMED + PAID, vehicle.available = false
//!   → Declined | unavailable → CANCELLED + FAILED, vehicle untouched
//! ```

use chrono::{NaiveDate, Utc};
use common::{CustomerId, VehicleId};
use domain::{DateRange, Payment, Reservation};
use rental_store::{BookingOutcome, RentalStore, StoreError};
use serde::Serialize;

use crate::availability::AvailabilityIndex;
use crate::error::{BookingError, Result};
use crate::gateway::{PaymentVerdict, RemoteGateway};

/// Card token used when the customer pays at the agency.
pub const CASH_TOKEN: &str = "CASH-AGENCY";

/// Card token used for every other payment method.
pub const CARD_TOKEN: &str = "CARD-ON-FILE";

/// Maps a payment method to the opaque token sent to the bank.
pub fn card_reference_for(payment_method: &str) -> &'static str {
    if payment_method.trim().eq_ignore_ascii_case("cash") {
        CASH_TOKEN
    } else {
        CARD_TOKEN
    }
}

/// A request to book a vehicle.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub customer_id: CustomerId,
    pub vehicle_id: VehicleId,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub payment_method: String,
}

/// Final state of a booking that passed the availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingReceipt {
    pub reservation: Reservation,
    pub payment: Payment,
}

/// Orchestrates the booking of a vehicle.
///
/// Payment fails closed: an unavailable payment service cancels the booking
/// exactly like a declined charge.
pub struct BookingSaga<S, G>
where
    S: RentalStore,
    G: RemoteGateway,
{
    store: S,
    availability: AvailabilityIndex<S>,
    gateway: G,
}

impl<S, G> BookingSaga<S, G>
where
    S: RentalStore + Clone,
    G: RemoteGateway,
{
    /// Creates a new booking saga.
    pub fn new(store: S, gateway: G) -> Self {
        let availability = AvailabilityIndex::new(store.clone());
        Self {
            store,
            availability,
            gateway,
        }
    }

    pub fn availability(&self) -> &AvailabilityIndex<S> {
        &self.availability
    }

    /// Books a vehicle and captures its payment.
    ///
    /// Past the availability check this always leaves exactly one reservation
    /// and one payment behind, either CONFIRMED/PAID or CANCELLED/FAILED.
    #[tracing::instrument(skip(self), fields(saga_type = "Booking"))]
    pub async fn create_reservation(&self, request: ReservationRequest) -> Result<BookingReceipt> {
        metrics::counter!("booking_saga_runs_total").increment(1);
        let saga_start = std::time::Instant::now();

        // 1. Validate and load
        let period = DateRange::new(request.start, request.end)?;

        self.store
            .get_customer(request.customer_id)
            .await?
            .ok_or_else(|| BookingError::not_found("customer", request.customer_id))?;

        let (vehicle, free) = self.availability.inspect(request.vehicle_id, period).await?;
        if !free {
            tracing::info!(vehicle_id = %vehicle.id, "vehicle unavailable, nothing written");
            return Err(BookingError::Unavailable(vehicle.id.to_string()));
        }

        // 2. Persist the pending pair
        let now = Utc::now();
        let mut reservation = Reservation::pending(
            request.customer_id,
            vehicle.id,
            period,
            vehicle.daily_rate,
            now,
        )?;
        let mut payment = Payment::pending(
            reservation.id,
            reservation.total,
            card_reference_for(&request.payment_method),
            now,
        );
        self.store.insert_pending(&reservation, &payment).await?;
        tracing::info!(
            reservation_id = %reservation.id,
            total = %reservation.total,
            "pending reservation written"
        );

        // 3. Remote payment call, outside any local transaction
        let verdict = match self
            .gateway
            .invoke_payment(&payment.card_reference, payment.amount)
            .await
        {
            Ok(verdict) => verdict,
            Err(unavailable) => {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    cause = %unavailable.cause,
                    "payment service unavailable, failing closed"
                );
                PaymentVerdict::Declined
            }
        };

        // 4. Commit the outcome in one write
        let vehicle_available = match verdict {
            PaymentVerdict::Accepted => {
                reservation.confirm()?;
                payment.mark_paid()?;
                Some(false)
            }
            PaymentVerdict::Declined => {
                reservation.decline()?;
                payment.mark_failed()?;
                None
            }
        };
        let committed = self
            .store
            .commit_outcome(BookingOutcome {
                reservation: &reservation,
                payment: &payment,
                vehicle_available,
            })
            .await;
        match committed {
            Ok(()) => {}
            // The reconciler resolved the pair while the bank was capturing
            Err(StoreError::StaleState { .. }) if verdict == PaymentVerdict::Accepted => {
                metrics::counter!("booking_saga_charge_unrecorded_total").increment(1);
                tracing::error!(
                    reservation_id = %reservation.id,
                    payment_id = %payment.id,
                    amount = %payment.amount,
                    "charge captured after booking was resolved, refund required"
                );
                return Err(BookingError::ChargeUnrecorded {
                    reservation_id: reservation.id.to_string(),
                    payment_id: payment.id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("booking_saga_duration_seconds").record(duration);
        match verdict {
            PaymentVerdict::Accepted => {
                metrics::counter!("booking_saga_confirmed_total").increment(1)
            }
            PaymentVerdict::Declined => {
                metrics::counter!("booking_saga_cancelled_total").increment(1)
            }
        }
        tracing::info!(
            reservation_id = %reservation.id,
            status = %reservation.status,
            duration,
            "booking saga finished"
        );

        Ok(BookingReceipt {
            reservation,
            payment,
        })
    }
}
