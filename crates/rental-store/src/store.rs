use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{CustomerId, PaymentId, ReservationId, VehicleId};
use domain::{
    Customer, DateRange, Payment, PaymentStatus, Reservation, ReservationStatus, Vehicle,
};

use crate::Result;

/// Final state of one booking saga run.
///
/// Written in a single transaction so that no reader observes a confirmed
/// reservation next to a payment that is not paid, or the reverse.
#[derive(Debug, Clone, Copy)]
pub struct BookingOutcome<'a> {
    pub reservation: &'a Reservation,
    pub payment: &'a Payment,
    /// New value for the vehicle's availability flag, if it changes.
    pub vehicle_available: Option<bool>,
}

/// Core trait for rental store implementations.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// Inserts or replaces a catalog entry.
    async fn save_vehicle(&self, vehicle: &Vehicle) -> Result<()>;

    async fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>>;

    /// Lists every vehicle, ordered by brand then model.
    async fn list_vehicles(&self) -> Result<Vec<Vehicle>>;

    /// Inserts a new customer.
    ///
    /// Fails with `DuplicateEmail` if the email is already registered.
    async fn insert_customer(&self, customer: &Customer) -> Result<()>;

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    async fn email_registered(&self, email: &str) -> Result<bool>;

    async fn get_reservation(&self, id: ReservationId) -> Result<Option<Reservation>>;

    /// Lists a customer's reservations, oldest first.
    async fn reservations_for_customer(&self, customer_id: CustomerId)
    -> Result<Vec<Reservation>>;

    /// Returns the non-cancelled reservations of a vehicle whose range
    /// overlaps `period`.
    async fn overlapping_reservations(
        &self,
        vehicle_id: VehicleId,
        period: DateRange,
    ) -> Result<Vec<Reservation>>;

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;

    async fn payment_for_reservation(&self, reservation_id: ReservationId)
    -> Result<Option<Payment>>;

    /// Lists every payment, oldest first.
    async fn list_payments(&self) -> Result<Vec<Payment>>;

    /// Returns payments still pending that were created before `cutoff`.
    async fn stale_pending_payments(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>>;

    /// Persists a pending reservation and its pending payment together.
    ///
    /// The vehicle flag and the overlap rule are re-checked inside the same
    /// critical section as the insert; a concurrent booking that committed
    /// first makes this fail with `VehicleConflict`.
    async fn insert_pending(&self, reservation: &Reservation, payment: &Payment) -> Result<()>;

    /// Records the outcome of a saga run.
    ///
    /// Both stored rows must still be pending, otherwise `StaleState`.
    async fn commit_outcome(&self, outcome: BookingOutcome<'_>) -> Result<()>;

    /// Writes a lifecycle transition of a reservation.
    ///
    /// The stored status must equal `expected`. The vehicle is flagged
    /// available again unless another confirmed reservation of it reaches
    /// `today` or later. Returns whether the vehicle was released.
    async fn close_reservation(
        &self,
        reservation: &Reservation,
        expected: ReservationStatus,
        today: NaiveDate,
    ) -> Result<bool>;

    /// Writes a payment status change; the stored status must equal `expected`.
    async fn update_payment(&self, payment: &Payment, expected: PaymentStatus) -> Result<()>;
}

/// Extension trait providing convenience methods for rental stores.
#[async_trait]
pub trait RentalStoreExt: RentalStore {
    /// Lists vehicles whose availability flag is set.
    async fn list_available_vehicles(&self) -> Result<Vec<Vehicle>> {
        let vehicles = self.list_vehicles().await?;
        Ok(vehicles.into_iter().filter(|v| v.available).collect())
    }
}

// Blanket implementation for all RentalStore implementations
impl<T: RentalStore + ?Sized> RentalStoreExt for T {}
