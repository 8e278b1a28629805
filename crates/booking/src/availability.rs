//! Vehicle availability over date ranges.

use common::VehicleId;
use domain::{DateRange, Reservation, Vehicle};
use rental_store::RentalStore;

use crate::error::{BookingError, Result};

/// Evaluates availability over an already-loaded vehicle and its
/// reservations.
pub fn evaluate<'a>(
    vehicle: &Vehicle,
    reservations: impl IntoIterator<Item = &'a Reservation>,
    period: &DateRange,
) -> bool {
    vehicle.available
        && !reservations.into_iter().any(|r| {
            r.vehicle_id == vehicle.id && r.status.blocks_vehicle() && r.period.overlaps(period)
        })
}

/// Answers whether a vehicle can be booked for a date range.
///
/// A vehicle is free when its `available` flag is set and none of its
/// non-cancelled reservations overlaps the range. Touching endpoints overlap.
pub struct AvailabilityIndex<S: RentalStore> {
    store: S,
}

impl<S: RentalStore> AvailabilityIndex<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Reads the vehicle and its overlapping reservations and evaluates them.
    #[tracing::instrument(skip(self))]
    pub async fn is_free(&self, vehicle_id: VehicleId, period: DateRange) -> Result<bool> {
        let (_, free) = self.inspect(vehicle_id, period).await?;
        Ok(free)
    }

    /// Like [`is_free`](Self::is_free), also returning the loaded vehicle.
    pub async fn inspect(&self, vehicle_id: VehicleId, period: DateRange) -> Result<(Vehicle, bool)> {
        let vehicle = self
            .store
            .get_vehicle(vehicle_id)
            .await?
            .ok_or_else(|| BookingError::not_found("vehicle", vehicle_id))?;
        let reservations = self
            .store
            .overlapping_reservations(vehicle_id, period)
            .await?;

        let free = evaluate(&vehicle, &reservations, &period);
        tracing::debug!(%vehicle_id, free, "availability evaluated");
        Ok((vehicle, free))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use common::CustomerId;
    use domain::{Money, ReservationStatus};
    use rental_store::InMemoryRentalStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn range(s: u32, e: u32) -> DateRange {
        DateRange::new(day(s), day(e)).unwrap()
    }

    fn vehicle() -> Vehicle {
        Vehicle::new("Tangier", "Toyota", "Yaris", Money::from_units(60))
    }

    fn reservation(vehicle: &Vehicle, period: DateRange, status: ReservationStatus) -> Reservation {
        let mut r = Reservation::pending(
            CustomerId::new(),
            vehicle.id,
            period,
            vehicle.daily_rate,
            Utc::now(),
        )
        .unwrap();
        r.status = status;
        r
    }

    #[test]
    fn test_free_without_reservations() {
        assert!(evaluate(&vehicle(), std::iter::empty(), &range(1, 3)));
    }

    #[test]
    fn test_touching_endpoint_is_not_free() {
        let v = vehicle();
        let existing = [reservation(&v, range(1, 3), ReservationStatus::Confirmed)];
        assert!(!evaluate(&v, &existing, &range(3, 5)));
        assert!(evaluate(&v, &existing, &range(4, 5)));
    }

    #[test]
    fn test_cancelled_reservations_are_ignored() {
        let v = vehicle();
        let existing = [reservation(&v, range(1, 3), ReservationStatus::Cancelled)];
        assert!(evaluate(&v, &existing, &range(2, 2)));
    }

    #[test]
    fn test_pending_and_completed_block() {
        let v = vehicle();
        let pending = [reservation(&v, range(1, 3), ReservationStatus::Pending)];
        let completed = [reservation(&v, range(1, 3), ReservationStatus::Completed)];
        assert!(!evaluate(&v, &pending, &range(2, 4)));
        assert!(!evaluate(&v, &completed, &range(2, 4)));
    }

    #[test]
    fn test_unavailable_flag_wins() {
        let mut v = vehicle();
        v.available = false;
        assert!(!evaluate(&v, std::iter::empty(), &range(1, 1)));
    }

    #[test]
    fn test_other_vehicles_ignored() {
        let v = vehicle();
        let other = vehicle();
        let existing = [reservation(&other, range(1, 3), ReservationStatus::Confirmed)];
        assert!(evaluate(&v, &existing, &range(1, 3)));
    }

    #[tokio::test]
    async fn test_is_free_reads_store() {
        let store = InMemoryRentalStore::new();
        let v = vehicle();
        store.save_vehicle(&v).await.unwrap();
        let index = AvailabilityIndex::new(store);

        assert!(index.is_free(v.id, range(1, 3)).await.unwrap());
        assert!(matches!(
            index.is_free(VehicleId::new(), range(1, 3)).await,
            Err(BookingError::NotFound {
                entity: "vehicle",
                ..
            })
        ));
    }
}
