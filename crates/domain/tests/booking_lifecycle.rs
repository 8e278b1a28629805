//! Integration tests for the reservation and payment state machines.
//!
//! These tests drive both entities through the transitions the booking flows
//! apply to them together.

use chrono::{NaiveDate, Utc};
use domain::{
    CustomerId, DateRange, DomainError, Money, Payment, PaymentStatus, Reservation,
    ReservationStatus, Vehicle,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn pending_pair(vehicle: &Vehicle, start: NaiveDate, end: NaiveDate) -> (Reservation, Payment) {
    let reservation = Reservation::pending(
        CustomerId::new(),
        vehicle.id,
        DateRange::new(start, end).unwrap(),
        vehicle.daily_rate,
        Utc::now(),
    )
    .unwrap();
    let payment = Payment::pending(
        reservation.id,
        reservation.total,
        "CARD-ON-FILE",
        reservation.created_at,
    );
    (reservation, payment)
}

mod accepted_booking {
    use super::*;

    #[test]
    fn confirm_pay_then_complete() {
        let vehicle = Vehicle::new("Casablanca", "Dacia", "Sandero", Money::from_units(50));
        let (mut reservation, mut payment) =
            pending_pair(&vehicle, date(2024, 1, 1), date(2024, 1, 3));

        assert_eq!(payment.amount, Money::from_units(100));

        reservation.confirm().unwrap();
        payment.mark_paid().unwrap();
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(payment.status, PaymentStatus::Paid);

        reservation.complete().unwrap();
        assert_eq!(reservation.status, ReservationStatus::Completed);
        assert!(reservation.status.is_terminal());

        // The payment outlives the reservation's lifecycle
        payment.refund().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
    }

    #[test]
    fn confirmed_cannot_be_declined_or_reconfirmed() {
        let vehicle = Vehicle::new("Rabat", "Peugeot", "208", Money::from_units(60));
        let (mut reservation, _) = pending_pair(&vehicle, date(2024, 2, 1), date(2024, 2, 1));
        reservation.confirm().unwrap();

        assert!(matches!(
            reservation.decline(),
            Err(DomainError::InvalidTransition { action: "decline", .. })
        ));
        assert!(reservation.confirm().is_err());
    }
}

mod declined_booking {
    use super::*;

    #[test]
    fn decline_fails_payment_and_frees_dates() {
        let vehicle = Vehicle::new("Tangier", "Hyundai", "i20", Money::from_units(45));
        let (mut reservation, mut payment) =
            pending_pair(&vehicle, date(2024, 3, 10), date(2024, 3, 12));

        reservation.decline().unwrap();
        payment.mark_failed().unwrap();

        assert_eq!(reservation.status, ReservationStatus::Cancelled);
        assert!(!reservation.status.blocks_vehicle());
        assert!(payment.refund().is_err());
        assert!(reservation.cancel().is_err());
        assert!(reservation.complete().is_err());
    }

    #[test]
    fn pending_cannot_be_cancelled_or_completed() {
        let vehicle = Vehicle::new("Fes", "Renault", "Clio", Money::from_units(40));
        let (mut reservation, _) = pending_pair(&vehicle, date(2024, 4, 1), date(2024, 4, 2));

        assert!(reservation.status.blocks_vehicle());
        assert!(reservation.cancel().is_err());
        assert!(reservation.complete().is_err());
        assert_eq!(reservation.status, ReservationStatus::Pending);
    }
}

mod overlap {
    use super::*;

    #[test]
    fn inclusive_ranges_conflict_on_shared_day() {
        let first = DateRange::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let touching = DateRange::new(date(2024, 1, 3), date(2024, 1, 5)).unwrap();
        let after = DateRange::new(date(2024, 1, 4), date(2024, 1, 5)).unwrap();

        assert!(first.overlaps(&touching));
        assert!(touching.overlaps(&first));
        assert!(!first.overlaps(&after));
    }

    #[test]
    fn reversed_range_is_rejected() {
        let result = DateRange::new(date(2024, 1, 5), date(2024, 1, 1));
        assert!(matches!(result, Err(DomainError::InvalidDateRange { .. })));
    }
}
