//! Domain layer for the rental booking system.
//!
//! This crate provides the entities the booking saga moves between states:
//! - Vehicle catalog entries with their availability flag
//! - Reservations and their status state machine
//! - Payments, one per reservation
//! - Customers and their declared role
//! - Money and inclusive date ranges

pub mod customer;
pub mod error;
pub mod payment;
pub mod reservation;
pub mod value_objects;
pub mod vehicle;

pub use common::{CustomerId, PaymentId, ReservationId, VehicleId};
pub use customer::{Customer, Role};
pub use error::DomainError;
pub use payment::{Payment, PaymentStatus};
pub use reservation::{Reservation, ReservationStatus};
pub use value_objects::{DateRange, Money};
pub use vehicle::Vehicle;
