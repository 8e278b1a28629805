//! Shared identifier types for the rental booking system.

pub mod ids;

pub use ids::{CustomerId, PaymentId, ReservationId, VehicleId};
