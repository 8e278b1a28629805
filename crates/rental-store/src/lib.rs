//! Persistence for the rental booking system.
//!
//! The booking flows only need load/save by identifier plus three guarded
//! writes (pending insert, outcome commit, lifecycle close). Both
//! implementations make each guarded write atomic for readers.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryRentalStore;
pub use postgres::PostgresRentalStore;
pub use store::{BookingOutcome, RentalStore, RentalStoreExt};
