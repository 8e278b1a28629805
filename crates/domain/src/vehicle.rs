//! Vehicle catalog entry.

use common::VehicleId;
use serde::{Deserialize, Serialize};

use crate::value_objects::Money;

/// A rentable vehicle.
///
/// Vehicles are owned by the catalog. The booking flows only flip
/// `available`; they never create or delete vehicles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Reference of the agency that owns the vehicle.
    pub agency: String,
    pub brand: String,
    pub model: String,
    pub daily_rate: Money,
    pub available: bool,
}

impl Vehicle {
    /// Creates an available vehicle with a fresh id.
    pub fn new(
        agency: impl Into<String>,
        brand: impl Into<String>,
        model: impl Into<String>,
        daily_rate: Money,
    ) -> Self {
        Self {
            id: VehicleId::new(),
            agency: agency.into(),
            brand: brand.into(),
            model: model.into(),
            daily_rate,
            available: true,
        }
    }
}
