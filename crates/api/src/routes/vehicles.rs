//! Vehicle catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::VehicleId;
use domain::{Money, Vehicle};
use rental_store::{RentalStore, RentalStoreExt};
use serde::{Deserialize, Serialize};

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub agency: String,
    pub brand: String,
    pub model: String,
    pub daily_rate_cents: i64,
}

#[derive(Serialize)]
pub struct VehicleResponse {
    pub id: String,
    pub agency: String,
    pub brand: String,
    pub model: String,
    pub daily_rate_cents: i64,
    pub available: bool,
}

impl From<Vehicle> for VehicleResponse {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id.to_string(),
            agency: v.agency,
            brand: v.brand,
            model: v.model,
            daily_rate_cents: v.daily_rate.cents(),
            available: v.available,
        }
    }
}

/// GET /vehicles
#[tracing::instrument(skip(state))]
pub async fn list<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<VehicleResponse>>, ApiError> {
    let vehicles = state.store.list_vehicles().await?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// GET /vehicles/available: vehicles whose availability flag is set.
#[tracing::instrument(skip(state))]
pub async fn available<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<VehicleResponse>>, ApiError> {
    let vehicles = state.store.list_available_vehicles().await?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// GET /vehicles/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<VehicleResponse>, ApiError> {
    let vehicle_id: VehicleId = parse_id(&id)?;
    let vehicle = state
        .store
        .get_vehicle(vehicle_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Vehicle {id} not found")))?;
    Ok(Json(vehicle.into()))
}

/// POST /vehicles: adds a catalog entry.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<VehicleResponse>), ApiError> {
    if req.daily_rate_cents <= 0 {
        return Err(ApiError::BadRequest(
            "daily_rate_cents must be positive".to_string(),
        ));
    }
    if [&req.agency, &req.brand, &req.model]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "agency, brand and model are required".to_string(),
        ));
    }

    let vehicle = Vehicle::new(
        req.agency,
        req.brand,
        req.model,
        Money::from_cents(req.daily_rate_cents),
    );
    state.store.save_vehicle(&vehicle).await?;
    tracing::info!(vehicle_id = %vehicle.id, "vehicle added to catalog");

    Ok((StatusCode::CREATED, Json(vehicle.into())))
}
