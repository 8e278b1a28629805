//! Reservation booking and lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use booking::ReservationRequest;
use chrono::NaiveDate;
use common::{CustomerId, ReservationId, VehicleId};
use domain::Reservation;
use rental_store::RentalStore;
use serde::{Deserialize, Serialize};

use super::payments::PaymentResponse;
use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateReservationRequest {
    pub client_id: String,
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub payment_method: String,
    /// Accepted for form compatibility; not priced.
    #[serde(default)]
    pub insurance: Option<String>,
    /// Accepted for form compatibility; not priced.
    #[serde(default)]
    pub extras: Vec<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub client_id: String,
    pub vehicle_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_cents: i64,
    pub status: String,
    pub created_at: String,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            client_id: r.customer_id.to_string(),
            vehicle_id: r.vehicle_id.to_string(),
            start_date: r.period.start(),
            end_date: r.period.end(),
            total_cents: r.total.cents(),
            status: r.status.to_string(),
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub reservation: ReservationResponse,
    pub payment: PaymentResponse,
}

// -- Handlers --

/// POST /reservations: runs the booking saga.
///
/// A declined or unreachable payment still answers 201; the body carries the
/// CANCELLED reservation and FAILED payment.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let customer_id: CustomerId = parse_id(&req.client_id)?;
    let vehicle_id: VehicleId = parse_id(&req.vehicle_id)?;
    if req.insurance.is_some() || !req.extras.is_empty() {
        tracing::debug!(
            insurance = ?req.insurance,
            extras = req.extras.len(),
            "ignoring unpriced options"
        );
    }

    let receipt = state
        .saga
        .create_reservation(ReservationRequest {
            customer_id,
            vehicle_id,
            start: req.start_date,
            end: req.end_date,
            payment_method: req.payment_method,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            reservation: receipt.reservation.into(),
            payment: receipt.payment.into(),
        }),
    ))
}

/// GET /reservations/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation_id: ReservationId = parse_id(&id)?;
    let reservation = state
        .store
        .get_reservation(reservation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation {id} not found")))?;
    Ok(Json(reservation.into()))
}

/// GET /reservations/client/{client_id}
#[tracing::instrument(skip(state))]
pub async fn for_client<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(client_id): Path<String>,
) -> Result<Json<Vec<ReservationResponse>>, ApiError> {
    let customer_id: CustomerId = parse_id(&client_id)?;
    let reservations = state.store.reservations_for_customer(customer_id).await?;
    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}

/// PUT /reservations/{id}/cancel
#[tracing::instrument(skip(state))]
pub async fn cancel<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation_id: ReservationId = parse_id(&id)?;
    let reservation = state.lifecycle.cancel(reservation_id).await?;
    Ok(Json(reservation.into()))
}

/// POST /reservations/{id}/complete: the vehicle was returned.
#[tracing::instrument(skip(state))]
pub async fn complete<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation_id: ReservationId = parse_id(&id)?;
    let reservation = state.lifecycle.complete(reservation_id).await?;
    Ok(Json(reservation.into()))
}
