//! Payment endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::{PaymentId, ReservationId};
use domain::Payment;
use rental_store::RentalStore;
use serde::Serialize;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub reservation_id: String,
    pub amount_cents: i64,
    pub card_reference: String,
    pub status: String,
    pub created_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id.to_string(),
            reservation_id: p.reservation_id.to_string(),
            amount_cents: p.amount.cents(),
            card_reference: p.card_reference,
            status: p.status.to_string(),
            created_at: p.created_at.to_rfc3339(),
        }
    }
}

/// GET /payments
#[tracing::instrument(skip(state))]
pub async fn list<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = state.store.list_payments().await?;
    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}

/// GET /payments/reservation/{id}
#[tracing::instrument(skip(state))]
pub async fn for_reservation<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let reservation_id: ReservationId = parse_id(&id)?;
    let payment = state
        .store
        .payment_for_reservation(reservation_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No payment for reservation {id}")))?;
    Ok(Json(payment.into()))
}

/// POST /payments/{id}/refund
#[tracing::instrument(skip(state))]
pub async fn refund<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment_id: PaymentId = parse_id(&id)?;
    let payment = state.lifecycle.refund(payment_id).await?;
    Ok(Json(payment.into()))
}
