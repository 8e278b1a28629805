//! Account sign-up.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use booking::{CustomerProfile, RegistrationOutcome};
use domain::{Customer, Role};
use rental_store::RentalStore;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub national_id: Option<String>,
    pub license_ref: Option<String>,
}

#[derive(Serialize)]
pub struct CustomerResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: String,
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id.to_string(),
            full_name: c.full_name,
            email: c.email,
            phone: c.phone,
            role: c.role,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// POST /auth/signup: registers an account, verifying clients first.
#[tracing::instrument(skip(state, req), fields(role = %req.role))]
pub async fn signup<S: RentalStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let role: Role = req
        .role
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("{e}")))?;
    if req.full_name.trim().is_empty() || !req.email.contains('@') {
        return Err(ApiError::BadRequest(
            "full_name and a valid email are required".to_string(),
        ));
    }

    let outcome = state
        .registration
        .register_customer(CustomerProfile {
            full_name: req.full_name,
            email: req.email,
            phone: req.phone,
            role,
            national_id: req.national_id,
            license_ref: req.license_ref,
        })
        .await?;

    match outcome {
        RegistrationOutcome::Accepted(customer) => {
            Ok((StatusCode::CREATED, Json(customer.into())))
        }
        RegistrationOutcome::Rejected { reason } => Err(ApiError::Rejected(reason)),
    }
}
