//! HTTP front for the simulated bank and police service.
//!
//! Speaks the same JSON contract as the gateway's HTTP clients, so a local
//! run can point `PAYMENT_SERVICE_URL` and `VERIFICATION_SERVICE_URL` here.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use booking::gateway::remote::{
    PROCESS_PAYMENT_PATH, ProcessPaymentRequest, RemoteAnswer, RemoteError, VERIFY_CITIZEN_PATH,
    VerifyCitizenRequest,
};
use booking::gateway::{
    FailureMode, PaymentCapability, SimulatedBank, SimulatedPolice, VerificationCapability,
};
use domain::Money;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Body of `PUT /failure-mode`.
#[derive(Debug, Deserialize)]
pub struct FailureModeRequest {
    pub mode: String,
}

fn parse_mode(raw: &str) -> Option<FailureMode> {
    match raw.to_ascii_lowercase().as_str() {
        "healthy" => Some(FailureMode::Healthy),
        "unreachable" => Some(FailureMode::Unreachable),
        "hang" => Some(FailureMode::Hang),
        _ => None,
    }
}

fn answer(result: Result<bool, RemoteError>) -> Response {
    match result {
        Ok(approved) => Json(RemoteAnswer { approved }).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

async fn process_payment(
    State(bank): State<SimulatedBank>,
    Json(req): Json<ProcessPaymentRequest>,
) -> Response {
    answer(
        bank.process_payment(&req.card_reference, Money::from_cents(req.amount_cents))
            .await,
    )
}

async fn verify_citizen(
    State(police): State<SimulatedPolice>,
    Json(req): Json<VerifyCitizenRequest>,
) -> Response {
    answer(police.verify_citizen(&req.national_id, &req.license_ref).await)
}

async fn set_bank_mode(
    State(bank): State<SimulatedBank>,
    Json(req): Json<FailureModeRequest>,
) -> StatusCode {
    match parse_mode(&req.mode) {
        Some(mode) => {
            bank.set_failure_mode(mode).await;
            tracing::info!(?mode, "bank failure mode changed");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::BAD_REQUEST,
    }
}

async fn set_police_mode(
    State(police): State<SimulatedPolice>,
    Json(req): Json<FailureModeRequest>,
) -> StatusCode {
    match parse_mode(&req.mode) {
        Some(mode) => {
            police.set_failure_mode(mode).await;
            tracing::info!(?mode, "police failure mode changed");
            StatusCode::NO_CONTENT
        }
        None => StatusCode::BAD_REQUEST,
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Router of the simulated bank.
pub fn payment_router(bank: SimulatedBank) -> Router {
    Router::new()
        .route(PROCESS_PAYMENT_PATH, post(process_payment))
        .route("/failure-mode", put(set_bank_mode))
        .route("/health", get(health))
        .with_state(bank)
        .layer(TraceLayer::new_for_http())
}

/// Router of the simulated police service.
pub fn verification_router(police: SimulatedPolice) -> Router {
    Router::new()
        .route(VERIFY_CITIZEN_PATH, post(verify_citizen))
        .route("/failure-mode", put(set_police_mode))
        .route("/health", get(health))
        .with_state(police)
        .layer(TraceLayer::new_for_http())
}
