//! HTTP API server for the rental booking system.
//!
//! Exposes the vehicle catalog, the booking saga, the reservation lifecycle
//! and account sign-up over REST, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod remote_services;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use booking::{GatewayConfig, RemoteServiceGateway, ServiceRegistry};
use metrics_exporter_prometheus::PrometheusHandle;
use rental_store::RentalStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RentalStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/auth/signup", post(routes::auth::signup::<S>))
        .route(
            "/vehicles",
            get(routes::vehicles::list::<S>).post(routes::vehicles::create::<S>),
        )
        .route("/vehicles/available", get(routes::vehicles::available::<S>))
        .route("/vehicles/{id}", get(routes::vehicles::get::<S>))
        .route("/reservations", post(routes::reservations::create::<S>))
        .route("/reservations/{id}", get(routes::reservations::get::<S>))
        .route(
            "/reservations/client/{client_id}",
            get(routes::reservations::for_client::<S>),
        )
        .route(
            "/reservations/{id}/cancel",
            put(routes::reservations::cancel::<S>),
        )
        .route(
            "/reservations/{id}/complete",
            post(routes::reservations::complete::<S>),
        )
        .route("/payments", get(routes::payments::list::<S>))
        .route(
            "/payments/reservation/{id}",
            get(routes::payments::for_reservation::<S>),
        )
        .route("/payments/{id}/refund", post(routes::payments::refund::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state with HTTP clients bound for both remotes.
pub async fn create_default_state<S: RentalStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    let registry = ServiceRegistry::with_http_endpoints(
        &config.payment_service_name,
        &config.payment_service_url,
        &config.verification_service_name,
        &config.verification_service_url,
    )
    .await;
    create_state_with_registry(store, registry, config)
}

/// Creates the application state over an already populated registry.
pub fn create_state_with_registry<S: RentalStore + Clone + 'static>(
    store: S,
    registry: ServiceRegistry,
    config: &Config,
) -> Arc<AppState<S>> {
    let gateway = RemoteServiceGateway::new(
        registry,
        GatewayConfig {
            payment_service: config.payment_service_name.clone(),
            verification_service: config.verification_service_name.clone(),
            timeout: config.gateway_timeout,
        },
    );
    Arc::new(AppState::new(store, gateway, config.verification_policy))
}
