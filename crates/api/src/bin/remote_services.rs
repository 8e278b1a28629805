//! Simulated bank and police service for local runs.

use api::config::RemoteServicesConfig;
use api::remote_services::{payment_router, verification_router};
use booking::gateway::{SimulatedBank, SimulatedPolice};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RemoteServicesConfig::from_env();

    let payment_addr = config.payment_addr();
    let payment_listener = tokio::net::TcpListener::bind(&payment_addr)
        .await
        .expect("failed to bind payment address");
    let verification_addr = config.verification_addr();
    let verification_listener = tokio::net::TcpListener::bind(&verification_addr)
        .await
        .expect("failed to bind verification address");

    tracing::info!(%payment_addr, %verification_addr, "starting simulated remote services");

    let payment = async {
        axum::serve(payment_listener, payment_router(SimulatedBank::new())).await
    };
    let verification = async {
        axum::serve(
            verification_listener,
            verification_router(SimulatedPolice::new()),
        )
        .await
    };

    tokio::select! {
        result = payment => result.expect("payment service error"),
        result = verification => result.expect("verification service error"),
        _ = tokio::signal::ctrl_c() => tracing::info!("received SIGINT, shutting down"),
    }
}
