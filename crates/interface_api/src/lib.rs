//! HTTP API for the rental billing engine
//!
//! Axum routes over the repositories: price history management, usage
//! recording, contract lifecycle, invoice assembly and payment
//! reconciliation. Every `/api/v1` route requires a bearer token and is
//! audit-logged; handlers check that the acting landlord owns the property
//! the target belongs to.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use config::ApiConfig;
pub use error::ApiError;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
}

/// Builds the application router
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(price_routes())
        .merge(usage_routes())
        .merge(contract_routes())
        .merge(invoice_routes())
        .layer(from_fn(middleware::audit_middleware))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/ready", get(handlers::health::readiness))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn price_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/prices",
            post(handlers::pricing::create_price).get(handlers::pricing::list_prices),
        )
        .route("/prices/:id", axum::routing::delete(handlers::pricing::delete_price))
}

fn usage_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/rooms/:room_id/usage",
            post(handlers::metering::record_usage).get(handlers::metering::list_usage),
        )
        .route("/usage/:id/cancel", post(handlers::metering::cancel_usage))
        .route("/usage/:id", put(handlers::metering::amend_usage))
}

fn contract_routes() -> Router<AppState> {
    Router::new()
        .route("/contracts", post(handlers::contract::create_contract))
        .route(
            "/contracts/roll-statuses",
            post(handlers::contract::roll_statuses),
        )
        .route("/contracts/:id", get(handlers::contract::get_contract))
        .route(
            "/contracts/:id/terminate",
            post(handlers::contract::terminate_contract),
        )
}

fn invoice_routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(handlers::billing::create_invoice))
        .route(
            "/invoices/sweep-overdue",
            post(handlers::billing::sweep_overdue),
        )
        .route("/invoices/:id", get(handlers::billing::get_invoice))
        .route("/invoices/:id/details", post(handlers::billing::add_detail))
        .route(
            "/invoices/:id/details/:detail_id",
            put(handlers::billing::update_detail).delete(handlers::billing::remove_detail),
        )
        .route(
            "/invoices/:id/payments",
            post(handlers::billing::record_payment),
        )
}
