//! HTTP API Layer
//!
//! This crate provides the REST API for the retail core using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: POS sessions, checkout and the ledger engine
//! - **Middleware**: Authentication, correlation ids, audit logging
//! - **DTOs**: Validated request bodies and response shapes
//! - **Error Handling**: Domain rejections mapped to HTTP status codes
//!
//! The acting user and branch of every protected request come from the JWT
//! claims, via the [`auth::Actor`] extractor.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(pool, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use sqlx::PgPool;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use infra_db::{LedgerRepository, PosSessionRepository, SalesRepository};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{health, ledger, sales, sessions};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: ApiConfig,
    pub ledger: LedgerRepository,
    pub sales: SalesRepository,
    pub sessions: PosSessionRepository,
}

impl AppState {
    pub fn new(pool: PgPool, config: ApiConfig) -> Self {
        Self {
            ledger: LedgerRepository::new(pool.clone()),
            sales: SalesRepository::new(pool.clone()),
            sessions: PosSessionRepository::new(pool.clone()),
            pool,
            config,
        }
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `pool` - Database connection pool
/// * `config` - API configuration
pub fn create_router(pool: PgPool, config: ApiConfig) -> Router {
    router_with_state(AppState::new(pool, config))
}

/// Creates the router over prebuilt state, e.g. with a custom sale event publisher
pub fn router_with_state(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let pos_routes = Router::new()
        .route("/sessions", post(sessions::open_session))
        .route("/sessions/:id/close", post(sessions::close_session));

    let sales_routes = Router::new()
        .route("/checkout", post(sales::checkout))
        .route("/:id", get(sales::get_sale));

    let ledger_routes = Router::new()
        .route("/sources/:kind/:id/entry", post(ledger::generate_entry))
        .route("/entries", post(ledger::create_manual_entry))
        .route("/entries/:id", get(ledger::get_entry))
        .route("/entries/:id/post", post(ledger::post_entry))
        .route("/entries/:id/reverse", post(ledger::reverse_entry))
        .route("/entries/:id/cancel", post(ledger::cancel_entry))
        .route("/trial-balance", get(ledger::trial_balance));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/pos", pos_routes)
        .nest("/sales", sales_routes)
        .nest("/ledger", ledger_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
