//! JSON HTTP surface for the awareness platform.
//!
//! ## Endpoints
//!
//! - `POST /auth/register`, `POST /auth/login`, `GET|PUT /auth/me`
//! - `GET /modules`, `GET /modules/{id}`, `POST /modules`, `PUT|DELETE /modules/{id}`
//! - `GET /progress`, `GET /progress/{module_id}` and
//!   `POST /progress/{module_id}/{start,sections,complete,access}`
//! - `GET /assessments/module/{module_id}`, `POST /assessments`,
//!   `POST /assessments/submit`, `GET /assessments/attempts`
//! - `GET /activities`, `POST /activities/submit`
//! - `GET /badges`, `POST /badges`, `GET /badges/me`, `POST /badges/award`
//! - `GET /leaderboard?limit=N`, `GET /dashboard`, `GET /health`
//!
//! Everything except registration, login, the module and badge catalogs,
//! the leaderboard and `/health` needs `Authorization: Bearer <token>`.

#![forbid(unsafe_code)]

use std::time::Duration;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use services::AppServices;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ServerError};
pub use state::AppState;

use routes::{activities, assessments, badges, modules, progress, stats};

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60))
}

/// Builds the router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(stats::health))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/me", get(routes::auth::me).put(routes::auth::update_me))
        .route("/modules", get(modules::list).post(modules::create))
        .route(
            "/modules/{id}",
            get(modules::get).put(modules::update).delete(modules::delete),
        )
        .route("/progress", get(progress::list))
        .route("/progress/{module_id}", get(progress::get))
        .route("/progress/{module_id}/start", post(progress::start))
        .route("/progress/{module_id}/sections", post(progress::sections))
        .route("/progress/{module_id}/complete", post(progress::complete))
        .route("/progress/{module_id}/access", post(progress::access))
        .route("/assessments", post(assessments::create))
        .route("/assessments/module/{module_id}", get(assessments::for_module))
        .route("/assessments/submit", post(assessments::submit))
        .route("/assessments/attempts", get(assessments::attempts))
        .route("/activities", get(activities::history))
        .route("/activities/submit", post(activities::submit))
        .route("/badges", get(badges::list).post(badges::create))
        .route("/badges/me", get(badges::mine))
        .route("/badges/award", post(badges::award))
        .route("/leaderboard", get(stats::leaderboard))
        .route("/dashboard", get(stats::dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Binds `config.address()` and serves until Ctrl+C or SIGTERM.
///
/// # Errors
///
/// Returns `ServerError` if the address cannot be bound or the server fails.
pub async fn serve(config: &ServerConfig, services: AppServices) -> Result<(), ServerError> {
    let state = AppState::new(services, config.passing_score);
    let app = router(state);

    let address = config.address();
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
