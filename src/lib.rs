//! Backend statistics layer for the dice game.
//!
//! Thin, stateless HTTP handlers over a shared Redis instance: one ingestion
//! path that maintains per-device survival-streak records, a handful of
//! aggregate readers the mobile stats screen consumes, and the event
//! recorders that feed them. Redis is the sole integration point between
//! handlers; each store command is atomic on its own and nothing here
//! assumes cross-key transactions.
//!
//! # Setup
//!
//! Run against a local Redis.
//! ```sh
//! REDIS_URL=redis://127.0.0.1:6379 cargo run
//! ```
//!
//! Override the port.
//! ```sh
//! STATS_PORT=8080 cargo run
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod routes;
pub mod state;
pub mod stats;
pub mod streak;

use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/survival/streak", post(routes::report_streak))
        .route("/survival/rate", get(routes::survival_rate))
        .route("/survival/average", get(routes::streak_average))
        .route("/stats/honesty", get(routes::honesty_rate))
        .route("/stats/aggression", get(routes::aggression_index))
        .route("/stats/cities", get(routes::city_leaderboard))
        .route("/events/claim", post(routes::record_claim))
        .route("/events/action", post(routes::record_action))
        .route("/events/win", post(routes::record_win))
        .route("/admin/reset", post(routes::admin_reset))
        .route("/healthz", get(routes::health))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");
    let app = router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    info!("Server shut down");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
