//! HTTP API for tweetsense.
//!
//! Routes:
//!
//! | Method | Path                  | Purpose                                   |
//! |--------|-----------------------|-------------------------------------------|
//! | GET    | `/`                   | liveness message                          |
//! | GET    | `/app`                | form-based UI                             |
//! | POST   | `/register`           | create an account                         |
//! | POST   | `/login`              | check credentials                         |
//! | POST   | `/analyze`            | score text, optionally saving to history  |
//! | GET    | `/history/:account_id`| an account's analyzed texts               |
//! | POST   | `/logout`             | acknowledge logout                        |
//! | GET    | `/admin/:account_id`  | list all users (admins only)              |
//!
//! Accounts are identified by ID on every request; there are no sessions.
//! Errors are JSON objects of the form `{"detail": "..."}`.

mod error;
mod routes;
mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::storage::Storage;

pub use error::ApiError;
pub use state::AppState;

/// Build the application router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/", get(routes::root))
        .route("/app", get(routes::ui))
        .route("/register", post(routes::register))
        .route("/login", post(routes::login))
        .route("/analyze", post(routes::analyze))
        .route("/history/:account_id", get(routes::history))
        .route("/logout", post(routes::logout))
        .route("/admin/:account_id", get(routes::admin))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open storage, bind the configured address, and serve until shutdown.
///
/// # Errors
///
/// Returns an error if the database cannot be opened, the address cannot be
/// bound, or the server fails while running.
pub async fn serve(config: Config) -> Result<()> {
    info!("Opening storage...");
    let storage = Storage::open(config.database_path())?;
    let address = config.bind_address()?;
    let state = AppState::new(config, storage)?;

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
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
