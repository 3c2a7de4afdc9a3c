/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, graceful termination
use axum::http::{header, Method};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    apis::{TelemetryClient, TelemetrySource},
    config::AppConfig,
    logger::{self, LogTag},
    webserver::{middleware, routes, state::AppState},
};

/// Global shutdown notifier
static SHUTDOWN_NOTIFY: once_cell::sync::Lazy<Arc<Notify>> =
    once_cell::sync::Lazy::new(|| Arc::new(Notify::new()));

/// Start the webserver
///
/// Blocks until Ctrl+C or [`shutdown`].
pub async fn start_server(config: Arc<AppConfig>) -> Result<(), String> {
    let telemetry: Arc<dyn TelemetrySource> = Arc::new(TelemetryClient::new(&config.upstream)?);
    let state = Arc::new(AppState::new(Arc::clone(&config), telemetry));

    let app = build_app(Arc::clone(&state));

    let addr = format!("{}:{}", config.webserver.host, config.webserver.port);
    let listener = TcpListener::bind(&addr).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::AddrInUse => format!(
            "Failed to bind to {}: Address already in use (is another tracker running?)",
            addr
        ),
        std::io::ErrorKind::PermissionDenied => format!(
            "Failed to bind to {}: Permission denied (use a port above 1024)",
            addr
        ),
        _ => format!("Failed to bind to {}: {}", addr, e),
    })?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to read listener address: {}", e))?;

    logger::info(
        LogTag::Webserver,
        &format!(
            "Listening on http://{} (upstream {})",
            local_addr, config.upstream.base_url
        ),
    );
    logger::debug(
        LogTag::Webserver,
        &format!(
            "Live stream: http://{}/proxy/live?device_id=<id>",
            local_addr
        ),
    );

    // Open SSE streams never finish by themselves; ending the feeds lets
    // graceful shutdown complete.
    let relay = Arc::clone(&state.relay);
    let shutdown_signal = async move {
        tokio::select! {
            _ = SHUTDOWN_NOTIFY.notified() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    logger::error(
                        LogTag::Webserver,
                        &format!("Failed to listen for Ctrl+C: {}", e),
                    );
                }
            }
        }
        logger::info(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
        relay.shutdown();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");

    Ok(())
}

/// Trigger webserver shutdown
pub fn shutdown() {
    logger::debug(LogTag::Webserver, "Triggering webserver shutdown...");
    SHUTDOWN_NOTIFY.notify_one();
}

/// Build the Axum application with all routes and middleware
pub fn build_app(state: Arc<AppState>) -> Router {
    let allow_any_origin = state.config.webserver.cors_allow_any_origin;

    let app = routes::create_router(state)
        .layer(axum::middleware::from_fn(middleware::log_requests));

    if allow_any_origin {
        app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([header::CACHE_CONTROL, header::CONTENT_TYPE]),
        )
    } else {
        app
    }
}
