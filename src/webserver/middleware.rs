/// Webserver middleware
use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::logger::{self, LogTag};

/// Debug-level access log (`--debug-webserver`)
///
/// SSE responses are logged when their headers go out, not when the stream ends.
pub async fn log_requests(request: Request, next: Next) -> Response {
    if !logger::is_debug_enabled(&LogTag::Webserver) {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    logger::debug(
        LogTag::Webserver,
        &format!(
            "{} {} -> {} ({}ms)",
            method,
            uri,
            response.status().as_u16(),
            start.elapsed().as_millis()
        ),
    );

    response
}
