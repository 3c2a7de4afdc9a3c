/// Live position stream (Server-Sent Events)
///
/// Each relay event becomes one `data: <json>` frame. Keep-alive comments are
/// sent between polls so idle proxies keep the connection open.
use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Router,
};
use futures::StreamExt;
use std::convert::Infallible;
use std::sync::Arc;

use crate::{
    logger::{self, LogTag},
    relay::RelayEvent,
    webserver::{routes::proxy::DeviceQuery, state::AppState},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/live", get(live_stream))
}

/// GET /proxy/live?device_id=X
async fn live_stream(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceQuery>,
) -> Response {
    let device_id = match query.device_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    let subscription = match state.relay.open_stream(device_id.as_str()) {
        Ok(subscription) => subscription,
        Err(e) => return e.into_response(),
    };

    logger::info(
        LogTag::Webserver,
        &format!(
            "Live stream opened for {} (subscription {})",
            device_id,
            subscription.id()
        ),
    );

    let events = subscription
        .into_stream()
        .map(|event| Ok::<Event, Infallible>(sse_frame(&event)));

    let mut sse = Sse::new(events);
    if let Some(interval) = state.config.relay.keep_alive() {
        sse = sse.keep_alive(KeepAlive::new().interval(interval));
    }
    sse.into_response()
}

fn sse_frame(event: &RelayEvent) -> Event {
    Event::default().data(event.to_json())
}
