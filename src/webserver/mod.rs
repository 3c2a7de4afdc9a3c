/// HTTP surface of the tracker
///
/// - `/health` - liveness plus relay and upstream counters
/// - `/proxy/*` (aliased as `/api/*`) - authenticated upstream passthrough
/// - `/proxy/live` - Server-Sent Events relay
mod middleware;
mod server;

pub mod routes;
pub mod state;
pub mod utils;

// Public API for starting/stopping the webserver
pub use server::{build_app, shutdown, start_server};
pub use state::AppState;
