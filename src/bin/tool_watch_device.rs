/// Live Device Watcher Tool
///
/// Follows one device through a running relay server, printing every change of
/// the reconciled view (baseline, live updates, reconnects).
///
/// Usage: cargo run --bin tool_watch_device -- bus-12 --server http://127.0.0.1:3001 --from 12.97,77.59
use anyhow::{anyhow, Context, Result};
use bus_tracker::client::{HttpRelayClient, LiveReconciler, Phase, ViewSnapshot};
use bus_tracker::config::ClientConfig;
use bus_tracker::geo::{format_distance, haversine_km, parse_point};
use bus_tracker::logger::{self, LogTag};
use bus_tracker::types::iso_millis;
use clap::Parser;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "tool_watch_device")]
#[command(about = "Follow one device through the live relay", long_about = None)]
struct Args {
    /// Device to follow (defaults to the first device the server lists)
    device_id: Option<String>,

    /// Relay server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:3001")]
    server: String,

    /// Your position as `lat,lng`, to print the distance to the device
    #[arg(short, long)]
    from: Option<String>,

    /// Seconds to wait before reopening a dropped stream
    #[arg(long, default_value = "5")]
    reconnect_delay: u64,

    /// List devices and exit
    #[arg(short, long)]
    list: bool,

    /// Debug output for the client reconciler
    #[arg(long)]
    debug_client: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init();
    if args.debug_client {
        logger::info(LogTag::Client, "Client debug output enabled");
    }

    let origin = match args.from.as_deref() {
        Some(raw) => Some(
            parse_point(raw).ok_or_else(|| anyhow!("Invalid --from '{}', expected lat,lng", raw))?,
        ),
        None => None,
    };

    let config = ClientConfig {
        server_url: args.server.clone(),
        reconnect_delay_secs: args.reconnect_delay,
        ..ClientConfig::default()
    };
    let transport = Arc::new(HttpRelayClient::new(&config).map_err(|e| anyhow!(e))?);

    if args.list || args.device_id.is_none() {
        let devices = transport
            .fetch_device_ids()
            .await
            .with_context(|| format!("Failed to list devices from {}", transport.server_url()))?;
        if args.list {
            println!("{} device(s) on {}", devices.len(), transport.server_url());
            for (i, id) in devices.iter().enumerate() {
                println!("{}. {}", i + 1, id);
            }
            return Ok(());
        }
        let first = devices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Server lists no devices"))?;
        return watch(transport, &config, &first, origin).await;
    }

    let device_id = args.device_id.clone().unwrap_or_default();
    watch(transport, &config, &device_id, origin).await
}

async fn watch(
    transport: Arc<HttpRelayClient>,
    config: &ClientConfig,
    device_id: &str,
    origin: Option<(f64, f64)>,
) -> Result<()> {
    println!(
        "Watching {} via {} (Ctrl+C to stop)",
        device_id,
        transport.server_url()
    );
    println!("{}", "=".repeat(80));

    let reconciler = LiveReconciler::spawn(transport, config.reconnect_delay());
    let mut view = reconciler.watch();
    reconciler
        .select(device_id)
        .with_context(|| format!("Cannot watch '{}'", device_id))?;

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = view.borrow_and_update().clone();
                print_snapshot(&snapshot, origin);
            }
            _ = tokio::signal::ctrl_c() => {
                logger::info(LogTag::Client, "Stopping watcher");
                break;
            }
        }
    }

    reconciler.shutdown();
    Ok(())
}

fn print_snapshot(snapshot: &ViewSnapshot, origin: Option<(f64, f64)>) {
    let phase = match snapshot.phase {
        Phase::Idle => "idle",
        Phase::BaselineLoading => "loading",
        Phase::BaselineReady => "baseline",
        Phase::BaselineFailed => "baseline failed",
        Phase::StreamConnecting => "connecting",
        Phase::StreamLive => "live",
        Phase::StreamErrorTransient => "degraded",
        Phase::ReconnectPending => "reconnecting",
    };

    let position = match &snapshot.displayed {
        Some(p) => {
            let mut line = format!("{:.6}, {:.6}", p.latitude, p.longitude);
            if let Some(speed) = p.speed {
                line.push_str(&format!(" | {:.1} km/h", speed));
            }
            if let Some(ts) = &p.timestamp {
                line.push_str(&format!(" | reported {}", iso_millis::format(ts)));
            }
            if let Some(from) = origin {
                let km = haversine_km(from, (p.latitude, p.longitude));
                line.push_str(&format!(" | {} away", format_distance(km)));
            }
            line
        }
        None => "no position".to_string(),
    };

    match &snapshot.notice {
        Some(notice) => println!("[{:<15}] {} ({})", phase, position, notice),
        None => println!("[{:<15}] {}", phase, position),
    }
}
