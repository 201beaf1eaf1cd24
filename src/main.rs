//! HMD Bridge - Main Entry Point
//!
//! Binds the relay server: one WebSocket session for the tracking client,
//! HTTP endpoints for polling the HMD position and arming triggers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use hmd_bridge::api::{create_shared_state, run_server};
use hmd_bridge::settings::{BridgeSettings, SettingsSource};
use hmd_bridge::telemetry::{init_logging, LogConfig};

#[tokio::main]
async fn main() {
    // Settings come first; the load outcome is logged once the subscriber
    // is installed below.
    let (settings, settings_source) = BridgeSettings::load_default();

    // Keep the guard alive for the program duration
    let _log_guard = match init_logging(&LogConfig::from_settings(&settings)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            None
        }
    };

    tracing::info!("HMD Bridge v{}", env!("CARGO_PKG_VERSION"));
    match &settings_source {
        SettingsSource::File(path) => {
            tracing::info!("Loaded settings from: {}", path.display());
        }
        SettingsSource::Defaults => {
            tracing::info!("No settings file found, using defaults");
        }
        SettingsSource::LoadFailed { path, error } => {
            tracing::warn!(
                "Failed to load settings from {}: {}, using defaults",
                path.display(),
                error
            );
        }
    }
    tracing::info!(
        max_pending_triggers = settings.max_pending_triggers,
        "Settings loaded"
    );

    let host: IpAddr = settings.host.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid host '{}', falling back to 0.0.0.0", settings.host);
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    });
    let addr = SocketAddr::new(host, settings.port);

    let state = create_shared_state(settings.max_pending_triggers);

    // Ctrl-C triggers graceful shutdown through the watch channel
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    if let Err(e) = run_server(addr, state, shutdown_rx).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
