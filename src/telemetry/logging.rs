//! Tracing subscriber setup
//!
//! The bridge always logs to the console; settings can switch the console
//! format to JSON and mirror records into a file through a non-blocking
//! writer.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::settings::BridgeSettings;

/// Logging options derived from [`BridgeSettings`]
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level filter applied when no env override is set
    pub default_level: String,
    /// Emit JSON records instead of the compact console format
    pub json_format: bool,
    /// Mirror records into this file
    pub file_path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl LogConfig {
    pub fn from_settings(settings: &BridgeSettings) -> Self {
        Self {
            default_level: settings.log_level.clone(),
            json_format: settings.log_json,
            file_path: settings.log_file.clone().map(PathBuf::from),
        }
    }
}

/// Install the global tracing subscriber
///
/// `HMD_BRIDGE_LOG` (falling back to `RUST_LOG`) overrides the level filter
/// from settings, and `HMD_BRIDGE_LOG_FORMAT=json` forces JSON output. The
/// returned guard flushes the file writer and must be held until exit.
pub fn init_logging(
    config: &LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_env("HMD_BRIDGE_LOG")
        .or_else(|_| EnvFilter::try_from_env("RUST_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

    let use_json = std::env::var("HMD_BRIDGE_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(config.json_format);

    let mut file_guard = None;
    let file_layer = match &config.file_path {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            file_guard = Some(guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_file(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    if use_json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry
            .with(fmt::layer().compact().with_target(true))
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        json = use_json,
        file = config.file_path.is_some(),
        "Logging initialized"
    );

    Ok(file_guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.default_level, "info");
        assert!(!config.json_format);
        assert!(config.file_path.is_none());
    }

    #[test]
    fn test_log_config_from_settings() {
        let mut settings = BridgeSettings::default();
        settings.log_level = "debug".to_string();
        settings.log_json = true;
        settings.log_file = Some("bridge.log".to_string());

        let config = LogConfig::from_settings(&settings);
        assert_eq!(config.default_level, "debug");
        assert!(config.json_format);
        assert_eq!(config.file_path, Some(PathBuf::from("bridge.log")));
    }
}
