//! Settings management for HMD Bridge
//!
//! Handles loading/saving of the bridge.xml configuration file.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Bridge settings stored in bridge.xml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename = "HmdBridge")]
pub struct BridgeSettings {
    /// Bind host (default "0.0.0.0")
    #[serde(rename = "host", default = "default_host")]
    pub host: String,

    /// Bind port (default 5000)
    #[serde(rename = "port", default = "default_port")]
    pub port: u16,

    /// Soft cap on the pending-trigger counter
    ///
    /// Triggers armed while no session is connected accumulate; the cap
    /// bounds pathological arming loops. Minimum 1.
    #[serde(rename = "maxPendingTriggers", default = "default_max_pending_triggers")]
    pub max_pending_triggers: u64,

    /// Default log level filter (default "info")
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,

    /// Use JSON format for logs
    #[serde(rename = "logJson", default)]
    pub log_json: bool,

    /// Optional log file path; console-only when absent
    #[serde(rename = "logFile", default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

/// Default bind host
fn default_host() -> String {
    "0.0.0.0".to_string()
}

/// Default bind port
fn default_port() -> u16 {
    5000
}

/// Default pending-trigger cap
fn default_max_pending_triggers() -> u64 {
    100_000
}

/// Default log level
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_pending_triggers: default_max_pending_triggers(),
            log_level: default_log_level(),
            log_json: false,
            log_file: None,
        }
    }
}

impl BridgeSettings {
    /// Clamp the pending-trigger cap to a sane minimum
    pub fn clamp_max_pending(&mut self) {
        self.max_pending_triggers = self.max_pending_triggers.max(1);
    }

    /// Load settings from a bridge.xml file
    pub fn load_from_file(path: &PathBuf) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        settings.clamp_max_pending();
        Ok(settings)
    }

    /// Save settings to a bridge.xml file
    pub fn save_to_file(&self, path: &PathBuf) -> Result<(), SettingsError> {
        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);
        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Get the default settings file path
    ///
    /// `HMD_BRIDGE_CONFIG` overrides the config-directory location.
    fn get_settings_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HMD_BRIDGE_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|mut p| {
            p.push("HmdBridge");
            p.push("bridge.xml");
            p
        })
    }

    /// Load settings from the default location, falling back to defaults
    ///
    /// Runs before logging is initialized, so instead of logging it reports
    /// where the settings came from; the caller logs the outcome once the
    /// subscriber is up.
    pub fn load_default() -> (Self, SettingsSource) {
        Self::load_from(Self::get_settings_path())
    }

    fn load_from(path: Option<PathBuf>) -> (Self, SettingsSource) {
        let Some(path) = path else {
            return (Self::default(), SettingsSource::Defaults);
        };

        if !path.exists() {
            return (Self::default(), SettingsSource::Defaults);
        }

        match Self::load_from_file(&path) {
            Ok(settings) => (settings, SettingsSource::File(path)),
            Err(e) => {
                let source = SettingsSource::LoadFailed {
                    path,
                    error: e.to_string(),
                };
                (Self::default(), source)
            }
        }
    }
}

/// Where the effective settings came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    /// Loaded from this file
    File(PathBuf),
    /// No settings file present; defaults in effect
    Defaults,
    /// A file existed but failed to load; defaults in effect
    LoadFailed { path: PathBuf, error: String },
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
        }
    }
}

impl std::error::Error for SettingsError {}
