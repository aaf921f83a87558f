use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ATCommander configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtCommanderConfig {
    /// Global configuration
    pub global: GlobalConfig,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Transaction response deadline in milliseconds
    #[serde(default = "default_response_timeout")]
    pub response_timeout_ms: u64,
    /// Collector poll interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Post-command settle delay for scripted sends, milliseconds
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
    /// Inter-character pacing for scripted sends, milliseconds
    #[serde(default = "default_pacing")]
    pub pacing_ms: u64,
    /// Serial settings source (settings.json)
    #[serde(default)]
    pub settings_path: Option<PathBuf>,
    /// Command catalog source (commands.json)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Directory scanned for *.script files
    #[serde(default)]
    pub scripts_dir: Option<PathBuf>,
    /// Directory for transcript log files
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

/// One serial profile from the settings source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsRecord {
    /// Profile toggle, the literal strings "true" or "false"
    pub enable: String,
    /// Serial device path or name
    pub port: String,
    /// Line speed in baud
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,
}

impl SettingsRecord {
    pub fn is_enabled(&self) -> bool {
        self.enable.eq_ignore_ascii_case("true")
    }
}

/// Settings source document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub settings: Vec<SettingsRecord>,
}

impl SettingsFile {
    /// First enabled profile, resolved to concrete port parameters.
    pub fn resolve(&self) -> Option<PortSettings> {
        self.settings
            .iter()
            .find(|record| record.is_enabled())
            .map(|record| PortSettings {
                port: record.port.clone(),
                baud: record.baudrate,
            })
    }
}

/// Resolved serial parameters handed to the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    pub port: String,
    pub baud: u32,
}

/// One record in the command catalog source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Literal AT command text
    pub command: String,
    /// Operator-facing description
    #[serde(default)]
    pub description: String,
    /// Expected payload line count; 1 selects single-line response policy
    #[serde(default = "default_response_line_count")]
    pub response_line_count: u32,
    /// Substring suppressed from this command's output
    #[serde(default)]
    pub ignore: Option<String>,
}

/// Catalog source document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub commands: Vec<CatalogEntry>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_response_timeout() -> u64 {
    5000
}

fn default_poll_interval() -> u64 {
    10
}

fn default_settle_delay() -> u64 {
    1000
}

fn default_pacing() -> u64 {
    175
}

fn default_baudrate() -> u32 {
    115200
}

fn default_response_line_count() -> u32 {
    0
}

impl Default for AtCommanderConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            response_timeout_ms: default_response_timeout(),
            poll_interval_ms: default_poll_interval(),
            settle_delay_ms: default_settle_delay(),
            pacing_ms: default_pacing(),
            settings_path: None,
            catalog_path: None,
            scripts_dir: None,
            log_dir: None,
        }
    }
}
