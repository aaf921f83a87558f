// Domain module - Configuration and error data model
pub mod config;
pub mod error;

pub use config::{
    AtCommanderConfig, CatalogEntry, CatalogFile, GlobalConfig, PortSettings, SettingsFile,
    SettingsRecord,
};
pub use error::{AtCommanderError, AtCommanderResult, ChannelError};
