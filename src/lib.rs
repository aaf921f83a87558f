//! ATCommander Library
//!
//! Bench tool library for driving AT-command modems over a serial port.
//! All traffic shares one channel behind an exclusive gate, whether it
//! comes from interactive commands, script playback or the notification
//! tailer.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use domain::config::AtCommanderConfig;
pub use domain::error::{AtCommanderError, AtCommanderResult, ChannelError};
pub use core::catalog::{Command, CommandCatalog};
pub use core::channel::{Channel, ChannelGate, ChannelStatus};
pub use core::script::{Script, ScriptRegistry};
pub use core::transaction::TransactionEngine;
