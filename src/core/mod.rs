// Core module - Serial transaction engine and protocol logic
pub mod catalog;
pub mod channel;
pub mod classify;
pub mod collect;
pub mod dispatch;
pub mod player;
pub mod script;
pub mod sink;
pub mod stamp;
pub mod tailer;
pub mod transaction;

#[cfg(test)]
pub(crate) mod testing;

pub use catalog::{Command, CommandCatalog};
pub use channel::{Channel, ChannelGate, ChannelStatus, GateGuard};
pub use classify::{classify, strip_ansi};
pub use collect::{CollectError, CollectedResponse, Outcome, ResponseCollector, TimedLine};
pub use dispatch::{spawn_worker, WorkItem, WorkQueue};
pub use player::ScriptPlayer;
pub use script::{Directive, Script, ScriptParseError, ScriptRegistry};
pub use sink::{MemorySink, OutputSink};
pub use stamp::{format_stamp, now_stamp, StampMode};
pub use tailer::NotificationTailer;
pub use transaction::{TransactionEngine, TransactionError};
