use crate::domain::error::ChannelError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Observable channel lifecycle state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Handle to the device is live
    Open { port: String, baud: u32 },
    /// No live handle; `selected` remembers the last chosen port, if any
    Closed { selected: Option<String> },
}

impl ChannelStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, ChannelStatus::Open { .. })
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelStatus::Open { port, baud } => write!(f, "open ({} @ {})", port, baud),
            ChannelStatus::Closed { selected: Some(port) } => write!(f, "closed ({})", port),
            ChannelStatus::Closed { selected: None } => write!(f, "closed"),
        }
    }
}

/// Byte-level serial transport seam
///
/// One instance owns the single open/closed connection. Implementations keep
/// individual calls short; a transaction's framing is protected by the
/// [`ChannelGate`], not by this trait, so `close` can interrupt a waiting
/// collector between polls.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Open the device, recording the (port, baud) selection even on failure
    async fn open(&self, port: &str, baud: u32, timeout: Duration) -> Result<(), ChannelError>;

    /// Drop the device handle; the port selection is retained
    async fn close(&self) -> Result<(), ChannelError>;

    /// Current lifecycle state
    async fn status(&self) -> ChannelStatus;

    /// Write raw bytes, returning the count written
    async fn write(&self, bytes: &[u8]) -> Result<usize, ChannelError>;

    /// Read whatever is buffered right now, possibly nothing; never blocks for input
    async fn read_available(&self) -> Result<Vec<u8>, ChannelError>;

    /// Number of bytes buffered for reading
    async fn bytes_waiting(&self) -> Result<usize, ChannelError>;
}

/// The single mutual-exclusion gate serializing all channel access.
///
/// Every write-then-read sequence (a transaction, a script send, a tailer
/// drain) holds the gate for its full duration. The guard releases on drop,
/// so no exit path can leave the gate held.
#[derive(Debug, Default)]
pub struct ChannelGate {
    inner: Mutex<()>,
}

/// Proof of exclusive channel access; releases on drop
pub struct GateGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

impl ChannelGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until the gate is free and take it.
    pub async fn acquire(&self) -> GateGuard<'_> {
        GateGuard(self.inner.lock().await)
    }

    /// Take the gate only if it is free right now.
    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.inner.try_lock().ok().map(GateGuard)
    }
}
