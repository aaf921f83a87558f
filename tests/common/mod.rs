#![allow(dead_code)]

//! Shared in-memory modem double for the integration test suite.

use async_trait::async_trait;
use atcommander::{Channel, ChannelError, ChannelStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Serial channel double that replays canned modem output.
///
/// Reads pop one queued chunk at a time, so a multi-chunk response arrives
/// across successive collector polls the way a real UART delivers it. Every
/// write and read marks itself in flight; an operation starting while
/// another is still in flight bumps the overlap counter, which callers that
/// respect the channel gate never do.
pub struct MockModem {
    state: Mutex<ModemState>,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
}

struct ModemState {
    open: bool,
    selected: Option<(String, u32)>,
    pending: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    writes: usize,
}

impl MockModem {
    pub const PORT: &'static str = "/dev/ttyMOCK0";

    /// Open modem preloaded with response chunks.
    pub fn online(pending: Vec<Vec<u8>>) -> Self {
        Self {
            state: Mutex::new(ModemState {
                open: true,
                selected: Some((Self::PORT.to_string(), 115200)),
                pending: pending.into(),
                written: Vec::new(),
                writes: 0,
            }),
            in_flight: AtomicBool::new(false),
            overlaps: AtomicUsize::new(0),
        }
    }

    /// Closed modem that remembers a selected port.
    pub fn offline(port: &str) -> Self {
        let modem = Self::online(Vec::new());
        {
            let mut state = modem.state.lock().unwrap();
            state.open = false;
            state.selected = Some((port.to_string(), 115200));
        }
        modem
    }

    /// Closed modem with no port ever selected.
    pub fn unselected() -> Self {
        let modem = Self::online(Vec::new());
        {
            let mut state = modem.state.lock().unwrap();
            state.open = false;
            state.selected = None;
        }
        modem
    }

    /// Queue another response chunk for a later read.
    pub fn queue_response(&self, bytes: &[u8]) {
        self.state.lock().unwrap().pending.push_back(bytes.to_vec());
    }

    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.state.lock().unwrap().written).into_owned()
    }

    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    /// Count of operations that began while another was in flight.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    fn begin(&self) {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn finish(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }

    // Widens the race window so colliding callers actually overlap
    async fn linger(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[async_trait]
impl Channel for MockModem {
    async fn open(&self, port: &str, baud: u32, _timeout: Duration) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();
        state.selected = Some((port.to_string(), baud));
        if state.open {
            return Err(ChannelError::AlreadyOpen);
        }
        state.open = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), ChannelError> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(ChannelError::NotOpen);
        }
        state.open = false;
        Ok(())
    }

    async fn status(&self) -> ChannelStatus {
        let state = self.state.lock().unwrap();
        if state.open {
            let (port, baud) = state
                .selected
                .clone()
                .unwrap_or_else(|| (Self::PORT.to_string(), 115200));
            ChannelStatus::Open { port, baud }
        } else {
            ChannelStatus::Closed {
                selected: state.selected.as_ref().map(|(port, _)| port.clone()),
            }
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<usize, ChannelError> {
        self.begin();
        self.linger().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                Err(ChannelError::NotOpen)
            } else {
                state.written.extend_from_slice(bytes);
                state.writes += 1;
                Ok(bytes.len())
            }
        };
        self.finish();
        result
    }

    async fn read_available(&self) -> Result<Vec<u8>, ChannelError> {
        self.begin();
        self.linger().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                Err(ChannelError::NotOpen)
            } else {
                Ok(state.pending.pop_front().unwrap_or_default())
            }
        };
        self.finish();
        result
    }

    async fn bytes_waiting(&self) -> Result<usize, ChannelError> {
        let state = self.state.lock().unwrap();
        if !state.open {
            return Err(ChannelError::NotOpen);
        }
        Ok(state.pending.front().map(|chunk| chunk.len()).unwrap_or(0))
    }
}
