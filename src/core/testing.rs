//! In-memory channels for driving the engine, player, and tailer in tests.

use crate::core::channel::{Channel, ChannelStatus};
use crate::domain::error::ChannelError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Channel fed from a queue of canned read chunks.
///
/// Each `read_available` call pops one chunk, so a multi-chunk response
/// arrives across successive collector polls. The channel also instruments
/// access overlap: an operation starting while another is still in flight
/// bumps the violation counter, which a gate-respecting caller never does.
pub struct ScriptedChannel {
    state: Mutex<ScriptedState>,
    busy: AtomicBool,
    violations: AtomicUsize,
}

struct ScriptedState {
    open: bool,
    selected: Option<(String, u32)>,
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
    write_calls: usize,
}

impl ScriptedChannel {
    /// Closed channel with no port ever selected.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ScriptedState {
                open: false,
                selected: None,
                chunks: VecDeque::new(),
                written: Vec::new(),
                write_calls: 0,
            }),
            busy: AtomicBool::new(false),
            violations: AtomicUsize::new(0),
        }
    }

    /// Closed channel that remembers a selected port.
    pub fn with_selection(port: &str, baud: u32) -> Self {
        let channel = Self::new();
        channel.state.lock().unwrap().selected = Some((port.to_string(), baud));
        channel
    }

    /// Open channel preloaded with response chunks.
    pub fn open_with_chunks(chunks: Vec<Vec<u8>>) -> Self {
        let channel = Self::new();
        {
            let mut state = channel.state.lock().unwrap();
            state.open = true;
            state.selected = Some(("/dev/ttyTEST".to_string(), 115200));
            state.chunks = chunks.into();
        }
        channel
    }

    /// Queue another chunk for a later read.
    pub fn push_chunk(&self, bytes: &[u8]) {
        self.state.lock().unwrap().chunks.push_back(bytes.to_vec());
    }

    /// Drop the handle without going through `close`.
    pub fn force_close(&self) {
        self.state.lock().unwrap().open = false;
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().unwrap().written.clone()
    }

    pub fn written_string(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    pub fn write_calls(&self) -> usize {
        self.state.lock().unwrap().write_calls
    }

    /// Count of operations that began while another was in flight.
    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn exit(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }

    // Widens the race window so interleaved callers actually collide
    async fn linger(&self) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

impl Default for ScriptedChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
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
                .unwrap_or_else(|| ("/dev/ttyTEST".to_string(), 115200));
            ChannelStatus::Open { port, baud }
        } else {
            ChannelStatus::Closed {
                selected: state.selected.as_ref().map(|(port, _)| port.clone()),
            }
        }
    }

    async fn write(&self, bytes: &[u8]) -> Result<usize, ChannelError> {
        self.enter();
        self.linger().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                Err(ChannelError::NotOpen)
            } else {
                state.written.extend_from_slice(bytes);
                state.write_calls += 1;
                Ok(bytes.len())
            }
        };
        self.exit();
        result
    }

    async fn read_available(&self) -> Result<Vec<u8>, ChannelError> {
        self.enter();
        self.linger().await;
        let result = {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                Err(ChannelError::NotOpen)
            } else {
                Ok(state.chunks.pop_front().unwrap_or_default())
            }
        };
        self.exit();
        result
    }

    async fn bytes_waiting(&self) -> Result<usize, ChannelError> {
        let state = self.state.lock().unwrap();
        if !state.open {
            return Err(ChannelError::NotOpen);
        }
        Ok(state.chunks.front().map(|chunk| chunk.len()).unwrap_or(0))
    }
}
