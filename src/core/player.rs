use crate::core::channel::{Channel, ChannelGate, ChannelStatus};
use crate::core::classify::classify;
use crate::core::script::{Directive, Script};
use crate::core::sink::OutputSink;
use crate::core::stamp::{now_stamp, StampMode};
use crate::core::transaction::{channel_failure, TransactionError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Default post-command settle delay in milliseconds
pub const DEFAULT_SETTLE_MS: u64 = 1000;

/// Default inter-character pacing in milliseconds
pub const DEFAULT_PACING_MS: u64 = 175;

/// Replays scripts through the shared channel gate.
///
/// Playback belongs on its own task; a script sleeps through waits and
/// pacing, and must never stall the interactive path or the tailer. Sends
/// are paced character by character and use a fire-and-collect-once read,
/// not the terminal-marker loop. A failed directive is reported and the
/// script keeps going.
pub struct ScriptPlayer {
    channel: Arc<dyn Channel>,
    gate: Arc<ChannelGate>,
    sink: Arc<dyn OutputSink>,
    settle: Duration,
    pacing: Duration,
}

impl ScriptPlayer {
    pub fn new(channel: Arc<dyn Channel>, gate: Arc<ChannelGate>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            channel,
            gate,
            sink,
            settle: Duration::from_millis(DEFAULT_SETTLE_MS),
            pacing: Duration::from_millis(DEFAULT_PACING_MS),
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Pacing used for scripts without a `[DELAY]` marker.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Play every directive in order, best-effort.
    pub async fn play(&self, script: &Script) -> Result<(), TransactionError> {
        info!(script = %script.name, steps = script.directives.len(), "script playback started");
        self.emit(&format!(
            "{} == running script \"{}\"",
            now_stamp(StampMode::Display),
            script.name
        ));

        for directive in &script.directives {
            match directive {
                Directive::Wait(seconds) => self.wait_step(*seconds).await,
                Directive::SendCommand(text) => {
                    let pacing = script.pacing.unwrap_or(self.pacing);
                    if let Err(err) = self.send_step(text, pacing).await {
                        self.emit(&format!(
                            "{} !! script step failed: {}",
                            now_stamp(StampMode::Display),
                            err
                        ));
                        warn!(script = %script.name, error = %err, "script directive failed");
                    }
                }
            }
        }

        self.emit(&format!(
            "{} == script \"{}\" complete",
            now_stamp(StampMode::Display),
            script.name
        ));
        info!(script = %script.name, "script playback complete");
        Ok(())
    }

    // Private methods

    /// Countdown visible to the sink once per second.
    async fn wait_step(&self, seconds: u64) {
        for remaining in (1..=seconds).rev() {
            self.emit(&format!(
                "{} .. waiting {}s",
                now_stamp(StampMode::Display),
                remaining
            ));
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// Paced send with a single post-settle drain.
    async fn send_step(&self, text: &str, pacing: Duration) -> Result<(), TransactionError> {
        let _guard = self.gate.acquire().await;

        let port = match self.channel.status().await {
            ChannelStatus::Open { port, .. } => port,
            ChannelStatus::Closed {
                selected: Some(port),
            } => return Err(TransactionError::ChannelNotOpen { port }),
            ChannelStatus::Closed { selected: None } => {
                return Err(TransactionError::NoPortSelected)
            }
        };

        self.emit(&format!("{} -> {}", now_stamp(StampMode::Display), text));

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.channel
                .write(ch.encode_utf8(&mut buf).as_bytes())
                .await
                .map_err(|err| channel_failure(&port, err))?;
            tokio::time::sleep(pacing).await;
        }
        self.channel
            .write(b"\r\n")
            .await
            .map_err(|err| channel_failure(&port, err))?;

        tokio::time::sleep(self.settle).await;

        let bytes = self
            .channel
            .read_available()
            .await
            .map_err(|err| channel_failure(&port, err))?;
        if !bytes.is_empty() {
            let text = String::from_utf8_lossy(&bytes);
            for line in classify(&text) {
                if !line.is_empty() {
                    self.emit(&format!("{} <- {}", now_stamp(StampMode::Display), line));
                }
            }
        }

        Ok(())
    }

    fn emit(&self, line: &str) {
        if let Err(err) = self.sink.emit(line) {
            warn!(error = %err, "output sink rejected line");
        }
    }
}
