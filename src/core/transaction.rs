use crate::core::catalog::Command;
use crate::core::channel::{Channel, ChannelGate, ChannelStatus};
use crate::core::collect::{select_lines, CollectError, ResponseCollector, TimedLine};
use crate::core::sink::OutputSink;
use crate::core::stamp::{format_stamp, now_stamp, StampMode};
use crate::domain::error::{AtCommanderError, ChannelError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Default transaction response deadline in milliseconds
pub const DEFAULT_DEADLINE_MS: u64 = 5000;

/// Failure of one command transaction
#[derive(Error, Debug)]
pub enum TransactionError {
    #[error("No serial port selected")]
    NoPortSelected,

    #[error("Serial device \"{port}\" is not open")]
    ChannelNotOpen { port: String },

    #[error("Response timed out after {waited_ms}ms")]
    CollectTimeout { waited_ms: u64 },

    #[error("Channel I/O failed: {0}")]
    Io(ChannelError),
}

impl From<TransactionError> for AtCommanderError {
    fn from(err: TransactionError) -> Self {
        AtCommanderError::Transaction(err.to_string())
    }
}

/// Drives the shared channel through one command transaction at a time.
///
/// Every submission runs gate-to-gate: acquire, verify the channel is open,
/// echo, write, collect until a terminal marker, select lines, forward to
/// the sink, release. The gate guard drops on every exit path, so a failed
/// transaction can never wedge the channel for the next caller.
pub struct TransactionEngine {
    channel: Arc<dyn Channel>,
    gate: Arc<ChannelGate>,
    sink: Arc<dyn OutputSink>,
    collector: ResponseCollector,
    deadline: Duration,
}

impl TransactionEngine {
    pub fn new(channel: Arc<dyn Channel>, gate: Arc<ChannelGate>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            channel,
            gate,
            sink,
            collector: ResponseCollector::default(),
            deadline: Duration::from_millis(DEFAULT_DEADLINE_MS),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.collector = ResponseCollector::new(poll_interval);
        self
    }

    /// Run one command to its terminal outcome.
    ///
    /// Returns the rendered output lines that were forwarded to the sink.
    /// Transport failures and timeouts surface on the sink as a diagnostic
    /// line before the error is returned.
    pub async fn submit(&self, command: &Command) -> Result<Vec<String>, TransactionError> {
        let _guard = self.gate.acquire().await;
        let started = Instant::now();

        // No write may happen unless the channel is live
        let port = match self.channel.status().await {
            ChannelStatus::Open { port, .. } => port,
            ChannelStatus::Closed {
                selected: Some(port),
            } => {
                return self.fail(TransactionError::ChannelNotOpen { port });
            }
            ChannelStatus::Closed { selected: None } => {
                return self.fail(TransactionError::NoPortSelected);
            }
        };

        self.emit(&format!(
            "{} -> {}",
            now_stamp(StampMode::Display),
            command.text
        ));

        let payload = format!("{}\r\n", command.text);
        if let Err(err) = self.channel.write(payload.as_bytes()).await {
            return self.fail(channel_failure(&port, err));
        }

        let response = match self
            .collector
            .collect(self.channel.as_ref(), self.deadline)
            .await
        {
            Ok(response) => response,
            Err(CollectError::Timeout { partial, waited_ms }) => {
                // Partial lines are surfaced, not discarded
                self.forward_lines(&partial.lines);
                return self.fail(TransactionError::CollectTimeout { waited_ms });
            }
            Err(CollectError::Channel(err)) => {
                return self.fail(channel_failure(&port, err));
            }
        };

        let selected = select_lines(command, &response.lines);
        let rendered = self.forward_lines(&selected);
        debug!(
            command = %command.text,
            outcome = %response.outcome,
            lines = rendered.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transaction complete"
        );
        Ok(rendered)
    }

    // Private methods

    fn forward_lines(&self, lines: &[TimedLine]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                let rendered = format!(
                    "{} <- {}",
                    format_stamp(line.at, StampMode::Display),
                    line.text
                );
                self.emit(&rendered);
                rendered
            })
            .collect()
    }

    fn fail<T>(&self, err: TransactionError) -> Result<T, TransactionError> {
        self.emit(&format!("{} !! {}", now_stamp(StampMode::Display), err));
        warn!(error = %err, "transaction failed");
        Err(err)
    }

    fn emit(&self, line: &str) {
        if let Err(err) = self.sink.emit(line) {
            warn!(error = %err, "output sink rejected line");
        }
    }
}

pub(crate) fn channel_failure(port: &str, err: ChannelError) -> TransactionError {
    match err {
        ChannelError::NotOpen => TransactionError::ChannelNotOpen {
            port: port.to_string(),
        },
        other => TransactionError::Io(other),
    }
}
