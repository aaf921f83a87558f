use crate::core::catalog::Command;
use crate::core::channel::Channel;
use crate::core::classify::strip_ansi;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

/// Default collector poll cadence in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Terminal markers scanned for in the accumulated buffer
const MARKER_OK: &str = "OK";
const MARKER_ERROR: &str = "ERROR";

/// One response line with its arrival stamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedLine {
    /// Wall-clock time of the chunk that completed this line
    pub at: SystemTime,
    /// Cleaned line text
    pub text: String,
}

impl TimedLine {
    pub fn new(at: SystemTime, text: impl Into<String>) -> Self {
        Self {
            at,
            text: text.into(),
        }
    }
}

/// Terminal outcome of a collected response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Error,
    TimedOut,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Ok => write!(f, "OK"),
            Outcome::Error => write!(f, "ERROR"),
            Outcome::TimedOut => write!(f, "TIMEOUT"),
        }
    }
}

/// Everything read during one transaction's wait
#[derive(Debug, Clone)]
pub struct CollectedResponse {
    /// Cleaned lines in strict arrival order
    pub lines: Vec<TimedLine>,
    /// The raw accumulated buffer, untouched
    pub raw: String,
    /// How collection ended
    pub outcome: Outcome,
}

/// Failure collecting a terminated response
#[derive(Error, Debug)]
pub enum CollectError {
    #[error("No terminal marker within {waited_ms}ms")]
    Timeout {
        /// Whatever arrived before the deadline; caller decides whether to surface it
        partial: CollectedResponse,
        waited_ms: u64,
    },

    #[error(transparent)]
    Channel(#[from] crate::domain::error::ChannelError),
}

/// Accumulates channel bytes until a terminal marker or a deadline.
///
/// Marker detection is a substring scan over the whole accumulated buffer,
/// case sensitive. An echo containing `OK` or `ERROR` inside a larger token
/// terminates collection too; firmware-specific framing may rely on the
/// loose match, so it is part of the contract.
#[derive(Debug, Clone)]
pub struct ResponseCollector {
    poll_interval: Duration,
}

impl Default for ResponseCollector {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl ResponseCollector {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Poll the channel until the buffer contains a terminal marker.
    ///
    /// Each nonempty read is stamped with its arrival time. If `deadline`
    /// elapses first the partial data rides inside the error.
    pub async fn collect(
        &self,
        channel: &dyn Channel,
        deadline: Duration,
    ) -> Result<CollectedResponse, CollectError> {
        let started = Instant::now();
        let mut chunks: Vec<(SystemTime, String)> = Vec::new();
        let mut buffer = String::new();

        loop {
            let bytes = channel.read_available().await?;
            if !bytes.is_empty() {
                let text = String::from_utf8_lossy(&bytes).into_owned();
                buffer.push_str(&text);
                chunks.push((SystemTime::now(), text));

                if let Some(outcome) = scan_terminal(&buffer) {
                    return Ok(CollectedResponse {
                        lines: assemble(&chunks),
                        raw: buffer,
                        outcome,
                    });
                }
            }

            if started.elapsed() >= deadline {
                return Err(CollectError::Timeout {
                    partial: CollectedResponse {
                        lines: assemble(&chunks),
                        raw: buffer,
                        outcome: Outcome::TimedOut,
                    },
                    waited_ms: deadline.as_millis() as u64,
                });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Whole-buffer terminal-marker scan. Earliest marker wins.
fn scan_terminal(buffer: &str) -> Option<Outcome> {
    match (buffer.find(MARKER_OK), buffer.find(MARKER_ERROR)) {
        (Some(ok), Some(err)) => Some(if err < ok { Outcome::Error } else { Outcome::Ok }),
        (Some(_), None) => Some(Outcome::Ok),
        (None, Some(_)) => Some(Outcome::Error),
        (None, None) => None,
    }
}

/// Turn stamped chunks into cleaned, stamped lines.
///
/// A line takes the stamp of the chunk in which its newline arrived; an
/// unterminated trailing fragment takes the final chunk's stamp. Lines that
/// are empty after ANSI-strip and trim are dropped; modems pad responses
/// with blank separator lines and the selection policies operate on the
/// meaningful ones.
fn assemble(chunks: &[(SystemTime, String)]) -> Vec<TimedLine> {
    let mut lines = Vec::new();
    let mut pending = String::new();
    let mut last_at: Option<SystemTime> = None;

    for (at, text) in chunks {
        last_at = Some(*at);
        for ch in text.chars() {
            if ch == '\n' {
                push_cleaned(&mut lines, *at, &pending);
                pending.clear();
            } else {
                pending.push(ch);
            }
        }
    }

    if !pending.is_empty() {
        if let Some(at) = last_at {
            push_cleaned(&mut lines, at, &pending);
        }
    }

    lines
}

fn push_cleaned(lines: &mut Vec<TimedLine>, at: SystemTime, raw: &str) {
    let text = strip_ansi(raw).trim().to_string();
    if !text.is_empty() {
        lines.push(TimedLine { at, text });
    }
}

/// Apply a command's line-selection policy to collected lines.
///
/// Single-line: the line immediately preceding the first line equal to
/// `OK` is the sole result. Multi-line: every line up to (excluding) the
/// first line containing `OK` or `ERROR`, minus lines matching the
/// command's ignore substring.
pub fn select_lines(command: &Command, lines: &[TimedLine]) -> Vec<TimedLine> {
    if command.single_line {
        for pair in lines.windows(2) {
            if pair[1].text == MARKER_OK {
                return vec![pair[0].clone()];
            }
        }
        Vec::new()
    } else {
        let mut selected = Vec::new();
        for line in lines {
            if line.text.contains(MARKER_OK) || line.text.contains(MARKER_ERROR) {
                break;
            }
            if let Some(ignore) = &command.ignore {
                if line.text.contains(ignore) {
                    continue;
                }
            }
            selected.push(line.clone());
        }
        selected
    }
}
