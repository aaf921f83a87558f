use crate::core::channel::{Channel, ChannelGate};
use crate::core::classify::strip_ansi;
use crate::core::sink::OutputSink;
use crate::core::stamp::{now_stamp, StampMode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default tailer poll cadence in milliseconds
pub const DEFAULT_TAILER_POLL_MS: u64 = 50;

/// Background drain for unsolicited modem output.
///
/// The loop runs only while enabled, and only touches the channel when it
/// can take the gate without waiting; a cycle that finds the gate held by a
/// transaction or a script is skipped. Incomplete trailing fragments carry
/// over to the next cycle. Disabling signals the loop to finish its current
/// cycle and joins the task.
pub struct NotificationTailer {
    channel: Arc<dyn Channel>,
    gate: Arc<ChannelGate>,
    sink: Arc<dyn OutputSink>,
    enabled: Arc<AtomicBool>,
    poll_interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationTailer {
    pub fn new(channel: Arc<dyn Channel>, gate: Arc<ChannelGate>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            channel,
            gate,
            sink,
            enabled: Arc::new(AtomicBool::new(false)),
            poll_interval: Duration::from_millis(DEFAULT_TAILER_POLL_MS),
            task: Mutex::new(None),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Spawn the tailing loop. A second enable while running is a no-op.
    pub async fn enable(&self) {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }

        let channel = Arc::clone(&self.channel);
        let gate = Arc::clone(&self.gate);
        let sink = Arc::clone(&self.sink);
        let enabled = Arc::clone(&self.enabled);
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            run_loop(channel, gate, sink, enabled, poll_interval).await;
        });
        *self.task.lock().await = Some(handle);
        debug!("notification tailer enabled");
    }

    /// Stop after the current cycle and join the loop task.
    pub async fn disable(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "tailer task join failed");
            }
            debug!("notification tailer disabled");
        }
    }
}

async fn run_loop(
    channel: Arc<dyn Channel>,
    gate: Arc<ChannelGate>,
    sink: Arc<dyn OutputSink>,
    enabled: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    let mut carry = String::new();

    while enabled.load(Ordering::SeqCst) {
        if channel.status().await.is_open() {
            // Never wait behind a transaction or script; skip the cycle
            if let Some(_guard) = gate.try_acquire() {
                match channel.bytes_waiting().await {
                    Ok(waiting) if waiting > 0 => match channel.read_available().await {
                        Ok(bytes) if !bytes.is_empty() => {
                            carry.push_str(&String::from_utf8_lossy(&bytes));
                            drain_carry(&mut carry, sink.as_ref());
                        }
                        Ok(_) => {}
                        Err(err) => debug!(error = %err, "tailer read failed"),
                    },
                    Ok(_) => {}
                    Err(err) => debug!(error = %err, "tailer poll failed"),
                }
            }
        }
        tokio::time::sleep(poll_interval).await;
    }
    debug!("notification tailer loop stopped");
}

/// Emit complete carried lines, keeping any unterminated fragment.
fn drain_carry(carry: &mut String, sink: &dyn OutputSink) {
    let Some(pos) = carry.rfind('\n') else {
        return;
    };
    let complete: String = carry.drain(..=pos).collect();
    for segment in complete.split('\n') {
        let line = strip_ansi(segment).trim().to_string();
        if line.is_empty() {
            continue;
        }
        let rendered = format!("{} <! {}", now_stamp(StampMode::Display), line);
        if let Err(err) = sink.emit(&rendered) {
            warn!(error = %err, "output sink rejected notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sink::MemorySink;
    use crate::core::testing::ScriptedChannel;

    fn test_tailer(
        channel: Arc<ScriptedChannel>,
    ) -> (NotificationTailer, Arc<MemorySink>, Arc<ChannelGate>) {
        let sink = Arc::new(MemorySink::new());
        let gate = Arc::new(ChannelGate::new());
        let tailer = NotificationTailer::new(
            channel,
            Arc::clone(&gate),
            Arc::clone(&sink) as Arc<dyn OutputSink>,
        )
        .with_poll_interval(Duration::from_millis(5));
        (tailer, sink, gate)
    }

    #[tokio::test]
    async fn test_forwards_unsolicited_lines() {
        let channel = Arc::new(ScriptedChannel::open_with_chunks(vec![
            b"%NOTIFY: ring\r\n".to_vec(),
        ]));
        let (tailer, sink, _) = test_tailer(Arc::clone(&channel));

        tailer.enable().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        tailer.disable().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<! %NOTIFY: ring"));
        assert!(lines[0].starts_with('['));
    }

    #[tokio::test]
    async fn test_skips_cycles_while_gate_is_held() {
        let channel = Arc::new(ScriptedChannel::open_with_chunks(vec![
            b"%NOTIFY: blocked\r\n".to_vec(),
        ]));
        let (tailer, sink, gate) = test_tailer(Arc::clone(&channel));

        let guard = gate.acquire().await;
        tailer.enable().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(sink.is_empty(), "tailer read while the gate was held");

        drop(guard);
        tokio::time::sleep(Duration::from_millis(40)).await;
        tailer.disable().await;

        assert!(sink.lines().iter().any(|l| l.contains("<! %NOTIFY: blocked")));
    }

    #[tokio::test]
    async fn test_carries_partial_line_across_reads() {
        let channel = Arc::new(ScriptedChannel::open_with_chunks(vec![
            b"%NOTI".to_vec(),
        ]));
        let (tailer, sink, _) = test_tailer(Arc::clone(&channel));

        tailer.enable().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(sink.is_empty(), "fragment emitted before its newline");

        channel.push_chunk(b"FY: done\r\n");
        tokio::time::sleep(Duration::from_millis(30)).await;
        tailer.disable().await;

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("<! %NOTIFY: done"));
    }

    #[tokio::test]
    async fn test_idle_when_channel_closed() {
        let channel = Arc::new(ScriptedChannel::new());
        let (tailer, sink, _) = test_tailer(Arc::clone(&channel));

        tailer.enable().await;
        assert!(tailer.is_enabled());
        tokio::time::sleep(Duration::from_millis(30)).await;
        tailer.disable().await;

        assert!(!tailer.is_enabled());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_cycle_is_repeatable() {
        let channel = Arc::new(ScriptedChannel::open_with_chunks(vec![]));
        let (tailer, sink, _) = test_tailer(Arc::clone(&channel));

        tailer.enable().await;
        tailer.enable().await; // second enable is a no-op
        tailer.disable().await;
        tailer.disable().await; // second disable is a no-op

        channel.push_chunk(b"%EVENT: 1\r\n");
        tailer.enable().await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        tailer.disable().await;

        assert!(sink.lines().iter().any(|l| l.contains("<! %EVENT: 1")));
    }
}
