use crate::core::catalog::Command;
use crate::core::player::ScriptPlayer;
use crate::core::script::Script;
use crate::core::transaction::TransactionEngine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// A queued unit of work for the transaction worker
#[derive(Debug, Clone)]
pub enum WorkItem {
    Command(Command),
    Script(Script),
}

/// Producer handle feeding the transaction worker.
///
/// Interactive surfaces enqueue here instead of driving the engine
/// directly; the worker owns sequencing. Dropping every handle shuts the
/// worker down after it drains.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<WorkItem>,
}

impl WorkQueue {
    /// Queue a single command transaction. Returns false when the worker is gone.
    pub fn submit_command(&self, command: Command) -> bool {
        self.tx.send(WorkItem::Command(command)).is_ok()
    }

    /// Queue a script for playback. Returns false when the worker is gone.
    pub fn submit_script(&self, script: Script) -> bool {
        self.tx.send(WorkItem::Script(script)).is_ok()
    }
}

/// Start the worker task consuming the queue.
///
/// Commands run inline, one at a time. Scripts spawn onto their own task so
/// a queued command contends with the running script at the channel gate,
/// per directive, instead of waiting for the whole script. Outstanding
/// script tasks are awaited before the worker exits.
pub fn spawn_worker(
    engine: Arc<TransactionEngine>,
    player: Arc<ScriptPlayer>,
) -> (WorkQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = tokio::spawn(async move {
        let mut script_tasks: Vec<JoinHandle<()>> = Vec::new();

        while let Some(item) = rx.recv().await {
            match item {
                WorkItem::Command(command) => {
                    // Failures are already surfaced on the sink
                    let _ = engine.submit(&command).await;
                }
                WorkItem::Script(script) => {
                    let player = Arc::clone(&player);
                    script_tasks.push(tokio::spawn(async move {
                        let _ = player.play(&script).await;
                    }));
                }
            }
            script_tasks.retain(|task| !task.is_finished());
        }

        for task in script_tasks {
            let _ = task.await;
        }
        debug!("work queue drained");
    });

    (WorkQueue { tx }, handle)
}
