//! Debounced autosave.
//!
//! Every persistent change hands the scheduler a versioned snapshot of the
//! flow. The scheduler waits for a quiet period, then writes the newest
//! snapshot through the [`FlowStore`]. It runs as its own task:
//!
//! ```text
//! Idle --change--> Pending --change--> Pending (timer re-armed)
//!                  Pending --timer---> Saving --settled--> Idle or Pending
//! ```
//!
//! One save is in flight at a time. Changes arriving while saving wait in
//! the channel and re-arm the timer once the save settles. A failed save is
//! not retried; the next change saves the latest state. Versions only move
//! forward: a snapshot no newer than the last acknowledged one is dropped.

use crate::error::EditorError;
use crate::notice::{self, Notice};
use classflow_client::{FlowRecord, FlowStore};
use classflow_graph::GraphState;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Where the scheduler is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Nothing waiting to be saved.
    Idle,
    /// A snapshot is waiting for the timer.
    Pending,
    /// A save is in flight.
    Saving,
}

/// The flow as of one change.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub flow: FlowRecord,
    pub graph: GraphState,
}

enum Command {
    Save(Snapshot),
    Flush(oneshot::Sender<()>),
}

enum Wake {
    Command(Option<Command>),
    Timer,
}

/// Handle to a running autosave scheduler.
pub struct Autosave {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<SaveState>,
    acknowledged: watch::Receiver<u64>,
    next_version: AtomicU64,
    task: JoinHandle<()>,
}

impl Autosave {
    /// Starts the scheduler on the current runtime.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn FlowStore>,
        debounce: Duration,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SaveState::Idle);
        let (acknowledged_tx, acknowledged) = watch::channel(0);

        let scheduler = Scheduler {
            store,
            debounce,
            notices,
            state: state_tx,
            acknowledged: acknowledged_tx,
            last_acknowledged: 0,
        };
        let task = tokio::spawn(scheduler.run(receiver));

        Self {
            commands,
            state,
            acknowledged,
            next_version: AtomicU64::new(1),
            task,
        }
    }

    /// Queues the flow as it is now and re-arms the timer.
    ///
    /// Returns the version assigned to the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler has stopped.
    pub fn submit(&self, flow: FlowRecord, graph: GraphState) -> Result<u64, EditorError> {
        let version = self.next_version.fetch_add(1, Ordering::Relaxed);
        self.send(Snapshot {
            version,
            flow,
            graph,
        })?;
        Ok(version)
    }

    fn send(&self, snapshot: Snapshot) -> Result<(), EditorError> {
        self.commands
            .send(Command::Save(snapshot))
            .map_err(|_| EditorError::AutosaveStopped)
    }

    #[must_use]
    pub fn state(&self) -> SaveState {
        *self.state.borrow()
    }

    /// Whether a save is in flight.
    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.state() == SaveState::Saving
    }

    /// Highest version the store has accepted. Zero before the first save.
    #[must_use]
    pub fn acknowledged_version(&self) -> u64 {
        *self.acknowledged.borrow()
    }

    /// Watches state changes, for save indicators.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<SaveState> {
        self.state.clone()
    }

    /// Saves any pending snapshot without waiting for the timer and
    /// returns once the scheduler is idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler has stopped.
    pub async fn flush(&self) -> Result<(), EditorError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(tx))
            .map_err(|_| EditorError::AutosaveStopped)?;
        rx.await.map_err(|_| EditorError::AutosaveStopped)
    }

    /// Stops the scheduler, saving whatever is pending first.
    pub async fn shutdown(self) {
        let Self { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!(error = %e, "autosave task ended abnormally");
        }
    }
}

struct Scheduler {
    store: Arc<dyn FlowStore>,
    debounce: Duration,
    notices: broadcast::Sender<Notice>,
    state: watch::Sender<SaveState>,
    acknowledged: watch::Sender<u64>,
    last_acknowledged: u64,
}

impl Scheduler {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut pending: Option<Snapshot> = None;
        let mut waiters: Vec<oneshot::Sender<()>> = Vec::new();

        loop {
            let Some(snapshot) = pending.take() else {
                self.state.send_replace(SaveState::Idle);
                for waiter in waiters.drain(..) {
                    let _ = waiter.send(());
                }
                match commands.recv().await {
                    Some(Command::Save(incoming)) => pending = self.accept(None, incoming),
                    Some(Command::Flush(waiter)) => waiters.push(waiter),
                    None => break,
                }
                continue;
            };

            self.state.send_replace(SaveState::Pending);
            if waiters.is_empty() {
                let wake = tokio::select! {
                    command = commands.recv() => Wake::Command(command),
                    () = tokio::time::sleep(self.debounce) => Wake::Timer,
                };
                match wake {
                    Wake::Command(Some(Command::Save(incoming))) => {
                        pending = self.accept(Some(snapshot), incoming);
                        continue;
                    }
                    Wake::Command(Some(Command::Flush(waiter))) => {
                        waiters.push(waiter);
                        pending = Some(snapshot);
                        continue;
                    }
                    Wake::Command(None) => debug!("editor closed, saving pending changes"),
                    Wake::Timer => {}
                }
            }

            self.save(snapshot).await;
        }

        self.state.send_replace(SaveState::Idle);
        debug!("autosave stopped");
    }

    /// Picks which snapshot to keep pending.
    fn accept(&self, current: Option<Snapshot>, incoming: Snapshot) -> Option<Snapshot> {
        if incoming.version <= self.last_acknowledged {
            debug!(
                version = incoming.version,
                acknowledged = self.last_acknowledged,
                "dropping snapshot older than saved state"
            );
            return current;
        }
        match current {
            Some(current) if current.version > incoming.version => {
                debug!(
                    version = incoming.version,
                    pending = current.version,
                    "dropping out-of-order snapshot"
                );
                Some(current)
            }
            _ => Some(incoming),
        }
    }

    async fn save(&mut self, snapshot: Snapshot) {
        let Snapshot {
            version,
            mut flow,
            graph,
        } = snapshot;
        if version <= self.last_acknowledged {
            return;
        }

        self.state.send_replace(SaveState::Saving);
        if let Err(e) = flow.set_graph(&graph) {
            warn!(flow_id = %flow.id, version, error = %e, "could not serialize flow");
            notice::publish(&self.notices, Notice::error("Couldn't save your changes."));
            return;
        }

        match self.store.save_flow(&flow).await {
            Ok(()) => {
                self.last_acknowledged = self.last_acknowledged.max(version);
                self.acknowledged.send_replace(self.last_acknowledged);
                info!(flow_id = %flow.id, version, is_active = flow.is_active, "flow autosaved");
            }
            Err(e) => {
                warn!(flow_id = %flow.id, version, error = %e, "autosave failed");
                notice::publish(
                    &self.notices,
                    Notice::error("Couldn't save your changes. They'll be saved with your next edit."),
                );
            }
        }
    }
}
