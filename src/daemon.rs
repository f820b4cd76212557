//! Supervisor for the two pipeline loops.
//!
//! Spawns the discovery loop and the dispatch loop as independent tokio
//! tasks, polls their liveness at a coarse interval, and on unexpected task
//! death (or Ctrl-C) flips the shared stop flag and waits both tasks out
//! with a bounded join. Cooperative stop only: neither task is aborted, so
//! the cursor store and queue are never left torn.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::discovery::{DiscoveryScheduler, discovery_loop};
use crate::dispatch::{DiscoveredPost, DispatchLoop};
use crate::error::{Result, WatchError};

/// How often task liveness is polled.
const LIVENESS_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on waiting for a task to observe the stop flag.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the cooperative stop channel shared by all tasks.
pub fn stop_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Runs and monitors the discovery and dispatch tasks.
pub struct Supervisor {
    stop_tx: watch::Sender<bool>,
    discovery: JoinHandle<Result<()>>,
    dispatch: JoinHandle<Result<()>>,
}

impl Supervisor {
    /// Spawn both loops. `stop_tx` must be the sender side of the channel
    /// the scheduler and dispatch loop were built with.
    pub fn start(
        scheduler: Arc<DiscoveryScheduler>,
        tx: tokio::sync::mpsc::Sender<DiscoveredPost>,
        dispatch: DispatchLoop,
        stop_tx: watch::Sender<bool>,
    ) -> Self {
        let stop_rx = stop_tx.subscribe();
        let discovery = tokio::spawn(discovery_loop(scheduler, tx, stop_rx));
        let dispatch = tokio::spawn(dispatch.run());

        Self {
            stop_tx,
            discovery,
            dispatch,
        }
    }

    /// Block until a task dies or Ctrl-C arrives, then shut down both loops.
    pub async fn run(self) -> Result<()> {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(LIVENESS_INTERVAL) => {
                    if self.discovery.is_finished() {
                        log::error!("Discovery loop terminated unexpectedly, shutting down");
                        break;
                    }
                    if self.dispatch.is_finished() {
                        log::error!("Dispatch loop terminated unexpectedly, shutting down");
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Interrupt received, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await
    }

    /// Signal stop and join both tasks with a bounded wait. Returns the
    /// first task failure, if any.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.stop_tx.send(true);

        let discovery_result = join_bounded("discovery", self.discovery).await;
        let dispatch_result = join_bounded("dispatch", self.dispatch).await;

        discovery_result?;
        dispatch_result
    }
}

async fn join_bounded(name: &str, handle: JoinHandle<Result<()>>) -> Result<()> {
    match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_err)) => Err(WatchError::InvalidState(format!(
            "{} task panicked: {}",
            name, join_err
        ))),
        Err(_) => {
            log::error!("{} task ignored the stop signal for {:?}", name, JOIN_TIMEOUT);
            Err(WatchError::InvalidState(format!("{} task failed to stop", name)))
        }
    }
}
