//! The frontier walker: postwatch's core discovery state machine.
//!
//! One discovery cycle walks the frontier in ascending order, pacing each
//! probe with the rate controller. A 429 or transient failure retries the
//! same id; a not-found advances; a find stops the scan, optionally
//! re-probes the earlier ids (the forum is eventually consistent, so a post
//! can appear behind one that was found first), commits the winner to the
//! cursor store, and collapses the frontier to the winner's successor. A
//! full pass of not-founds grows the frontier by one candidate and reports
//! exhaustion, which is the normal idle outcome, not an error.
//!
//! The whole cycle runs under a deadline. Hitting it aborts the cycle with
//! frontier and cursor untouched, distinct from both exhaustion and the
//! per-fetch network timeout.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};

use crate::config::{DiscoveryConfig, RateConfig};
use crate::cursor::CursorStore;
use crate::dispatch::DiscoveredPost;
use crate::error::{Result, WatchError};
use crate::fetch::{FetchOutcome, PostFetcher};
use crate::frontier::Frontier;
use crate::rate::RateController;

use std::sync::Arc;

/// Result of one discovery cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A new post was confirmed and committed.
    Discovered { id: i64, payload: String },
    /// Every candidate came back not-found; the frontier grew by one.
    Exhausted,
    /// The stop signal fired mid-cycle; state unchanged.
    Stopped,
}

/// Explicitly constructed discovery scheduler, shared by `Arc`.
///
/// Cursor, frontier, and rate state each sit behind their own lock so the
/// admin surface can take consistent snapshots while a cycle is running.
/// `cycle_gate` is held for the duration of a cycle; a cursor override
/// acquires it to quiesce the walker before touching shared state.
pub struct DiscoveryScheduler {
    cursor: Mutex<CursorStore>,
    frontier: Mutex<Frontier>,
    rate: Mutex<RateController>,
    fetcher: Arc<dyn PostFetcher>,
    enabled: AtomicBool,
    cycle_gate: tokio::sync::Mutex<()>,
    stop: watch::Receiver<bool>,
    config: DiscoveryConfig,
}

impl DiscoveryScheduler {
    /// Build a scheduler, reseeding the frontier from the persisted cursor.
    pub fn new(
        cursor: CursorStore,
        fetcher: Arc<dyn PostFetcher>,
        rate_config: RateConfig,
        config: DiscoveryConfig,
        stop: watch::Receiver<bool>,
    ) -> Result<Self> {
        let latest = cursor.get()?;
        log::info!("Discovery starting from cursor {} (frontier [{}])", latest, latest + 1);

        Ok(Self {
            cursor: Mutex::new(cursor),
            frontier: Mutex::new(Frontier::seed(latest)),
            rate: Mutex::new(RateController::new(rate_config)),
            fetcher,
            enabled: AtomicBool::new(true),
            cycle_gate: tokio::sync::Mutex::new(()),
            stop,
            config,
        })
    }

    /// Run one discovery cycle.
    ///
    /// With `recheck`, a find at id `p` triggers a second pass over the
    /// frontier ids before `p`; the earliest id found wins the cycle.
    pub async fn run_cycle(&self, recheck: bool) -> Result<CycleOutcome> {
        let _gate = self.cycle_gate.lock().await;

        let deadline = Instant::now() + Duration::from_millis(self.config.cycle_timeout_ms);
        let candidates = self.frontier.lock().expect("frontier lock").ids();

        let mut found: Option<(i64, String)> = None;
        for &id in &candidates {
            match self.probe(id, deadline).await? {
                ProbeResult::Found(payload) => {
                    found = Some((id, payload));
                    break;
                }
                ProbeResult::NotFound => continue,
                ProbeResult::Stopped => return Ok(CycleOutcome::Stopped),
            }
        }

        let Some((mut winner, mut payload)) = found else {
            // Legitimate, frequent outcome: the forum has no newer post yet.
            let mut frontier = self.frontier.lock().expect("frontier lock");
            frontier.grow();
            log::debug!("Cycle exhausted, frontier grew to {:?}", frontier.ids());
            return Ok(CycleOutcome::Exhausted);
        };

        if recheck {
            // An earlier candidate may have been transiently missing on the
            // first pass but visible now. Earliest id wins.
            for &id in candidates.iter().take_while(|&&c| c < winner) {
                match self.probe(id, deadline).await? {
                    ProbeResult::Found(earlier_payload) => {
                        log::info!("Recheck found earlier post {} (preferring over {})", id, winner);
                        winner = id;
                        payload = earlier_payload;
                        break;
                    }
                    ProbeResult::NotFound => continue,
                    ProbeResult::Stopped => return Ok(CycleOutcome::Stopped),
                }
            }
        }

        self.commit(winner)?;
        Ok(CycleOutcome::Discovered { id: winner, payload })
    }

    /// Probe a single id, retrying in place on 429 and transient failures
    /// until the cycle deadline.
    async fn probe(&self, id: i64, deadline: Instant) -> Result<ProbeResult> {
        loop {
            if !self.pace(deadline).await? {
                return Ok(ProbeResult::Stopped);
            }

            match self.fetcher.fetch(id).await? {
                FetchOutcome::Found(payload) => {
                    self.rate.lock().expect("rate lock").on_found();
                    return Ok(ProbeResult::Found(payload));
                }
                FetchOutcome::NotFound => {
                    self.rate.lock().expect("rate lock").on_not_found();
                    return Ok(ProbeResult::NotFound);
                }
                FetchOutcome::RateLimited => {
                    // Slow down and retry the same id; never advances the
                    // scan or reshapes the frontier.
                    self.rate.lock().expect("rate lock").on_rate_limited();
                }
                FetchOutcome::Transient(reason) => {
                    log::warn!("Transient failure fetching post {}: {}", id, reason);
                }
                FetchOutcome::Unexpected(status) => {
                    log::warn!("Unexpected HTTP {} fetching post {}", status, id);
                }
            }
        }
    }

    /// Sleep the current rate interval, bounded by the cycle deadline and
    /// the stop signal. Returns false if stop was requested.
    async fn pace(&self, deadline: Instant) -> Result<bool> {
        let now = Instant::now();
        if now >= deadline {
            return Err(WatchError::CycleTimeout(Duration::from_millis(self.config.cycle_timeout_ms)));
        }

        let interval = self.rate.lock().expect("rate lock").interval_duration();
        let sleep = interval.min(deadline - now);

        let mut stop = self.stop.clone();
        if *stop.borrow() {
            return Ok(false);
        }
        tokio::select! {
            _ = tokio::time::sleep(sleep) => {}
            changed = stop.changed() => {
                // A dropped sender counts as a stop request
                if changed.is_err() || *stop.borrow() {
                    return Ok(false);
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(WatchError::CycleTimeout(Duration::from_millis(self.config.cycle_timeout_ms)));
        }
        Ok(true)
    }

    /// Commit a discovered id: persist the cursor, collapse the frontier.
    fn commit(&self, id: i64) -> Result<()> {
        self.cursor.lock().expect("cursor lock").set(id)?;
        self.frontier.lock().expect("frontier lock").collapse_to(id);
        log::info!("Committed post {}, frontier now [{}]", id, id + 1);
        Ok(())
    }

    /// Override the cursor, quiescing any in-flight cycle first.
    ///
    /// Caller is expected to have disabled discovery; the gate acquisition
    /// then waits out the cycle that was already running.
    pub async fn override_cursor(&self, id: i64) -> Result<()> {
        let _gate = self.cycle_gate.lock().await;
        self.cursor.lock().expect("cursor lock").set(id)?;
        let mut frontier = self.frontier.lock().expect("frontier lock");
        *frontier = Frontier::seed(id);
        log::info!("Cursor overridden to {}, frontier reseeded to [{}]", id, id + 1);
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        log::info!("Discovery {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Current persisted cursor value.
    pub fn cursor_value(&self) -> Result<i64> {
        self.cursor.lock().expect("cursor lock").get()
    }

    /// Snapshot of the frontier candidate ids.
    pub fn frontier_ids(&self) -> Vec<i64> {
        self.frontier.lock().expect("frontier lock").ids()
    }

    /// Current inter-probe delay, seconds.
    pub fn rate_interval(&self) -> f64 {
        self.rate.lock().expect("rate lock").interval()
    }

    /// Recheck policy from config, applied uniformly at every call site.
    pub fn recheck(&self) -> bool {
        self.config.recheck
    }

    /// Pause between retries after a failed cycle.
    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.config.retry_pause_ms)
    }
}

enum ProbeResult {
    Found(String),
    NotFound,
    Stopped,
}

/// The long-running producer task: run cycles until stopped, pushing every
/// discovery onto the queue.
///
/// Exhaustion just loops again. A cycle timeout is logged and retried after
/// a pause with the frontier unchanged. Storage failures propagate out so
/// the supervisor can shut the process down.
pub async fn discovery_loop(
    scheduler: Arc<DiscoveryScheduler>,
    tx: mpsc::Sender<DiscoveredPost>,
    mut stop: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *stop.borrow() {
            log::info!("Discovery loop stopping");
            return Ok(());
        }

        if !scheduler.is_enabled() {
            // Paused via the admin surface; idle while watching the stop flag
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(250)) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
            continue;
        }

        match scheduler.run_cycle(scheduler.recheck()).await {
            Ok(CycleOutcome::Discovered { id, payload }) => {
                log::info!("Discovered post {}", id);
                if tx.send(DiscoveredPost { id, payload }).await.is_err() {
                    return Err(WatchError::QueueClosed);
                }
            }
            Ok(CycleOutcome::Exhausted) => {}
            Ok(CycleOutcome::Stopped) => {
                log::info!("Discovery loop stopping");
                return Ok(());
            }
            Err(WatchError::CycleTimeout(timeout)) => {
                log::error!("Discovery cycle timed out after {:?}, retrying", timeout);
                tokio::select! {
                    _ = tokio::time::sleep(scheduler.retry_pause()) => {}
                    changed = stop.changed() => {
                        if changed.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                // Persistence and other unclassified failures are fatal to
                // the loop; the supervisor turns task death into shutdown.
                log::error!("Discovery loop failed: {}", e);
                return Err(e);
            }
        }
    }
}
