//! Administrative surface over the running scheduler.
//!
//! The HTTP/command transport that sits above this is out of scope; this
//! handle is the boundary it calls into. All reads are lock-protected
//! snapshots; the cursor override quiesces the walker before touching
//! shared state, so a manual correction can never race an in-flight commit.

use std::sync::Arc;

use crate::discovery::DiscoveryScheduler;
use crate::error::Result;
use crate::handler::HandlerRegistry;

/// Handle exposed to the admin layer.
#[derive(Clone)]
pub struct AdminHandle {
    scheduler: Arc<DiscoveryScheduler>,
    registry: Arc<HandlerRegistry>,
}

impl AdminHandle {
    pub fn new(scheduler: Arc<DiscoveryScheduler>, registry: Arc<HandlerRegistry>) -> Self {
        Self { scheduler, registry }
    }

    /// Current persisted cursor.
    pub fn cursor(&self) -> Result<i64> {
        self.scheduler.cursor_value()
    }

    /// Snapshot of the frontier candidate ids.
    pub fn frontier(&self) -> Vec<i64> {
        self.scheduler.frontier_ids()
    }

    /// Current inter-probe delay, seconds.
    pub fn rate(&self) -> f64 {
        self.scheduler.rate_interval()
    }

    pub fn enable_discovery(&self) {
        self.scheduler.set_enabled(true);
    }

    pub fn disable_discovery(&self) {
        self.scheduler.set_enabled(false);
    }

    pub fn discovery_enabled(&self) -> bool {
        self.scheduler.is_enabled()
    }

    /// Force-set the cursor.
    ///
    /// Disables discovery, waits for the in-flight cycle to finish, writes
    /// the cursor, reseeds the frontier, then re-enables discovery.
    pub async fn set_cursor(&self, id: i64) -> Result<()> {
        self.scheduler.set_enabled(false);
        let result = self.scheduler.override_cursor(id).await;
        self.scheduler.set_enabled(true);
        result
    }

    pub fn enable_handler(&self, name: &str) -> bool {
        self.registry.enable(name)
    }

    pub fn disable_handler(&self, name: &str) -> bool {
        self.registry.disable(name)
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.registry.names()
    }
}
