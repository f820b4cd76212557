//! Post handlers and their registry.
//!
//! Handlers are the pluggable consumers of discovered posts (score games,
//! admin commands, chat relays). They are registered once at startup, in a
//! fixed order, and can be enabled or disabled at runtime. Handlers own no
//! scheduler state; a failing handler never affects the pipeline or its
//! peers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::error::Result;
use crate::parse::PostRecord;

/// A named consumer of discovered posts.
#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    async fn process(&self, post: &PostRecord) -> Result<()>;
}

/// Built-in handler that logs each discovered post.
///
/// The business handlers (score games, admin commands, chat relays) plug in
/// from outside; this one keeps a default deployment observable.
pub struct LogHandler;

#[async_trait]
impl Handler for LogHandler {
    fn name(&self) -> &str {
        "log"
    }

    async fn process(&self, post: &PostRecord) -> Result<()> {
        log::info!(
            "Post {} by {} in topic {} (subforum {}) at {}",
            post.id,
            post.author,
            post.topic_id,
            post.topic_subforum_id,
            post.creation_time
        );
        Ok(())
    }
}

struct Registration {
    handler: Arc<dyn Handler>,
    enabled: AtomicBool,
}

/// Ordered registry of handlers with runtime enable flags.
#[derive(Default)]
pub struct HandlerRegistry {
    entries: Vec<Registration>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a handler, enabled by default. Dispatch order follows
    /// registration order.
    pub fn register(&mut self, handler: Arc<dyn Handler>) {
        self.entries.push(Registration {
            handler,
            enabled: AtomicBool::new(true),
        });
    }

    /// Enable a handler by name. Returns false if no such handler.
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a handler by name. Returns false if no such handler.
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entries.iter().find(|e| e.handler.name() == name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::SeqCst);
                log::info!("Handler '{}' {}", name, if enabled { "enabled" } else { "disabled" });
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.entries
            .iter()
            .find(|e| e.handler.name() == name)
            .map(|e| e.enabled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Currently enabled handlers, in registration order.
    pub fn enabled_handlers(&self) -> Vec<Arc<dyn Handler>> {
        self.entries
            .iter()
            .filter(|e| e.enabled.load(Ordering::SeqCst))
            .map(|e| Arc::clone(&e.handler))
            .collect()
    }

    /// Names of all registered handlers, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.handler.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
