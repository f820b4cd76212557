//! Discovery queue and handler fan-out.
//!
//! A bounded FIFO channel decouples "found a post" from "expensively parse
//! and fan out", so a slow handler can never stall the polling loop. The
//! discovery loop is the sole producer, the dispatch loop the sole
//! consumer; since discovery commits and enqueues monotonically, posts reach
//! handlers in increasing id order.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::DispatchConfig;
use crate::error::Result;
use crate::handler::HandlerRegistry;
use crate::parse::PostParser;

/// A discovered post in transit between the two loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPost {
    pub id: i64,
    pub payload: String,
}

/// Build the bounded discovery queue.
pub fn discovery_queue(capacity: usize) -> (mpsc::Sender<DiscoveredPost>, mpsc::Receiver<DiscoveredPost>) {
    mpsc::channel(capacity)
}

/// Consumer side of the pipeline: parse each envelope and call every enabled
/// handler in registration order.
pub struct DispatchLoop {
    rx: mpsc::Receiver<DiscoveredPost>,
    parser: Arc<dyn PostParser>,
    registry: Arc<HandlerRegistry>,
    pop_timeout: Duration,
    stop: watch::Receiver<bool>,
}

impl DispatchLoop {
    pub fn new(
        rx: mpsc::Receiver<DiscoveredPost>,
        parser: Arc<dyn PostParser>,
        registry: Arc<HandlerRegistry>,
        config: &DispatchConfig,
        stop: watch::Receiver<bool>,
    ) -> Self {
        Self {
            rx,
            parser,
            registry,
            pop_timeout: Duration::from_millis(config.pop_timeout_ms),
            stop,
        }
    }

    /// Run until the stop signal fires or the producer side closes.
    ///
    /// The pop is bounded by `pop_timeout` so the stop signal is observed
    /// even when the queue stays empty.
    pub async fn run(mut self) -> Result<()> {
        loop {
            if *self.stop.borrow() {
                log::info!("Dispatch loop stopping");
                return Ok(());
            }

            match tokio::time::timeout(self.pop_timeout, self.rx.recv()).await {
                Err(_) => continue,
                Ok(None) => {
                    log::info!("Discovery queue closed, dispatch loop exiting");
                    return Ok(());
                }
                Ok(Some(envelope)) => self.dispatch(envelope).await,
            }
        }
    }

    /// Parse one envelope and fan it out. Parse failures drop the post;
    /// handler failures are logged and isolated from later handlers and
    /// later posts.
    async fn dispatch(&self, envelope: DiscoveredPost) {
        let post = match self.parser.parse(&envelope.payload) {
            Ok(post) => post,
            Err(e) => {
                log::warn!("Dropping post {}: {}", envelope.id, e);
                return;
            }
        };

        for handler in self.registry.enabled_handlers() {
            log::debug!("Dispatching post {} to handler '{}'", post.id, handler.name());
            if let Err(e) = handler.process(&post).await {
                log::error!("Handler '{}' failed on post {}: {}", handler.name(), post.id, e);
            }
        }
    }
}
