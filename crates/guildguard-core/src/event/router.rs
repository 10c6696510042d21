//! Single-dispatch event router.
//!
//! Exactly one router instance owns the external subscription for each
//! event type and fans every event out to an ordered list of internal
//! handlers. Handlers register under a unique name; a second registration
//! under the same name is rejected, so the same detector can never run
//! twice for one real-world occurrence. A handler error is logged and does
//! not stop dispatch to later handlers, and a malformed or unexpected event
//! can therefore never take down the detection path for a guild.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::GuildEvent;

/// An internal consumer of inbound events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Unique handler name; duplicate registrations are rejected.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &GuildEvent) -> Result<()>;
}

/// Ordered fan-out of one event stream to the registered handlers.
#[derive(Default)]
pub struct EventRouter {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler at the end of the dispatch order.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) -> Result<()> {
        if self.handlers.iter().any(|h| h.name() == handler.name()) {
            bail!("handler '{}' is already registered", handler.name());
        }
        debug!(handler = handler.name(), "registered event handler");
        self.handlers.push(handler);
        Ok(())
    }

    /// Dispatch one event to every handler in registration order.
    ///
    /// Handler failures are contained here: each is logged and the
    /// remaining handlers still run.
    pub async fn dispatch(&self, event: &GuildEvent) {
        for handler in &self.handlers {
            if let Err(e) = handler.handle(event).await {
                warn!(
                    handler = handler.name(),
                    guild = %event.guild_id,
                    event = event.kind.name(),
                    error = %e,
                    "event handler failed; continuing dispatch"
                );
            }
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}
