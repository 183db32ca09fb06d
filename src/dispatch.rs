//! Handler registration and event dispatch.
//!
//! The [`Registry`] owns the (filter-set, handler) pairs. Registrations are
//! append-only for the life of the session and matched in order. A
//! registration's filter set has OR semantics, and the handler is invoked
//! once per *matching filter* — a set that matches an event twice runs the
//! handler twice. That multiplicity is observable and deliberate; the
//! dispatcher does not de-duplicate.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::warn;

use crate::client::Session;
use crate::error::HandlerError;
use crate::event::Event;
use crate::filter::Filter;
use crate::state::ConnectionState;

/// Future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), HandlerError>> + Send>>;

/// A registered handler function.
pub type HandlerFn = Arc<dyn Fn(Arc<Event>, Context) -> HandlerFuture + Send + Sync>;

/// Capability handed to every handler invocation.
///
/// Carries the outgoing write path and access to the session identity, so
/// handlers can respond to the server and observe the current nickname.
#[derive(Clone)]
pub struct Context {
    pub(crate) session: Arc<Session>,
    pub(crate) out: mpsc::UnboundedSender<Event>,
}

impl Context {
    /// Queue an event for the server.
    ///
    /// Writes from concurrent handler tasks are serialized by the writer
    /// task that owns the transport; this never blocks.
    ///
    /// # Errors
    ///
    /// Fails once the session is torn down and the write path is closed.
    pub fn write(&self, event: Event) -> Result<(), HandlerError> {
        self.out.send(event).map_err(HandlerError::from)
    }

    /// The session's current nickname.
    pub fn nickname(&self) -> String {
        self.session.nickname()
    }

    /// Replace the session nickname.
    pub fn set_nickname(&self, nickname: impl Into<String>) {
        self.session.set_nickname(nickname.into());
    }

    /// The configured ident string.
    pub fn ident(&self) -> &str {
        self.session.ident()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        self.session.set_state(state);
    }

    pub(crate) fn collide_nickname(&self) -> String {
        self.session.collide_nickname()
    }
}

/// One (filter-set, handler) pair.
struct Registration {
    filters: Vec<Filter>,
    handler: HandlerFn,
}

/// Append-only table of handler registrations.
pub(crate) struct Registry {
    registrations: RwLock<Vec<Registration>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
        }
    }

    /// Append a registration. No de-duplication, no priority.
    pub(crate) fn register<F, Fut>(&self, filters: Vec<Filter>, handler: F)
    where
        F: Fn(Arc<Event>, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
    {
        let handler: HandlerFn = Arc::new(move |event, ctx| Box::pin(handler(event, ctx)));
        self.registrations
            .write()
            .push(Registration { filters, handler });
    }

    /// Run every matching handler for `event`.
    ///
    /// Each invocation runs as its own task with its failure isolated: an
    /// `Err` return or a panic is reported through `tracing` and dispatch
    /// continues with the remaining handlers.
    pub(crate) async fn dispatch(&self, event: Arc<Event>, ctx: Context) {
        // Collect matches under the lock, invoke outside it.
        let matched: Vec<HandlerFn> = {
            let registrations = self.registrations.read();
            let mut matched = Vec::new();
            for registration in registrations.iter() {
                for filter in &registration.filters {
                    if filter.matches(&event) {
                        matched.push(registration.handler.clone());
                    }
                }
            }
            matched
        };

        for handler in matched {
            let invocation = tokio::spawn(handler(event.clone(), ctx.clone()));
            match invocation.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(command = %event.command, error = %e, "handler failed");
                }
                Err(e) if e.is_panic() => {
                    warn!(command = %event.command, "handler panicked");
                }
                Err(_) => {}
            }
        }
    }
}
