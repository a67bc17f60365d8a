//! Worker handler registry.
//!
//! Maps each [`EventKind`] to the handler that builds its [`EventAction`].
//! [`Worker::new`] registers the default install, activate and fetch
//! handlers; [`Worker::on`] replaces one.

use std::collections::HashMap;
use std::sync::Arc;

use crate::context::WorkerContext;
use crate::events::{Completion, Directive, Event, EventAction, EventKind};
use crate::lifecycle;
use crate::router;
use crate::strategies;

pub type Handler = Arc<dyn Fn(Event, Arc<WorkerContext>) -> EventAction + Send + Sync>;

#[derive(Clone)]
pub struct Worker {
    context: Arc<WorkerContext>,
    handlers: HashMap<EventKind, Handler>,
}

impl Worker {
    /// A worker with the default handlers registered.
    pub fn new(context: Arc<WorkerContext>) -> Self {
        Self::bare(context)
            .on(EventKind::Install, on_install)
            .on(EventKind::Activate, on_activate)
            .on(EventKind::Fetch, on_fetch)
    }

    /// A worker with no handlers; every event is declined.
    pub fn bare(context: Arc<WorkerContext>) -> Self {
        Self { context, handlers: HashMap::new() }
    }

    pub fn on<F>(mut self, kind: EventKind, handler: F) -> Self
    where
        F: Fn(Event, Arc<WorkerContext>) -> EventAction + Send + Sync + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn context(&self) -> &Arc<WorkerContext> {
        &self.context
    }

    /// Build the action for `event`. Unhandled events get an empty action.
    pub fn dispatch(&self, event: Event) -> EventAction {
        let kind = event.kind();
        match self.handlers.get(&kind) {
            Some(handler) => handler(event, self.context.clone()),
            None => {
                tracing::debug!(event = ?kind, "no handler registered");
                EventAction::new(kind)
            }
        }
    }
}

fn on_install(_event: Event, ctx: Arc<WorkerContext>) -> EventAction {
    EventAction::new(EventKind::Install)
        .request(Directive::SkipWaiting)
        .wait_until(async move { lifecycle::install(ctx).await.map(Completion::Installed) })
}

fn on_activate(_event: Event, ctx: Arc<WorkerContext>) -> EventAction {
    EventAction::new(EventKind::Activate)
        .wait_until(async move { lifecycle::activate(ctx).await.map(Completion::Activated) })
}

fn on_fetch(event: Event, ctx: Arc<WorkerContext>) -> EventAction {
    let action = EventAction::new(EventKind::Fetch);
    let Event::Fetch(request) = event else {
        return action;
    };

    let request = match ctx.resolve_request(request) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(code = err.code(), error = %err, "declining unroutable request");
            return action;
        }
    };

    let route = router::classify(&request, ctx.rules());
    tracing::debug!(route = ?route, url = %request.url, "routing fetch");

    let extender = action.extender();
    action
        .with_route(route)
        .respond_with(strategies::serve(route, ctx, request, extender))
}
