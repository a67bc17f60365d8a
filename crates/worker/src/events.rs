//! Event model between the host and the worker.
//!
//! A handler never performs work itself. It returns an [`EventAction`]
//! describing the work: an optional response future (fetch events), an
//! optional completion future the host must wait for (lifecycle events),
//! directives for the host, and an [`Extender`] that spawns background tasks
//! the event is held open for.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::Serialize;
use swcache_core::{Error, Request, Response};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::lifecycle::{ActivateReport, InstallReport};
use crate::router::RouteClass;

/// Event names a handler can be registered against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
}

/// An event delivered by the host.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch(_) => EventKind::Fetch,
        }
    }
}

/// Requests the worker makes of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// Activate as soon as installed, without waiting for existing clients
    /// to close.
    SkipWaiting,
    /// Start controlling every open client without a reload.
    ClaimClients,
}

/// Result of a lifecycle event's `wait_until` work.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Completion {
    Installed(InstallReport),
    Activated(ActivateReport),
}

impl Completion {
    /// Directive to issue once this work has completed successfully.
    pub fn follow_up(&self) -> Option<Directive> {
        match self {
            Completion::Installed(_) => None,
            Completion::Activated(_) => Some(Directive::ClaimClients),
        }
    }
}

pub type ResponseFuture = BoxFuture<'static, Result<Response, Error>>;
pub type CompletionFuture = BoxFuture<'static, Result<Completion, Error>>;

/// Spawns background work that keeps its event open.
#[derive(Clone)]
pub struct Extender {
    tx: mpsc::UnboundedSender<JoinHandle<()>>,
}

impl Extender {
    /// Start `work` now; [`EventAction::settle`] will not return before it
    /// finishes.
    pub fn spawn<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(work);
        if self.tx.send(handle).is_err() {
            tracing::debug!("event already settled; background work detached");
        }
    }
}

/// What the host gets back from [`EventAction::settle`].
#[derive(Debug)]
pub struct Settled {
    pub completion: Option<Result<Completion, Error>>,
    pub directives: Vec<Directive>,
    /// Background tasks that panicked instead of finishing.
    pub background_panics: usize,
}

/// Work requested by a handler for one event.
pub struct EventAction {
    kind: EventKind,
    route: Option<RouteClass>,
    respond_with: Option<ResponseFuture>,
    wait_until: Option<CompletionFuture>,
    directives: Vec<Directive>,
    extender: Extender,
    pending: mpsc::UnboundedReceiver<JoinHandle<()>>,
}

impl EventAction {
    /// An action that does nothing; for fetch events this declines to
    /// intervene.
    pub fn new(kind: EventKind) -> Self {
        let (tx, pending) = mpsc::unbounded_channel();
        Self {
            kind,
            route: None,
            respond_with: None,
            wait_until: None,
            directives: Vec::new(),
            extender: Extender { tx },
            pending,
        }
    }

    pub fn respond_with<F>(mut self, response: F) -> Self
    where
        F: Future<Output = Result<Response, Error>> + Send + 'static,
    {
        self.respond_with = Some(response.boxed());
        self
    }

    pub fn wait_until<F>(mut self, work: F) -> Self
    where
        F: Future<Output = Result<Completion, Error>> + Send + 'static,
    {
        self.wait_until = Some(work.boxed());
        self
    }

    pub fn request(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn with_route(mut self, route: RouteClass) -> Self {
        self.route = Some(route);
        self
    }

    pub fn extender(&self) -> Extender {
        self.extender.clone()
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn route(&self) -> Option<RouteClass> {
        self.route
    }

    /// Directives requested up front (before any work completes).
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Whether the handler supplied a response.
    pub fn intercepts(&self) -> bool {
        self.respond_with.is_some()
    }

    /// Drive the response future. Returns `None` if the handler declined or
    /// the response was already taken.
    pub async fn respond(&mut self) -> Option<Result<Response, Error>> {
        let response = self.respond_with.take()?;
        Some(response.await)
    }

    /// Wait for the completion future and every background task.
    ///
    /// An untaken response future is dropped without being polled.
    pub async fn settle(self) -> Settled {
        let EventAction { respond_with, wait_until, mut directives, extender, mut pending, .. } = self;
        drop(respond_with);

        let completion = match wait_until {
            Some(work) => Some(work.await),
            None => None,
        };
        if let Some(Ok(done)) = &completion
            && let Some(follow_up) = done.follow_up()
        {
            directives.push(follow_up);
        }

        drop(extender);
        let mut background_panics = 0;
        while let Some(handle) = pending.recv().await {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "background task did not complete");
                background_panics += 1;
            }
        }

        Settled { completion, directives, background_panics }
    }
}
