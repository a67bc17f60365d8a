//! App-shell strategy for navigations.
//!
//! The cached shell answers immediately; a network refresh always runs
//! alongside it and overwrites the stored shell when it lands. The refresh
//! only answers the request when no shell is cached.

use std::sync::Arc;

use swcache_core::{Error, Request, Response};
use tokio::sync::oneshot;

use crate::context::WorkerContext;
use crate::events::Extender;
use crate::policy::{self, FailurePolicy, Operation};
use crate::strategies::recover;

pub async fn app_shell(ctx: Arc<WorkerContext>, request: Request, extender: Extender) -> Result<Response, Error> {
    let (fallback_tx, fallback_rx) = oneshot::channel();
    extender.spawn(refresh(ctx.clone(), request.clone(), fallback_tx));

    if let Some(shell) = ctx.lookup(ctx.shell()).await {
        return Ok(shell);
    }

    match fallback_rx.await {
        Ok(fresh) => Ok(fresh),
        Err(_) => match policy::policy_for(Operation::ShellRefresh) {
            FailurePolicy::FallbackTo(fallback) => recover(&ctx, fallback, &request).await,
            _ => Err(Error::NoResponse(request.url)),
        },
    }
}

/// Fetch `request`, hand one copy to `fallback` and store the other under the
/// shell identifier. A dropped `fallback` means the network was unavailable.
async fn refresh(ctx: Arc<WorkerContext>, request: Request, fallback: oneshot::Sender<Response>) {
    let fresh = match ctx.network().fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            policy::observe(Operation::ShellRefresh, &request.url, &err);
            return;
        }
    };

    let copy = fresh.duplicate();
    if fallback.send(fresh).is_err() {
        tracing::debug!("shell already served from cache for {}", request.url);
    }

    if ctx.store(Operation::ShellStore, ctx.shell(), copy).await {
        tracing::debug!("shell refreshed from {}", request.url);
    }
}
