//! Network-first strategy, the default route.

use std::sync::Arc;

use swcache_core::{Error, Request, Response};

use crate::context::WorkerContext;
use crate::policy::{self, FailurePolicy, Operation};
use crate::strategies::recover;

/// Network response of any status, uncached. On network failure, the exact
/// cache match or `NoResponse`.
pub async fn network_first(ctx: Arc<WorkerContext>, request: Request) -> Result<Response, Error> {
    match ctx.network().fetch(&request).await {
        Ok(response) => Ok(response),
        Err(err) => match policy::observe(Operation::NetworkFirstFetch, &request.url, &err) {
            FailurePolicy::FallbackTo(fallback) => recover(&ctx, fallback, &request).await,
            _ => Err(err),
        },
    }
}
