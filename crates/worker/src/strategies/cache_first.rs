//! Cache-first strategy for static assets and the data file.

use std::sync::Arc;

use swcache_core::{Error, Request, Response};

use crate::context::WorkerContext;
use crate::events::Extender;
use crate::policy::{self, FailurePolicy, Operation};
use crate::strategies::recover;

pub async fn cache_first(ctx: Arc<WorkerContext>, request: Request, extender: Extender) -> Result<Response, Error> {
    if let Some(hit) = ctx.lookup(&request).await {
        return Ok(hit);
    }

    let fresh = match ctx.network().fetch(&request).await {
        Ok(response) => response,
        Err(err) => {
            return match policy::observe(Operation::CacheFirstFetch, &request.url, &err) {
                FailurePolicy::FallbackTo(fallback) => recover(&ctx, fallback, &request).await,
                _ => Err(err),
            };
        }
    };

    if fresh.status != 200 {
        tracing::debug!("not caching {} ({})", request.url, fresh.status);
        return Ok(fresh);
    }

    let copy = fresh.duplicate();
    let store_ctx = ctx.clone();
    extender.spawn(async move {
        store_ctx.store(Operation::CacheFirstStore, &request, copy).await;
    });

    Ok(fresh)
}
