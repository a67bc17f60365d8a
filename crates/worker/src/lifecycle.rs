//! Cache generation lifecycle: install-time population and activate-time
//! pruning.

use std::sync::Arc;

use futures_util::future::{join_all, try_join_all};
use serde::Serialize;
use swcache_core::{Error, Request};

use crate::context::WorkerContext;
use crate::policy::{self, Operation};

/// A precache entry that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheFailure {
    pub url: String,
    pub code: &'static str,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InstallReport {
    pub generation: String,
    pub cached: Vec<String>,
    pub failed: Vec<PrecacheFailure>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActivateReport {
    pub current: String,
    pub deleted: Vec<String>,
}

/// Open the current generation and populate it with every precache entry.
///
/// Entries are fetched concurrently. A failed entry (network error, non-2xx
/// status, store error) is logged and listed in the report; it never fails
/// the install. Only failing to open the generation does.
pub async fn install(ctx: Arc<WorkerContext>) -> Result<InstallReport, Error> {
    let version = ctx.version().to_string();
    if let Err(err) = ctx.cache().open(&version).await {
        policy::observe(Operation::OpenGeneration, &version, &err);
        return Err(err);
    }

    let results = join_all(ctx.precache().iter().map(|url| precache_one(&ctx, url))).await;

    let mut report = InstallReport { generation: version, ..Default::default() };
    for (url, result) in ctx.precache().iter().zip(results) {
        match result {
            Ok(()) => report.cached.push(url.clone()),
            Err(err) => {
                policy::observe(Operation::PrecacheEntry, url, &err);
                report.failed.push(PrecacheFailure { url: url.clone(), code: err.code(), error: err.to_string() });
            }
        }
    }

    tracing::info!(
        generation = %report.generation,
        cached = report.cached.len(),
        failed = report.failed.len(),
        "precache complete"
    );

    Ok(report)
}

async fn precache_one(ctx: &WorkerContext, url: &str) -> Result<(), Error> {
    let request = Request::get(url);
    let response = ctx.network().fetch(&request).await?;
    if !response.is_ok() {
        return Err(Error::BadStatus { url: url.to_string(), status: response.status });
    }
    ctx.cache().put(ctx.version(), &request, response).await
}

/// Delete every generation whose name differs from the current version.
pub async fn activate(ctx: Arc<WorkerContext>) -> Result<ActivateReport, Error> {
    let current = ctx.version().to_string();
    let result = prune(&ctx, &current).await;
    match result {
        Ok(deleted) => {
            tracing::info!(current = %current, deleted = ?deleted, "stale cache generations removed");
            Ok(ActivateReport { current, deleted })
        }
        Err(err) => {
            policy::observe(Operation::ActivationCleanup, &current, &err);
            Err(err)
        }
    }
}

async fn prune(ctx: &WorkerContext, current: &str) -> Result<Vec<String>, Error> {
    let stale: Vec<String> = ctx
        .cache()
        .keys()
        .await?
        .into_iter()
        .filter(|name| name != current)
        .collect();

    try_join_all(stale.iter().map(|name| ctx.cache().delete(name))).await?;

    Ok(stale)
}
