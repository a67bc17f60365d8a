//! swcache host entry point.
//!
//! Boots the worker against the SQLite cache store and the reqwest network
//! client, then serves lifecycle and fetch commands on stdio.
//! Logging goes to stderr so stdout carries only protocol replies.

use std::sync::Arc;

use anyhow::Result;
use swcache_client::{FetchConfig, HttpFetcher};
use swcache_core::{AppConfig, CacheDb};
use swcache_worker::{Worker, WorkerContext, WorkerHost};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache_version, origin = %config.origin, "starting swcache host");

    let cache = CacheDb::open(&config.db_path).await?;
    let network = HttpFetcher::new(FetchConfig::from(&config))?;
    let context = WorkerContext::new(&config, Arc::new(cache), Arc::new(network))?;

    let mut host = WorkerHost::new(Worker::new(Arc::new(context)));
    host.run(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    Ok(())
}
