//! Read-only state shared by every handler.
//!
//! Built once from [`AppConfig`]: every configured identifier is resolved to
//! an absolute URL up front so cache keys agree between install-time
//! population and runtime lookups.

use std::sync::Arc;

use swcache_client::{canonicalize, parse_origin};
use swcache_core::{AppConfig, CacheStorage, Error, Fetcher, Request, Response};
use url::Url;

use crate::policy::{self, Operation};
use crate::router::RouteRules;

pub struct WorkerContext {
    version: String,
    origin: Url,
    shell: Request,
    data_file: Request,
    precache: Vec<String>,
    rules: RouteRules,
    offline_fallback: bool,
    cache: Arc<dyn CacheStorage>,
    network: Arc<dyn Fetcher>,
}

impl WorkerContext {
    pub fn new(config: &AppConfig, cache: Arc<dyn CacheStorage>, network: Arc<dyn Fetcher>) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve = |identifier: &str| -> Result<String, Error> {
            canonicalize(&origin, identifier)
                .map(String::from)
                .map_err(|e| Error::InvalidUrl(format!("{identifier}: {e}")))
        };

        let shell = Request::get(resolve(&config.shell_path)?);
        let data_file = Request::get(resolve(&config.data_file_path)?);
        let precache = config
            .precache
            .iter()
            .map(|entry| resolve(entry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: config.cache_version.clone(),
            rules: RouteRules {
                data_file_suffix: config.data_file_path.clone(),
                static_segment: config.static_segment.clone(),
            },
            origin,
            shell,
            data_file,
            precache,
            offline_fallback: config.offline_fallback,
            cache,
            network,
        })
    }

    /// Name of the current cache generation.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// GET request for the app shell identifier.
    pub fn shell(&self) -> &Request {
        &self.shell
    }

    /// GET request for the offline data file identifier.
    pub fn data_file(&self) -> &Request {
        &self.data_file
    }

    /// Absolute precache URLs in configured order.
    pub fn precache(&self) -> &[String] {
        &self.precache
    }

    pub fn rules(&self) -> &RouteRules {
        &self.rules
    }

    pub fn offline_fallback(&self) -> bool {
        self.offline_fallback
    }

    pub fn cache(&self) -> &dyn CacheStorage {
        self.cache.as_ref()
    }

    pub fn network(&self) -> &dyn Fetcher {
        self.network.as_ref()
    }

    /// Resolve a request's URL against the origin and lower-case its header
    /// names.
    pub fn resolve_request(&self, mut request: Request) -> Result<Request, Error> {
        request.url = canonicalize(&self.origin, &request.url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?
            .into();
        request.normalize_headers();
        Ok(request)
    }

    /// Look `request` up in the current generation. Store errors count as a
    /// miss.
    pub async fn lookup(&self, request: &Request) -> Option<Response> {
        match self.cache.lookup(&self.version, request).await {
            Ok(Some(hit)) => {
                tracing::debug!("cache hit for {}", request.url);
                Some(hit)
            }
            Ok(None) => {
                tracing::debug!("cache miss for {}", request.url);
                None
            }
            Err(err) => {
                policy::observe(Operation::CacheLookup, &request.url, &err);
                None
            }
        }
    }

    /// Store `response` under `request` in the current generation. Failures
    /// are reported under `op` and swallowed.
    pub async fn store(&self, op: Operation, request: &Request, response: Response) -> bool {
        match self.cache.put(&self.version, request, response).await {
            Ok(()) => true,
            Err(err) => {
                policy::observe(op, &request.url, &err);
                false
            }
        }
    }
}
