//! Test doubles shared by the worker's unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use swcache_core::{AppConfig, CacheStorage, Error, Fetcher, MemoryCacheStorage, Request, Response, ResponseSource};
use tokio::sync::Notify;

use crate::context::WorkerContext;

pub const ORIGIN: &str = "http://localhost:8080";

pub fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

#[derive(Clone)]
enum Route {
    Respond { status: u16, body: &'static str, content_type: &'static str },
    Fail,
}

/// Scripted network: URLs without a route fail like an unreachable host.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Notify>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch blocks until `gate` is notified once for it.
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self { gate: Some(gate), ..Self::default() }
    }

    pub fn respond(&self, path: &str, status: u16, body: &'static str) -> &Self {
        let content_type = if path.ends_with(".json") { "application/json" } else { "text/html" };
        self.routes
            .lock()
            .unwrap()
            .insert(url(path), Route::Respond { status, body, content_type });
        self
    }

    pub fn fail(&self, path: &str) -> &Self {
        self.routes.lock().unwrap().insert(url(path), Route::Fail);
        self
    }

    /// Serve the default precache set with 200s.
    pub fn with_site(self) -> Self {
        self.respond("/", 200, "<html>root</html>")
            .respond("/index.html", 200, "<html>shell</html>")
            .respond("/manifest.webmanifest", 200, "{}")
            .respond("/phrases.json", 200, "[\"hello\"]")
            .respond("/sw.js", 200, "self.addEventListener()");
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, path: &str) -> usize {
        let target = url(path);
        self.calls.lock().unwrap().iter().filter(|c| **c == target).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.url.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let route = self.routes.lock().unwrap().get(&request.url).cloned();
        match route {
            Some(Route::Respond { status, body, content_type }) => {
                Ok(Response::new(status, request.url.clone(), body, ResponseSource::Network)
                    .with_header("content-type", content_type))
            }
            Some(Route::Fail) | None => Err(Error::Network(format!("{}: connection refused", request.url))),
        }
    }
}

/// Storage whose every operation fails.
pub struct BrokenStorage;

#[async_trait]
impl CacheStorage for BrokenStorage {
    async fn open(&self, _generation: &str) -> Result<(), Error> {
        Err(Error::Storage("disk unavailable".into()))
    }

    async fn put(&self, _generation: &str, _request: &Request, _response: Response) -> Result<(), Error> {
        Err(Error::Storage("disk unavailable".into()))
    }

    async fn lookup(&self, _generation: &str, _request: &Request) -> Result<Option<Response>, Error> {
        Err(Error::Storage("disk unavailable".into()))
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        Err(Error::Storage("disk unavailable".into()))
    }

    async fn delete(&self, _generation: &str) -> Result<bool, Error> {
        Err(Error::Storage("disk unavailable".into()))
    }
}

/// A context over broken storage.
pub fn broken_context(network: &Arc<StubFetcher>) -> Arc<WorkerContext> {
    let fetcher: Arc<dyn Fetcher> = network.clone();
    Arc::new(WorkerContext::new(&AppConfig::default(), Arc::new(BrokenStorage), fetcher).unwrap())
}

/// A context over `config` with fresh handles to the given doubles.
pub fn context_with(config: &AppConfig, cache: &MemoryCacheStorage, network: &Arc<StubFetcher>) -> Arc<WorkerContext> {
    let fetcher: Arc<dyn Fetcher> = network.clone();
    Arc::new(WorkerContext::new(config, Arc::new(cache.clone()), fetcher).unwrap())
}

/// A context over the default configuration.
pub fn context(cache: &MemoryCacheStorage, network: &Arc<StubFetcher>) -> Arc<WorkerContext> {
    context_with(&AppConfig::default(), cache, network)
}
