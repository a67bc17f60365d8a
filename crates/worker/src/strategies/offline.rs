//! Responses synthesized when neither cache nor network can answer.

use swcache_core::{Error, Response, ResponseSource};

use crate::context::WorkerContext;

/// Marks every synthesized response.
pub const OFFLINE_HEADER: &str = "x-swcache-offline";

const OFFLINE_PAGE: &str = "<!doctype html>\n<html><head><meta charset=\"utf-8\"><title>Offline</title></head>\
<body><h1>You are offline</h1><p>This page is not available offline yet. Reconnect and reload.</p></body></html>\n";

/// Navigation with no cached shell and no network.
pub fn shell_unavailable(ctx: &WorkerContext, url: &str) -> Result<Response, Error> {
    if !ctx.offline_fallback() {
        return Err(Error::NoResponse(url.to_string()));
    }
    tracing::debug!("serving offline page for {}", url);
    Ok(Response::new(503, url, OFFLINE_PAGE, ResponseSource::Synthesized)
        .with_header("content-type", "text/html; charset=utf-8")
        .with_header(OFFLINE_HEADER, "1"))
}

/// Static asset with no cached copy, no data file and no network.
pub fn asset_unavailable(ctx: &WorkerContext, url: &str) -> Result<Response, Error> {
    if !ctx.offline_fallback() {
        return Err(Error::NoResponse(url.to_string()));
    }
    tracing::debug!("serving empty offline response for {}", url);
    Ok(Response::new(503, url, "", ResponseSource::Synthesized).with_header(OFFLINE_HEADER, "1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StubFetcher, context, context_with};
    use std::sync::Arc;
    use swcache_core::{AppConfig, MemoryCacheStorage};

    #[test]
    fn test_offline_page() {
        let ctx = context(&MemoryCacheStorage::new(), &Arc::new(StubFetcher::new()));
        let resp = shell_unavailable(&ctx, "http://localhost:8080/").unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.source, ResponseSource::Synthesized);
        assert!(resp.content_type().unwrap().starts_with("text/html"));
        assert!(resp.body_len() > 0);
    }

    #[test]
    fn test_empty_asset_response() {
        let ctx = context(&MemoryCacheStorage::new(), &Arc::new(StubFetcher::new()));
        let resp = asset_unavailable(&ctx, "http://localhost:8080/static/a.js").unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.headers.get(OFFLINE_HEADER).map(String::as_str), Some("1"));
        assert_eq!(resp.body_len(), 0);
    }

    #[test]
    fn test_disabled_fallback_is_no_response() {
        let config = AppConfig { offline_fallback: false, ..Default::default() };
        let ctx = context_with(&config, &MemoryCacheStorage::new(), &Arc::new(StubFetcher::new()));
        assert!(matches!(shell_unavailable(&ctx, "/"), Err(Error::NoResponse(_))));
        assert!(matches!(asset_unavailable(&ctx, "/a.js"), Err(Error::NoResponse(_))));
    }
}
