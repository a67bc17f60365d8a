//! Request classification.
//!
//! Pure function of the request's attributes; first match wins:
//!
//! 1. navigation, or a GET whose `accept` admits HTML → app shell
//! 2. the data file, anything under the static segment, or a script → cache-first
//! 3. everything else → network-first

use serde::Serialize;
use swcache_core::{Destination, Method, Request, RequestMode};

/// Serving strategy selected for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    AppShell,
    StaticAsset,
    NetworkFirst,
}

/// URL patterns that mark static assets.
#[derive(Debug, Clone)]
pub struct RouteRules {
    /// Requests whose URL ends with this path are the data file.
    pub data_file_suffix: String,
    /// Requests whose URL contains this segment are static assets.
    pub static_segment: String,
}

pub fn classify(request: &Request, rules: &RouteRules) -> RouteClass {
    if request.mode == RequestMode::Navigate || (request.method == Method::Get && request.accepts_html()) {
        return RouteClass::AppShell;
    }

    if request.url.ends_with(&rules.data_file_suffix)
        || request.url.contains(&rules.static_segment)
        || request.destination == Destination::Script
    {
        return RouteClass::StaticAsset;
    }

    RouteClass::NetworkFirst
}
