//! Request and response model shared by the cache stores, the network
//! primitive and the worker.
//!
//! Headers are kept as lower-cased names in a sorted map so lookups are
//! case-insensitive and stored entries serialize deterministically.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// HTTP request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
        }
    }
}

/// Request mode as reported by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

/// What the requested resource will be used as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    #[default]
    #[serde(rename = "")]
    Empty,
    Document,
    Script,
    Style,
    Image,
    Font,
    Manifest,
    Worker,
    Audio,
    Video,
}

/// An intercepted resource fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub url: String,
    #[serde(default)]
    pub method: Method,
    #[serde(default)]
    pub mode: RequestMode,
    #[serde(default)]
    pub destination: Destination,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Request {
    /// A plain GET request for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            mode: RequestMode::default(),
            destination: Destination::default(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Whether the `accept` header admits an HTML response.
    pub fn accepts_html(&self) -> bool {
        self.header("accept").is_some_and(|accept| accept.contains("text/html"))
    }

    /// Lower-case every header name (requests deserialized from the host
    /// may carry mixed-case names).
    pub fn normalize_headers(&mut self) {
        let headers = std::mem::take(&mut self.headers);
        self.headers = headers.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Network,
    Cache,
    /// Built locally when neither cache nor network could answer.
    Synthesized,
}

/// A response payload with its status.
///
/// The body is read-once and `Response` is not `Clone`. A response
/// that must be both returned and stored is split with [`Response::duplicate`]
/// before either side consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub source: ResponseSource,
    body: Bytes,
}

impl Response {
    pub fn new(status: u16, url: impl Into<String>, body: impl Into<Bytes>, source: ResponseSource) -> Self {
        Self { status, url: url.into(), headers: BTreeMap::new(), source, body: body.into() }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Produce an independent copy for a second consumer.
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            url: self.url.clone(),
            headers: self.headers.clone(),
            source: self.source,
            body: self.body.clone(),
        }
    }

    /// Re-tag the response, e.g. when a network response is read back out of
    /// a cache store.
    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consume the response and take its body.
    pub fn into_body(self) -> Bytes {
        self.body
    }
}
