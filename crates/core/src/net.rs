//! Network primitive abstraction.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Host network primitive.
///
/// Implementations return `Err` only for transport-level failures
/// (connectivity, DNS, TLS, timeout, oversize body). Any HTTP status,
/// including 4xx and 5xx, is a successful fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
