//! Versioned cache generations keyed by request identity.
//!
//! A generation is a named container of URL → response entries. Two stores
//! implement [`CacheStorage`]:
//!
//! - [`MemoryCacheStorage`] keeps generations in process memory
//! - [`CacheDb`] persists them in SQLite through tokio-rusqlite, with WAL
//!   mode and versioned migrations
//!
//! Only GET requests are cacheable. `put` of any other method fails with
//! `UNSUPPORTED_METHOD`; `lookup` of any other method is a miss.

pub mod connection;
pub mod generations;
pub mod hash;
pub mod memory;
pub mod migrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{Method, Request, Response};

pub use connection::CacheDb;
pub use memory::MemoryCacheStorage;

/// Host cache primitive.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if absent.
    async fn open(&self, generation: &str) -> Result<(), Error>;

    /// Store `response` under the identity of `request`, replacing any
    /// previous entry. Creates the generation if absent.
    async fn put(&self, generation: &str, request: &Request, response: Response) -> Result<(), Error>;

    /// Exact-key lookup within one generation.
    async fn lookup(&self, generation: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Generation names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a generation and all its entries. Returns whether it existed.
    async fn delete(&self, generation: &str) -> Result<bool, Error>;
}

/// Cache key for a request that is about to be stored.
pub(crate) fn storable_key(request: &Request) -> Result<String, Error> {
    if request.method != Method::Get {
        return Err(Error::UnsupportedMethod(format!("{} {}", request.method.as_str(), request.url)));
    }
    Ok(hash::compute_cache_key(&request.url))
}

/// Cache key for a lookup; `None` means the request can never match.
pub(crate) fn lookup_key(request: &Request) -> Option<String> {
    (request.method == Method::Get).then(|| hash::compute_cache_key(&request.url))
}
