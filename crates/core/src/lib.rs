//! Core types and shared functionality for swcache.
//!
//! This crate provides:
//! - Request/response model with a read-once body contract
//! - Versioned cache generations (in-memory and SQLite stores)
//! - The network primitive trait
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod net;

pub use cache::{CacheDb, CacheStorage, MemoryCacheStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Method, Request, RequestMode, Response, ResponseSource};
pub use net::Fetcher;
