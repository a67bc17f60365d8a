//! Client code for swcache.
//!
//! This crate provides the host network primitive over reqwest and the
//! resource identifier canonicalization shared by the worker.

pub mod fetch;

pub use fetch::{FetchConfig, HttpFetcher, UrlError, canonicalize, parse_origin};
