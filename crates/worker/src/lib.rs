//! Offline caching worker for swcache.
//!
//! This crate provides:
//! - Cache generation lifecycle (install-time precache, activate-time pruning)
//! - Request routing and the app-shell, cache-first and network-first strategies
//! - The event registry a host dispatches install, activate and fetch events to
//! - A stdio host that drives a worker through its lifecycle

pub mod context;
pub mod error;
pub mod events;
pub mod handler;
pub mod host;
pub mod lifecycle;
pub mod policy;
pub mod router;
pub mod strategies;

#[cfg(test)]
mod testing;

pub use context::WorkerContext;
pub use error::HostError;
pub use events::{Completion, Directive, Event, EventAction, EventKind, Extender, Settled};
pub use handler::Worker;
pub use host::{HostCommand, HostReply, WorkerHost, WorkerState};
pub use router::{RouteClass, RouteRules, classify};
