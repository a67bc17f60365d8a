//! Failure policy table.
//!
//! Maps each fallible operation to what happens when it fails. Strategies
//! report failures through [`observe`], which logs at the level the policy
//! implies and returns it. A `FallbackTo` policy is resolved by
//! [`recover`](crate::strategies::recover).

use serde::Serialize;
use swcache_core::Error;

/// Fallible operations performed by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    OpenGeneration,
    PrecacheEntry,
    ShellRefresh,
    ShellStore,
    CacheFirstFetch,
    CacheFirstStore,
    NetworkFirstFetch,
    CacheLookup,
    ActivationCleanup,
}

/// Where a failed operation falls back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The cached app shell, or the offline page.
    CachedShell,
    /// The precached data file, or an empty offline response.
    DataFile,
    /// An exact-key cache match, or no response at all.
    CacheMatch,
    /// Proceed as if the cache had no entry.
    Miss,
}

/// What happens when an operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    SuppressAndLog,
    Propagate,
    FallbackTo(Fallback),
}

pub const fn policy_for(op: Operation) -> FailurePolicy {
    match op {
        Operation::PrecacheEntry | Operation::ShellStore | Operation::CacheFirstStore => FailurePolicy::SuppressAndLog,
        Operation::ShellRefresh => FailurePolicy::FallbackTo(Fallback::CachedShell),
        Operation::CacheFirstFetch => FailurePolicy::FallbackTo(Fallback::DataFile),
        Operation::NetworkFirstFetch => FailurePolicy::FallbackTo(Fallback::CacheMatch),
        Operation::CacheLookup => FailurePolicy::FallbackTo(Fallback::Miss),
        Operation::OpenGeneration | Operation::ActivationCleanup => FailurePolicy::Propagate,
    }
}

/// Log `err` for `op` according to its policy and return the policy.
pub fn observe(op: Operation, target: &str, err: &Error) -> FailurePolicy {
    let policy = policy_for(op);
    match policy {
        FailurePolicy::SuppressAndLog => {
            tracing::warn!(operation = ?op, target = %target, code = err.code(), error = %err, "suppressed failure");
        }
        FailurePolicy::FallbackTo(fallback) => {
            tracing::debug!(operation = ?op, target = %target, fallback = ?fallback, error = %err, "falling back");
        }
        FailurePolicy::Propagate => {
            tracing::error!(operation = ?op, target = %target, code = err.code(), error = %err, "operation failed");
        }
    }
    policy
}
