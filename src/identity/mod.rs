//! Identity module - Stable identity tokens for composite nodes.
//!
//! A token is allocated once per node from an [`IdentitySource`] and never
//! reassigned. The same token on a snapshot node and a live node is what
//! correlates the two revisions.

use crate::plugin::Registry;
use crate::value::{Composite, Visited};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity is an opaque token carried by one logical object or array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    /// Creates an identity from a raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Identity(raw)
    }

    #[inline]
    pub const fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// IdentitySource hands out identities that are never reused.
pub trait IdentitySource {
    fn next_identity(&self) -> Identity;
}

/// Counter is a monotonically increasing identity source.
#[derive(Debug)]
pub struct Counter {
    next: AtomicU64,
}

impl Counter {
    pub const fn new() -> Self {
        Counter::starting_at(1)
    }

    /// Creates a counter whose first identity is `first`.
    pub const fn starting_at(first: u64) -> Self {
        Counter {
            next: AtomicU64::new(first),
        }
    }

    /// The identity the next call will hand out.
    pub fn peek(&self) -> Identity {
        Identity(self.next.load(Ordering::Relaxed))
    }
}

impl Default for Counter {
    fn default() -> Self {
        Counter::new()
    }
}

impl IdentitySource for Counter {
    fn next_identity(&self) -> Identity {
        Identity(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

static GLOBAL: Counter = Counter::new();

/// The process-wide counter. It is only reset by restarting the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalCounter;

impl IdentitySource for GlobalCounter {
    fn next_identity(&self) -> Identity {
        GLOBAL.next_identity()
    }
}

/// Stamps every reachable composite that has no identity yet.
///
/// Functions and nodes matched by a value-like plugin are neither stamped
/// nor entered. Already stamped nodes keep their identity, so running this
/// twice is a no-op the second time. Returns the number of nodes stamped.
pub fn assign_identities(
    root: &Composite,
    source: &dyn IdentitySource,
    plugins: &Registry,
) -> usize {
    let mut visited = Visited::new();
    let mut stack = vec![root.clone()];
    let mut stamped = 0;

    while let Some(node) = stack.pop() {
        if !visited.insert(&node) {
            continue;
        }
        if node.identity().is_none() && node.stamp(source.next_identity()) {
            stamped += 1;
        }
        for (_, child) in node.children().into_iter().rev() {
            if child.is_function() || plugins.is_value_like(&child) {
                continue;
            }
            if let Some(c) = child.as_composite() {
                if !visited.contains(&c) {
                    stack.push(c);
                }
            }
        }
    }

    tracing::trace!(stamped, "assigned identities");
    stamped
}
