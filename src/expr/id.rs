//! Expression identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of one output column within a query's plan tree.
///
/// Minted once when the column is first produced (by a scan or a computed
/// projection) and never reused within a compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(u64);

impl ExprId {
    /// Wrap a raw id. Only allocators and tests should need this.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic ExprId generator scoped to one compilation session.
///
/// Shared by reference; `next` is a single atomic increment so concurrent
/// exploration branches can mint ids without further coordination.
#[derive(Debug, Default)]
pub struct ExprIdAllocator {
    next: AtomicU64,
}

impl ExprIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating at `first`. Useful when ids below it were assigned
    /// during binding.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Mint a fresh id.
    pub fn next(&self) -> ExprId {
        ExprId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// The id the next call to [`next`](Self::next) will return.
    pub fn peek(&self) -> ExprId {
        ExprId(self.next.load(Ordering::Relaxed))
    }
}
