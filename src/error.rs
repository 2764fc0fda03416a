//! Error types.

use std::collections::TryReserveError;

/// Errors returned by fallible trie operations.
///
/// A failed operation never leaves the trie partially modified.
#[derive(thiserror::Error, Debug)]
pub enum TrieError {
    /// No node exists for the requested prefix.
    #[error("no node for the requested prefix")]
    NoSuchNode,
    /// The requested key is not a stored key (it may still be a prefix node).
    #[error("key is not stored in the trie")]
    NoSuchKey,
    /// A maximum Hamming distance below 1 was requested.
    #[error("maximum distance must be at least 1")]
    InvalidDistance,
    /// A pair search key length below 1 was requested.
    #[error("key length must be at least 1")]
    InvalidKeyLength,
    /// The node arena cannot address any more nodes.
    #[error("node capacity exceeded")]
    CapacityExceeded,
    /// Memory for nodes, key bytes or a traversal stack could not be reserved.
    #[error("allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}

/// Reasons a cursor stopped producing results before its sequence was exhausted.
///
/// Errors latch: once a cursor reports one, every later poll returns `None`.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterError {
    /// A node was added or removed after the cursor was created.
    #[error("trie changed structurally since the cursor was created")]
    OutOfSync,
    /// A newer dirty cursor took over the trie's exclusive lease.
    #[error("cursor was replaced by a newer dirty cursor")]
    Replaced,
    /// The cursor was polled against a trie other than the one that created it.
    #[error("cursor polled against a different trie")]
    ForeignTrie,
    /// The position stack could not grow.
    #[error("position stack allocation failed")]
    AllocationFailed,
}
