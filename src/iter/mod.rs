//! Resumable depth-first traversal engine.
//!
//! A [`Cursor`] owns an explicit position stack and a [`Traversal`] policy
//! that decides what to expand and what to report. Cursors do not borrow the
//! trie: every poll takes the trie as an argument, which lets the cursor
//! detect structural changes made between polls instead of reading through
//! stale node ids.
//!
//! ```rust
//! use vtrie::{IterError, Trie};
//!
//! let mut trie = Trie::new();
//! trie.insert(b"abc", 1);
//! trie.insert(b"abd", 2);
//!
//! let mut cursor = trie.suffixes(b"ab")?;
//! assert!(cursor.next(&trie).is_some());
//!
//! trie.insert(b"abe", 3);
//! assert!(cursor.next(&trie).is_none());
//! assert_eq!(cursor.error(), Some(IterError::OutOfSync));
//! # Ok::<(), vtrie::TrieError>(())
//! ```

mod neighbors;
mod pairs;
mod suffixes;

use std::collections::TryReserveError;
use std::fmt;

pub use neighbors::Neighbors;
pub use pairs::Pairs;
pub use suffixes::Suffixes;

use crate::error::{IterError, TrieError};
use crate::node::{try_push, Item, NodeId};
use crate::trie::{Lease, Trie};
use crate::tracing_helpers::{debug_log, warn_log};

/// Cursor over the stored keys extending a prefix.
pub type SuffixCursor = Cursor<Suffixes>;
/// Cursor over the stored keys within a Hamming distance of one key.
pub type NeighborCursor = Cursor<Neighbors>;
/// Cursor over all pairs of same-length keys within a Hamming distance.
pub type PairCursor = Cursor<Pairs>;

/// One pending visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) node: NodeId,
    /// Node of the key the traversal is measuring distance against.
    pub(crate) query: NodeId,
    /// Substitutions accumulated between the path to `node` and the query.
    pub(crate) distance: usize,
    pub(crate) depth: usize,
}

impl Frame {
    #[inline]
    pub(crate) fn seed(node: NodeId, query: NodeId) -> Self {
        Self {
            node,
            query,
            distance: 0,
            depth: 0,
        }
    }
}

/// LIFO stack of pending visits owned by a cursor.
///
/// Frames are popped by value, so a frame stays valid after later pushes.
#[derive(Debug)]
pub struct PositionStack {
    frames: Vec<Frame>,
}

impl PositionStack {
    fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut frames = Vec::new();
        frames.try_reserve_exact(capacity)?;
        Ok(Self { frames })
    }

    /// Grows by doubling when full.
    #[inline]
    pub(crate) fn push(&mut self, frame: Frame) -> Result<(), TryReserveError> {
        try_push(&mut self.frames, frame)
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Number of pending visits.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no visits are pending.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Currently reserved room, in frames.
    pub fn capacity(&self) -> usize {
        self.frames.capacity()
    }
}

/// A single match reported by a cursor.
///
/// Items borrow from the trie that was passed to the poll that produced them.
#[derive(Debug)]
pub struct SearchResult<'t, V> {
    /// The key distances are measured against. `None` for suffix enumeration.
    pub query: Option<&'t Item<V>>,
    /// The matching stored key.
    pub target: &'t Item<V>,
    /// Hamming distance between `query` and `target`; 0 for suffix enumeration.
    pub distance: usize,
}

impl<'t, V> SearchResult<'t, V> {
    /// The target key with its first `prefix_len` bytes removed.
    ///
    /// For suffix enumeration, pass [`Cursor::query_len`] to get the part of
    /// the key that follows the searched prefix.
    pub fn key_suffix(&self, prefix_len: usize) -> &'t [u8] {
        let key = self.target.key();
        &key[prefix_len.min(key.len())..]
    }
}

impl<V> Clone for SearchResult<'_, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for SearchResult<'_, V> {}

mod sealed {
    pub trait Sealed {}
}

/// Policy plugged into a [`Cursor`]: produces at most one result per step.
///
/// Implemented by [`Suffixes`], [`Neighbors`] and [`Pairs`].
pub trait Traversal: sealed::Sealed {
    /// Whether the traversal marks nodes and needs the trie's exclusive lease.
    const DIRTY: bool = false;

    /// Starting capacity of the position stack.
    fn initial_capacity(&self) -> usize {
        1
    }

    /// Pops frames until one yields a result or nothing is left.
    fn step<'t, V>(
        &mut self,
        trie: &'t Trie<V>,
        stack: &mut PositionStack,
    ) -> Result<Option<SearchResult<'t, V>>, TryReserveError>;
}

/// Pushes every child of `frame.node` whose path stays within `max_distance`
/// substitutions of the query key. A matching symbol costs nothing; a
/// mismatch costs one.
///
/// With `skip_explored`, children carrying the explored mark are ignored.
/// Returns `true` when no child was left to consider.
pub(crate) fn expand_within<V>(
    trie: &Trie<V>,
    stack: &mut PositionStack,
    frame: Frame,
    max_distance: usize,
    skip_explored: bool,
) -> Result<bool, TryReserveError> {
    let symbol = match trie
        .node(frame.query)
        .item()
        .and_then(|query| query.key().get(frame.depth))
    {
        Some(&symbol) => symbol,
        None => return Ok(false),
    };

    let mut exhausted = true;
    for (id, child) in trie.children(frame.node) {
        if skip_explored && child.explored.get() {
            continue;
        }
        exhausted = false;
        if child.symbol == symbol {
            stack.push(Frame {
                node: id,
                depth: frame.depth + 1,
                ..frame
            })?;
        } else if frame.distance < max_distance {
            stack.push(Frame {
                node: id,
                distance: frame.distance + 1,
                depth: frame.depth + 1,
                ..frame
            })?;
        }
    }
    Ok(exhausted)
}

/// A resumable traversal over a [`Trie`].
///
/// Poll with [`Cursor::next`]. `None` means either the sequence is exhausted
/// or the cursor was invalidated; [`Cursor::error`] tells the two apart.
/// Any node insertion or removal after creation invalidates the cursor with
/// [`IterError::OutOfSync`], even if a later mutation restores the shape.
pub struct Cursor<T> {
    trie_id: u64,
    revision: u64,
    lease: Option<Lease>,
    error: Option<IterError>,
    query_len: usize,
    stack: PositionStack,
    traversal: T,
}

impl<T: Traversal> Cursor<T> {
    pub(crate) fn new<V>(
        trie: &Trie<V>,
        traversal: T,
        query_len: usize,
        seed: Option<Frame>,
    ) -> Result<Self, TrieError> {
        let capacity = traversal
            .initial_capacity()
            .max(trie.config().stack_capacity);
        let mut stack = PositionStack::with_capacity(capacity)?;
        if let Some(frame) = seed {
            stack.push(frame)?;
        }
        debug_log!(
            trie = trie.id(),
            revision = trie.revision(),
            query_len,
            dirty = T::DIRTY,
            "cursor created"
        );
        Ok(Self {
            trie_id: trie.id(),
            revision: trie.revision(),
            lease: None,
            error: None,
            query_len,
            stack,
            traversal,
        })
    }

    /// Takes the trie's exclusive lease, evicting any current holder.
    pub(crate) fn with_lease<V>(mut self, trie: &Trie<V>) -> Self {
        self.lease = Some(trie.acquire_lease());
        self
    }

    #[inline]
    pub(crate) fn take_lease(&mut self) -> Option<Lease> {
        self.lease.take()
    }

    /// Produces the next result, or `None` at the end of the sequence or
    /// once the cursor has been invalidated.
    pub fn next<'t, V>(&mut self, trie: &'t Trie<V>) -> Option<SearchResult<'t, V>> {
        if self.error.is_some() {
            return None;
        }

        if let Err(err) = self.check(trie) {
            debug_log!(trie = trie.id(), error = %err, "cursor invalidated");
            self.error = Some(err);
            return None;
        }

        match self.traversal.step(trie, &mut self.stack) {
            Ok(result) => result,
            Err(err) => {
                warn_log!(trie = trie.id(), error = %err, "cursor stack allocation failed");
                self.error = Some(IterError::AllocationFailed);
                None
            }
        }
    }

    fn check<V>(&self, trie: &Trie<V>) -> Result<(), IterError> {
        if trie.id() != self.trie_id {
            return Err(IterError::ForeignTrie);
        }
        if trie.revision() != self.revision {
            return Err(IterError::OutOfSync);
        }
        match self.lease {
            Some(lease) if !trie.holds_lease(lease) => Err(IterError::Replaced),
            _ => Ok(()),
        }
    }

    /// `None` while the cursor is healthy.
    #[inline]
    pub fn error(&self) -> Option<IterError> {
        self.error
    }

    /// Length of the prefix, key or key length the cursor was created for.
    #[inline]
    pub fn query_len(&self) -> usize {
        self.query_len
    }

    /// Whether the cursor marks nodes and holds an exclusive lease.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        T::DIRTY
    }

    /// The pending position stack.
    #[inline]
    pub fn stack(&self) -> &PositionStack {
        &self.stack
    }

    /// Binds the cursor to `trie` as a standard iterator.
    ///
    /// The lease of a dirty cursor is released when the [`Walk`] is dropped.
    pub fn walk<V>(self, trie: &Trie<V>) -> Walk<'_, T, V> {
        Walk { cursor: self, trie }
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("trie_id", &self.trie_id)
            .field("revision", &self.revision)
            .field("dirty", &self.lease.is_some())
            .field("error", &self.error)
            .field("query_len", &self.query_len)
            .field("pending", &self.stack.len())
            .finish()
    }
}

/// A [`Cursor`] bound to its trie, usable as an [`Iterator`].
pub struct Walk<'t, T: Traversal, V> {
    cursor: Cursor<T>,
    trie: &'t Trie<V>,
}

impl<'t, T: Traversal, V> Walk<'t, T, V> {
    /// See [`Cursor::error`].
    pub fn error(&self) -> Option<IterError> {
        self.cursor.error()
    }

    /// See [`Cursor::query_len`].
    pub fn query_len(&self) -> usize {
        self.cursor.query_len()
    }
}

impl<'t, T: Traversal, V> Iterator for Walk<'t, T, V> {
    type Item = SearchResult<'t, V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next(self.trie)
    }
}

impl<T: Traversal, V> Drop for Walk<'_, T, V> {
    fn drop(&mut self) {
        if let Some(lease) = self.cursor.take_lease() {
            self.trie.release_lease(lease);
        }
    }
}
