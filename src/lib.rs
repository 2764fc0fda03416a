//! # vtrie
//!
//! An in-memory map from byte strings to values, built as a trie with one
//! node per distinct key prefix. Besides exact lookup it answers three
//! traversal queries through resumable cursors:
//!
//! - every stored key extending a prefix ([`Trie::suffixes`]),
//! - every stored key within a Hamming distance of one key ([`Trie::neighbors`]),
//! - every pair of same-length keys within a Hamming distance ([`Trie::pairs`]).
//!
//! Cursors do not borrow the trie. Each poll takes it as an argument, and a
//! cursor created before a node was added or removed reports
//! [`IterError::OutOfSync`] instead of producing results.
//!
//! ## Example
//!
//! ```rust
//! use vtrie::Trie;
//!
//! let mut trie: Trie<u32> = Trie::new();
//! trie.insert(b"hello", 1);
//! trie.insert(b"h3llo", 2);
//! trie.insert(b"world", 3);
//!
//! assert_eq!(trie.get(b"hello"), Some(&1));
//!
//! let close: Vec<&[u8]> = trie
//!     .neighbors(b"hello", 1)?
//!     .walk(&trie)
//!     .map(|r| r.target.key())
//!     .collect();
//! assert_eq!(close, [b"h3llo"]);
//! # Ok::<(), vtrie::TrieError>(())
//! ```

#![forbid(unsafe_code)]

mod tracing_helpers;

mod error;
mod iter;
mod node;
mod trie;

#[cfg(test)]
mod proptests;

pub use error::{IterError, TrieError};
pub use iter::{
    Cursor, NeighborCursor, Neighbors, PairCursor, Pairs, PositionStack, SearchResult,
    SuffixCursor, Suffixes, Traversal, Walk,
};
pub use node::Item;
pub use trie::{Config, Iter, Keys, Values, Trie};
