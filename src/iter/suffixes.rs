//! Enumeration of the stored keys that extend a prefix.

use std::collections::TryReserveError;

use super::{sealed, Cursor, Frame, PositionStack, SearchResult, Traversal};
use crate::error::TrieError;
use crate::trie::Trie;

/// Depth-first enumeration below a prefix node.
///
/// A node's item is reported before anything below it. Children are pushed
/// in sibling-list order (newest first), so siblings come out oldest first.
/// Output is never sorted by byte value.
#[derive(Debug)]
pub struct Suffixes {
    _priv: (),
}

impl Suffixes {
    pub(crate) fn start<V>(trie: &Trie<V>, prefix: &[u8]) -> Result<Cursor<Self>, TrieError> {
        let node = trie.find(prefix).ok_or(TrieError::NoSuchNode)?;
        Cursor::new(
            trie,
            Suffixes { _priv: () },
            prefix.len(),
            Some(Frame::seed(node, node)),
        )
    }
}

impl sealed::Sealed for Suffixes {}

impl Traversal for Suffixes {
    fn step<'t, V>(
        &mut self,
        trie: &'t Trie<V>,
        stack: &mut PositionStack,
    ) -> Result<Option<SearchResult<'t, V>>, TryReserveError> {
        while let Some(frame) = stack.pop() {
            for (child, _) in trie.children(frame.node) {
                stack.push(Frame {
                    node: child,
                    depth: frame.depth + 1,
                    ..frame
                })?;
            }
            if let Some(target) = trie.node(frame.node).item() {
                return Ok(Some(SearchResult {
                    query: None,
                    target,
                    distance: 0,
                }));
            }
        }
        Ok(None)
    }
}
