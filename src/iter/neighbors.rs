//! Keys within a bounded Hamming distance of one stored key.

use std::collections::TryReserveError;

use super::{expand_within, sealed, Cursor, Frame, PositionStack, SearchResult, Traversal};
use crate::error::TrieError;
use crate::node::NodeId;
use crate::trie::Trie;

/// Pruned depth-first search from the root for same-length keys differing
/// from the query in at most `max_distance` positions. Branches are cut as
/// soon as their mismatch count would exceed the bound, so work is limited
/// to the part of the trie reachable within that many substitutions.
#[derive(Debug)]
pub struct Neighbors {
    max_distance: usize,
    target_depth: usize,
}

impl Neighbors {
    pub(crate) fn start<V>(
        trie: &Trie<V>,
        key: &[u8],
        max_distance: usize,
    ) -> Result<Cursor<Self>, TrieError> {
        if max_distance < 1 {
            return Err(TrieError::InvalidDistance);
        }
        let query = trie
            .find(key)
            .filter(|&id| trie.node(id).item().is_some())
            .ok_or(TrieError::NoSuchKey)?;

        Cursor::new(
            trie,
            Neighbors {
                max_distance,
                target_depth: key.len(),
            },
            key.len(),
            Some(Frame::seed(NodeId::ROOT, query)),
        )
    }
}

impl sealed::Sealed for Neighbors {}

impl Traversal for Neighbors {
    fn initial_capacity(&self) -> usize {
        self.target_depth + 1
    }

    fn step<'t, V>(
        &mut self,
        trie: &'t Trie<V>,
        stack: &mut PositionStack,
    ) -> Result<Option<SearchResult<'t, V>>, TryReserveError> {
        while let Some(frame) = stack.pop() {
            if frame.depth == self.target_depth {
                // Distance 0 at full depth is the query itself.
                match trie.node(frame.node).item() {
                    Some(target) if frame.distance > 0 => {
                        return Ok(Some(SearchResult {
                            query: trie.node(frame.query).item(),
                            target,
                            distance: frame.distance,
                        }));
                    }
                    _ => continue,
                }
            }
            expand_within(trie, stack, frame, self.max_distance, false)?;
        }
        Ok(None)
    }
}
