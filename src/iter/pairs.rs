//! All unordered pairs of same-length keys within a bounded Hamming distance.
//!
//! Every stored key of the requested length becomes a query in turn. Each
//! query runs the same pruned search as neighbor lookup, except that nodes
//! carrying the explored mark are skipped. A query is marked before its
//! search starts, so later queries never pair with it again; an inner node
//! is marked once all of its children are marked. Together this reports each
//! pair exactly once and stops revisiting subtrees that cannot produce a new
//! pair.
//!
//! The marks live on the nodes, so only one such search may run per trie.
//! Creating one takes the trie's exclusive lease; the previous holder, if
//! any, is evicted and its marks are cleared.

use std::collections::TryReserveError;

use super::{expand_within, sealed, Cursor, Frame, PositionStack, SearchResult, Traversal};
use crate::error::TrieError;
use crate::node::{try_push, NodeId};
use crate::trie::Trie;

/// Exclusive all-pairs search over keys of one length.
#[derive(Debug)]
pub struct Pairs {
    key_len: usize,
    max_distance: usize,
    /// Keys still waiting to act as the query.
    queries: Vec<NodeId>,
}

impl Pairs {
    pub(crate) fn start<V>(
        trie: &Trie<V>,
        key_len: usize,
        max_distance: usize,
    ) -> Result<Cursor<Self>, TrieError> {
        if key_len < 1 {
            return Err(TrieError::InvalidKeyLength);
        }
        if max_distance < 1 {
            return Err(TrieError::InvalidDistance);
        }

        let queries = Self::keys_of_len(trie, key_len)?;
        let cursor = Cursor::new(
            trie,
            Pairs {
                key_len,
                max_distance,
                queries,
            },
            key_len,
            None,
        )?;
        Ok(cursor.with_lease(trie))
    }

    /// Collects every stored key with exactly `key_len` symbols.
    fn keys_of_len<V>(trie: &Trie<V>, key_len: usize) -> Result<Vec<NodeId>, TryReserveError> {
        let mut found = Vec::new();
        let mut pending: Vec<(NodeId, usize)> = Vec::new();
        try_push(&mut pending, (NodeId::ROOT, 0))?;

        while let Some((id, depth)) = pending.pop() {
            if depth == key_len {
                if trie.node(id).item().is_some() {
                    try_push(&mut found, id)?;
                }
                continue;
            }
            for (child, _) in trie.children(id) {
                try_push(&mut pending, (child, depth + 1))?;
            }
        }
        Ok(found)
    }
}

impl sealed::Sealed for Pairs {}

impl Traversal for Pairs {
    const DIRTY: bool = true;

    fn initial_capacity(&self) -> usize {
        self.key_len + 1
    }

    fn step<'t, V>(
        &mut self,
        trie: &'t Trie<V>,
        stack: &mut PositionStack,
    ) -> Result<Option<SearchResult<'t, V>>, TryReserveError> {
        loop {
            let frame = match stack.pop() {
                Some(frame) => frame,
                None => {
                    let Some(query) = self.queries.pop() else {
                        return Ok(None);
                    };
                    trie.node(query).explored.set(true);
                    stack.push(Frame::seed(NodeId::ROOT, query))?;
                    continue;
                }
            };

            let node = trie.node(frame.node);
            if frame.depth == self.key_len {
                match node.item() {
                    Some(target) => {
                        return Ok(Some(SearchResult {
                            query: trie.node(frame.query).item(),
                            target,
                            distance: frame.distance,
                        }));
                    }
                    None => {
                        node.explored.set(true);
                        continue;
                    }
                }
            }

            if expand_within(trie, stack, frame, self.max_distance, true)? {
                node.explored.set(true);
            }
        }
    }
}
