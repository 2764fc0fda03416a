//! Trie map over byte-string keys.

use std::cell::Cell;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TrieError;
use crate::iter::{Cursor, NeighborCursor, Neighbors, PairCursor, Pairs, SuffixCursor, Suffixes, Traversal};
use crate::node::{Children, Item, Node, NodeArena, NodeId};
use crate::tracing_helpers::{debug_log, trace_log};

static NEXT_TRIE_ID: AtomicU64 = AtomicU64::new(1);

/// Configuration for a [`Trie`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of nodes to reserve room for up front.
    pub initial_capacity: usize,
    /// Minimum starting capacity of a cursor's position stack.
    pub stack_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            stack_capacity: 16,
        }
    }
}

/// Right to run a node-marking traversal. At most one is active per trie.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Lease {
    trie: u64,
    seq: NonZeroU64,
}

/// A map from byte strings to values, with approximate lookup by Hamming
/// distance.
///
/// Every prefix of every stored key has a node, and every node either holds
/// an item or has children. The trie counts nodes, items and bytes, and
/// keeps a revision number that changes whenever a node is added or removed;
/// cursors use it to detect that they went stale.
pub struct Trie<V> {
    nodes: NodeArena<V>,
    /// Nodes excluding the root.
    num_nodes: usize,
    num_items: usize,
    memory_usage: usize,
    revision: u64,
    id: u64,
    config: Config,
    lease_seq: Cell<u64>,
    active_lease: Cell<Option<Lease>>,
}

impl<V> Trie<V> {
    /// Fixed bytes accounted for every node, the root included.
    pub const NODE_SIZE: usize = std::mem::size_of::<Node<V>>();

    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            nodes: NodeArena::with_capacity(config.initial_capacity),
            num_nodes: 0,
            num_items: 0,
            memory_usage: Self::NODE_SIZE,
            revision: 0,
            id: NEXT_TRIE_ID.fetch_add(1, Ordering::Relaxed),
            config,
            lease_seq: Cell::new(0),
            active_lease: Cell::new(None),
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of stored keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.num_items
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Number of nodes, not counting the root.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Bytes accounted to the structure: [`Self::NODE_SIZE`] per node
    /// including the root, plus the length of every stored key.
    #[inline]
    pub fn memory_usage(&self) -> usize {
        self.memory_usage
    }

    /// Counter bumped whenever a node is added or removed. Never decreases.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<V> {
        self.nodes.get(id)
    }

    #[inline]
    pub(crate) fn children(&self, id: NodeId) -> Children<'_, V> {
        self.nodes.children(id)
    }

    /// Walks `key` from the root; the node it ends on, if every step exists.
    pub(crate) fn find(&self, key: &[u8]) -> Option<NodeId> {
        let mut node = NodeId::ROOT;
        for &symbol in key {
            node = self.nodes.child(node, symbol);
            if node.is_null() {
                return None;
            }
        }
        Some(node)
    }

    /// Whether `key` is stored.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.get_item(key).is_some()
    }

    /// Whether a node exists for `key`, i.e. whether it is a prefix of some
    /// stored key (or the empty key, which always has the root).
    pub fn has_node(&self, key: &[u8]) -> bool {
        self.find(key).is_some()
    }

    pub fn get_item(&self, key: &[u8]) -> Option<&Item<V>> {
        self.find(key).and_then(|id| self.nodes.get(id).item())
    }

    pub fn get(&self, key: &[u8]) -> Option<&V> {
        self.get_item(key).map(Item::value)
    }

    pub fn get_mut(&mut self, key: &[u8]) -> Option<&mut V> {
        let id = self.find(key)?;
        self.nodes.get_mut(id).item.as_mut().map(Item::value_mut)
    }

    /// The stored key that is the longest prefix of `key`, if any.
    pub fn longest_prefix(&self, key: &[u8]) -> Option<&Item<V>> {
        let mut node = NodeId::ROOT;
        let mut best = self.nodes.get(node).item();
        for &symbol in key {
            node = self.nodes.child(node, symbol);
            if node.is_null() {
                break;
            }
            if let Some(item) = self.nodes.get(node).item() {
                best = Some(item);
            }
        }
        best
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// # Panics
    ///
    /// Panics if memory for new nodes or key bytes cannot be allocated. Use
    /// [`Self::try_insert`] to handle that case.
    pub fn insert(&mut self, key: &[u8], value: V) -> Option<V> {
        match self.try_insert(key, value) {
            Ok(old) => old,
            Err(err) => panic!("trie insert failed: {err}"),
        }
    }

    /// Like [`Self::insert`], but reports allocation failure. On error the
    /// trie is unchanged.
    pub fn try_insert(&mut self, key: &[u8], value: V) -> Result<Option<V>, TrieError> {
        self.insert_node(key, value).map(|(_, old)| old)
    }

    fn insert_node(&mut self, key: &[u8], value: V) -> Result<(NodeId, Option<V>), TrieError> {
        let mut node = NodeId::ROOT;
        let mut matched = 0;
        for &symbol in key {
            let child = self.nodes.child(node, symbol);
            if child.is_null() {
                break;
            }
            node = child;
            matched += 1;
        }

        if matched == key.len() {
            if let Some(item) = self.nodes.get_mut(node).item.as_mut() {
                return Ok((node, Some(item.replace_value(value))));
            }
        }

        // Reserve everything before touching the structure.
        self.nodes.reserve(key.len() - matched)?;
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(key.len())?;
        bytes.extend_from_slice(key);

        for &symbol in &key[matched..] {
            node = self.nodes.push_child(node, symbol);
        }
        let created = key.len() - matched;
        self.num_nodes += created;
        self.memory_usage += created * Self::NODE_SIZE + key.len();

        self.nodes.get_mut(node).item = Some(Item::new(bytes.into_boxed_slice(), value));
        self.num_items += 1;
        self.revision += 1;
        Ok((node, None))
    }

    /// Returns the value under `key`, inserting `default()` first if absent.
    ///
    /// # Panics
    ///
    /// Panics if memory for the new entry cannot be allocated.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: &[u8], default: F) -> &mut V {
        let id = match self.find(key).filter(|&id| self.nodes.get(id).item.is_some()) {
            Some(id) => id,
            None => match self.insert_node(key, default()) {
                Ok((id, _)) => id,
                Err(err) => panic!("trie insert failed: {err}"),
            },
        };
        match self.nodes.get_mut(id).item.as_mut() {
            Some(item) => item.value_mut(),
            None => unreachable!("inserted node has no item"),
        }
    }

    /// Removes `key`, returning its value. Nodes that no longer lead to any
    /// stored key are pruned.
    pub fn remove(&mut self, key: &[u8]) -> Option<V> {
        let id = self.find(key)?;
        let item = self.nodes.get_mut(id).item.take()?;
        self.num_items -= 1;
        self.memory_usage -= item.key().len();

        let mut pruned = 0usize;
        let mut current = id;
        while current != NodeId::ROOT {
            let node = self.nodes.get(current);
            if !node.is_leaf() || node.item.is_some() {
                break;
            }
            let parent = node.parent;
            self.nodes.remove_leaf(current);
            current = parent;
            pruned += 1;
        }
        self.num_nodes -= pruned;
        self.memory_usage -= pruned * Self::NODE_SIZE;
        self.revision += 1;
        trace_log!(pruned, revision = self.revision, "removed key");

        Some(item.into_value())
    }

    /// Removes and returns some stored item. Which one is unspecified.
    pub fn pop_item(&mut self) -> Option<(Vec<u8>, V)> {
        let key = self.iter().next()?.0.to_vec();
        let value = self.remove(&key)?;
        Some((key, value))
    }

    /// Removes every item and node.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.num_nodes = 0;
        self.num_items = 0;
        self.memory_usage = Self::NODE_SIZE;
        self.revision += 1;
    }

    /// Iterates over all items, in the same order as suffix enumeration of
    /// the empty prefix.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            trie: self,
            stack: vec![NodeId::ROOT],
        }
    }

    pub fn keys(&self) -> Keys<'_, V> {
        Keys(self.iter())
    }

    pub fn values(&self) -> Values<'_, V> {
        Values(self.iter())
    }

    /// Cursor over the stored keys that start with `prefix`.
    ///
    /// Fails with [`TrieError::NoSuchNode`] if no stored key starts with it.
    pub fn suffixes(&self, prefix: &[u8]) -> Result<SuffixCursor, TrieError> {
        Suffixes::start(self, prefix)
    }

    /// Cursor over the stored keys of the same length as `key` that differ
    /// from it in between 1 and `max_distance` positions.
    ///
    /// `key` must be stored; a node that is only a prefix is rejected with
    /// [`TrieError::NoSuchKey`].
    pub fn neighbors(&self, key: &[u8], max_distance: usize) -> Result<NeighborCursor, TrieError> {
        Neighbors::start(self, key, max_distance)
    }

    /// Cursor over every unordered pair of stored keys of length `key_len`
    /// that differ in between 1 and `max_distance` positions.
    ///
    /// The cursor takes this trie's exclusive lease. Any earlier pair cursor
    /// stops with [`IterError::Replaced`](crate::IterError::Replaced).
    pub fn pairs(&self, key_len: usize, max_distance: usize) -> Result<PairCursor, TrieError> {
        Pairs::start(self, key_len, max_distance)
    }

    /// Releases a cursor. If it still holds the lease, the node marks are
    /// cleared and the lease is freed; otherwise this just drops it.
    pub fn release<T: Traversal>(&self, mut cursor: Cursor<T>) {
        if let Some(lease) = cursor.take_lease() {
            self.release_lease(lease);
        }
    }

    pub(crate) fn acquire_lease(&self) -> Lease {
        if self.active_lease.get().is_some() {
            debug_log!(trie = self.id, previous = self.lease_seq.get(), "replacing dirty cursor");
            self.nodes.reset_explored();
        }
        let lease = Lease {
            trie: self.id,
            seq: NonZeroU64::MIN.saturating_add(self.lease_seq.get()),
        };
        self.lease_seq.set(lease.seq.get());
        self.active_lease.set(Some(lease));
        lease
    }

    #[inline]
    pub(crate) fn holds_lease(&self, lease: Lease) -> bool {
        self.active_lease.get() == Some(lease)
    }

    pub(crate) fn release_lease(&self, lease: Lease) {
        if self.holds_lease(lease) {
            debug_log!(trie = self.id, lease = lease.seq.get(), "releasing dirty cursor");
            self.nodes.reset_explored();
            self.active_lease.set(None);
        }
    }

    #[cfg(test)]
    pub(crate) fn has_lease(&self) -> bool {
        self.active_lease.get().is_some()
    }

    #[cfg(test)]
    pub(crate) fn all_unexplored(&self) -> bool {
        self.nodes.live().all(|(_, node)| !node.explored.get())
    }

    #[cfg(test)]
    pub(crate) fn arena(&self) -> &NodeArena<V> {
        &self.nodes
    }
}

impl<V> Default for Trie<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone> Clone for Trie<V> {
    /// The clone is a separate trie: cursors of the original do not apply
    /// to it, and it starts without marks or an active lease.
    fn clone(&self) -> Self {
        let nodes = self.nodes.clone();
        nodes.reset_explored();
        Self {
            nodes,
            num_nodes: self.num_nodes,
            num_items: self.num_items,
            memory_usage: self.memory_usage,
            revision: self.revision,
            id: NEXT_TRIE_ID.fetch_add(1, Ordering::Relaxed),
            config: self.config.clone(),
            lease_seq: Cell::new(0),
            active_lease: Cell::new(None),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for Trie<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: AsRef<[u8]>, V> Extend<(K, V)> for Trie<V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key.as_ref(), value);
        }
    }
}

impl<K: AsRef<[u8]>, V> FromIterator<(K, V)> for Trie<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut trie = Trie::new();
        trie.extend(iter);
        trie
    }
}

impl<'a, V> IntoIterator for &'a Trie<V> {
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, V> {
    trie: &'a Trie<V>,
    stack: Vec<NodeId>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            self.stack
                .extend(self.trie.children(id).map(|(child, _)| child));
            if let Some(item) = self.trie.node(id).item() {
                return Some((item.key(), item.value()));
            }
        }
        None
    }
}

pub struct Keys<'a, V>(Iter<'a, V>);

impl<'a, V> Iterator for Keys<'a, V> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(key, _)| key)
    }
}

pub struct Values<'a, V>(Iter<'a, V>);

impl<'a, V> Iterator for Values<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, value)| value)
    }
}
