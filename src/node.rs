//! Node arena.
//!
//! Nodes are stored in a single `Vec` and refer to each other through
//! 32-bit indices. The parent, first-child and next-sibling links are plain
//! indices; a node is owned by the arena slot it lives in, and the child list
//! of a node is the chain of `sibling` links starting at `child`.

use std::cell::Cell;
use std::collections::TryReserveError;

use crate::error::TrieError;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub(crate) struct NodeId(u32);

impl NodeId {
    pub(crate) const NULL: NodeId = NodeId(u32::MAX);
    pub(crate) const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self.0 == u32::MAX
    }

    #[inline]
    fn index(self) -> usize {
        debug_assert!(!self.is_null());
        self.0 as usize
    }
}

/// A stored key together with its value.
#[derive(Clone, Debug)]
pub struct Item<V> {
    key: Box<[u8]>,
    value: V,
}

impl<V> Item<V> {
    pub(crate) fn new(key: Box<[u8]>, value: V) -> Self {
        Self { key, value }
    }

    /// The full key bytes.
    #[inline]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The associated value.
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub(crate) fn into_value(self) -> V {
        self.value
    }

    pub(crate) fn replace_value(&mut self, value: V) -> V {
        std::mem::replace(&mut self.value, value)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<V> {
    /// Present iff this node terminates a stored key.
    pub(crate) item: Option<Item<V>>,
    pub(crate) parent: NodeId,
    pub(crate) sibling: NodeId,
    pub(crate) child: NodeId,
    /// Edge symbol from the parent. Unused on the root.
    pub(crate) symbol: u8,
    /// Set only while an all-pairs search holds the trie's lease.
    pub(crate) explored: Cell<bool>,
}

impl<V> Node<V> {
    fn new(parent: NodeId, sibling: NodeId, symbol: u8) -> Self {
        Self {
            item: None,
            parent,
            sibling,
            child: NodeId::NULL,
            symbol,
            explored: Cell::new(false),
        }
    }

    #[inline]
    pub(crate) fn item(&self) -> Option<&Item<V>> {
        self.item.as_ref()
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.child.is_null()
    }
}

/// Slot storage with a free list. Slot 0 always holds the root.
#[derive(Clone, Debug)]
pub(crate) struct NodeArena<V> {
    slots: Vec<Option<Node<V>>>,
    free: Vec<NodeId>,
}

impl<V> NodeArena<V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity.max(1));
        slots.push(Some(Node::new(NodeId::NULL, NodeId::NULL, 0)));
        Self {
            slots,
            free: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node<V> {
        match self.slots[id.index()].as_ref() {
            Some(node) => node,
            None => unreachable!("dangling node id {id:?}"),
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<V> {
        match self.slots[id.index()].as_mut() {
            Some(node) => node,
            None => unreachable!("dangling node id {id:?}"),
        }
    }

    /// Finds the child of `id` labelled `symbol`.
    pub(crate) fn child(&self, id: NodeId, symbol: u8) -> NodeId {
        let mut child = self.get(id).child;
        while !child.is_null() {
            let node = self.get(child);
            if node.symbol == symbol {
                return child;
            }
            child = node.sibling;
        }
        NodeId::NULL
    }

    pub(crate) fn children(&self, id: NodeId) -> Children<'_, V> {
        Children {
            arena: self,
            next: self.get(id).child,
        }
    }

    /// Makes sure `additional` nodes can be added without reallocating.
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), TrieError> {
        let fresh = additional.saturating_sub(self.free.len());
        if fresh == 0 {
            return Ok(());
        }
        if self.slots.len() + fresh > u32::MAX as usize {
            return Err(TrieError::CapacityExceeded);
        }
        self.slots.try_reserve(fresh)?;
        Ok(())
    }

    /// Head-inserts a new child under `parent`. Callers reserve first.
    pub(crate) fn push_child(&mut self, parent: NodeId, symbol: u8) -> NodeId {
        let node = Node::new(parent, self.get(parent).child, symbol);
        let id = match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId(self.slots.len() as u32);
                self.slots.push(Some(node));
                id
            }
        };
        self.get_mut(parent).child = id;
        id
    }

    /// Unlinks the leaf `id` from its parent's child list and frees its slot.
    pub(crate) fn remove_leaf(&mut self, id: NodeId) -> Node<V> {
        debug_assert!(id != NodeId::ROOT);
        let (parent, sibling) = {
            let node = self.get(id);
            debug_assert!(node.is_leaf());
            (node.parent, node.sibling)
        };

        if self.get(parent).child == id {
            self.get_mut(parent).child = sibling;
        } else {
            let mut prev = self.get(parent).child;
            while self.get(prev).sibling != id {
                prev = self.get(prev).sibling;
            }
            self.get_mut(prev).sibling = sibling;
        }

        self.free.push(id);
        match self.slots[id.index()].take() {
            Some(node) => node,
            None => unreachable!("dangling node id {id:?}"),
        }
    }

    /// Clears every explored flag with a linear sweep over the slots.
    pub(crate) fn reset_explored(&self) {
        for node in self.slots.iter().flatten() {
            node.explored.set(false);
        }
    }

    /// Drops every node except the root, and the root's item.
    pub(crate) fn clear(&mut self) {
        self.slots.truncate(1);
        self.free.clear();
        let root = self.get_mut(NodeId::ROOT);
        root.item = None;
        root.child = NodeId::NULL;
        root.explored.set(false);
    }

    #[cfg(test)]
    pub(crate) fn live(&self) -> impl Iterator<Item = (NodeId, &Node<V>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|node| (NodeId(i as u32), node)))
    }
}

/// Iterator over the children of a node, in sibling-list order.
pub(crate) struct Children<'a, V> {
    arena: &'a NodeArena<V>,
    next: NodeId,
}

impl<'a, V> Iterator for Children<'a, V> {
    type Item = (NodeId, &'a Node<V>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.is_null() {
            return None;
        }
        let id = self.next;
        let node = self.arena.get(id);
        self.next = node.sibling;
        Some((id, node))
    }
}

/// Pushes onto a `Vec`, reporting allocation failure instead of aborting.
#[inline]
pub(crate) fn try_push<T>(vec: &mut Vec<T>, value: T) -> Result<(), TryReserveError> {
    if vec.len() == vec.capacity() {
        vec.try_reserve(1)?;
    }
    vec.push(value);
    Ok(())
}
