//! B+ tree engine over allocator pages.
//!
//! Every node is addressed by page id and viewed through `LeafNode` /
//! `InternalNode` only for the duration of one step. Views are never held
//! across `PageAllocator::allocate`, which may remap the store.
//!
//! Values longer than `MAX_VALUE_LEN` bytes are truncated on insert.

#![allow(clippy::cast_possible_truncation)]

use std::path::Path;

use tracing::{debug, trace, warn};

use crate::storage::allocator::{AllocatorError, DEFAULT_GROWTH_BATCH, PageAllocator};
use crate::storage::btree::node::{
    InternalNode, LeafNode, LeafRecord, MAX_VALUE_LEN, MIN_INTERNAL_KEYS, MIN_LEAF_KEYS, Node,
    NodeError,
};
use crate::storage::file::MappedFile;
use crate::storage::header::TreeHeader;
use crate::storage::io::{PageStore, StoreError};
use crate::storage::page::{NULL_PAGE, PageId};

/// A B+ tree mapping `u64` keys to short byte values.
#[derive(Debug)]
pub struct BTree<S: PageStore = MappedFile> {
    pub(super) alloc: PageAllocator<S>,
}

/// Position of a node under its parent.
struct Siblings {
    parent: PageId,
    index: usize,
    left: Option<PageId>,
    right: Option<PageId>,
}

impl BTree<MappedFile> {
    /// Open the tree file at `path`, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BTreeError> {
        Self::open_with(path, DEFAULT_GROWTH_BATCH)
    }

    /// Like `open`, growing the file by `growth_batch` pages at a time.
    pub fn open_with(path: impl AsRef<Path>, growth_batch: u64) -> Result<Self, BTreeError> {
        let file = MappedFile::open(path.as_ref())?;
        Self::with_store(file, growth_batch)
    }
}

impl<S: PageStore> BTree<S> {
    /// Open a tree over an arbitrary page store.
    pub fn with_store(store: S, growth_batch: u64) -> Result<Self, BTreeError> {
        let alloc = PageAllocator::open(store, growth_batch)?;
        Ok(Self { alloc })
    }

    #[must_use]
    pub const fn header(&self) -> &TreeHeader {
        self.alloc.header()
    }

    /// Number of keys in the tree.
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.alloc.header().key_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alloc.header().root().is_none()
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.alloc.header().height
    }

    /// Pages currently on the free list.
    pub fn free_page_count(&self) -> Result<u64, BTreeError> {
        Ok(self.alloc.free_page_count()?)
    }

    /// Look up `key`.
    pub fn get(&self, key: u64) -> Result<Option<Vec<u8>>, BTreeError> {
        let Some(root) = self.alloc.header().root() else {
            return Ok(None);
        };

        let leaf = self.leaf(self.find_leaf(root, key)?)?;
        match leaf.search(key) {
            Ok(index) => Ok(Some(leaf.record(index)?.value().to_vec())),
            Err(_) => Ok(None),
        }
    }

    /// Insert `key`, replacing the value if the key already exists.
    ///
    /// Values longer than `MAX_VALUE_LEN` bytes are truncated to that length
    /// and a warning is logged.
    pub fn put(&mut self, key: u64, value: &[u8]) -> Result<(), BTreeError> {
        if value.len() > MAX_VALUE_LEN {
            warn!(
                key,
                len = value.len(),
                max = MAX_VALUE_LEN,
                "value truncated"
            );
        }
        let record = LeafRecord::new(key, value);

        let Some(root) = self.alloc.header().root() else {
            return self.create_first_root(&record);
        };

        let leaf_id = self.find_leaf(root, key)?;
        let (position, full) = {
            let leaf = self.leaf(leaf_id)?;
            (leaf.search(key), leaf.is_full())
        };

        match position {
            Ok(index) => {
                self.leaf_mut(leaf_id)?.set_record(index, &record)?;
                return Ok(());
            }
            Err(index) if !full => self.leaf_mut(leaf_id)?.insert_at(index, &record)?,
            Err(_) => self.split_leaf_and_insert(leaf_id, record)?,
        }

        self.alloc.update_header(|h| h.key_count += 1);
        Ok(())
    }

    /// Remove `key`. Returns whether it was present.
    pub fn remove(&mut self, key: u64) -> Result<bool, BTreeError> {
        let Some(root) = self.alloc.header().root() else {
            return Ok(false);
        };

        let leaf_id = self.find_leaf(root, key)?;
        let remaining = {
            let mut leaf = self.leaf_mut(leaf_id)?;
            let Ok(index) = leaf.search(key) else {
                return Ok(false);
            };
            leaf.remove_at(index)?;
            leaf.key_count()
        };
        self.alloc.update_header(|h| h.key_count = h.key_count.saturating_sub(1));

        if leaf_id == root {
            if remaining == 0 {
                self.alloc.free(leaf_id)?;
                self.alloc.update_header(|h| {
                    h.root_page = NULL_PAGE;
                    h.height = 0;
                });
                debug!("removed last key, tree is empty");
            }
            return Ok(true);
        }

        if remaining < MIN_LEAF_KEYS {
            self.handle_leaf_underflow(leaf_id)?;
        }
        Ok(true)
    }

    /// Flush all pages to durable storage.
    pub fn flush(&mut self) -> Result<(), BTreeError> {
        self.alloc.flush()?;
        Ok(())
    }

    /// Consume the tree and return its page store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.alloc.into_store()
    }

    // --- page access -------------------------------------------------------

    pub(super) fn node(&self, page_id: PageId) -> Result<Node<&[u8]>, BTreeError> {
        Ok(Node::new(self.alloc.page(page_id)?)?)
    }

    pub(super) fn leaf(&self, page_id: PageId) -> Result<LeafNode<&[u8]>, BTreeError> {
        Ok(LeafNode::new(self.alloc.page(page_id)?)?)
    }

    fn leaf_mut(&mut self, page_id: PageId) -> Result<LeafNode<&mut [u8]>, BTreeError> {
        Ok(LeafNode::new(self.alloc.page_mut(page_id)?)?)
    }

    pub(super) fn internal(&self, page_id: PageId) -> Result<InternalNode<&[u8]>, BTreeError> {
        Ok(InternalNode::new(self.alloc.page(page_id)?)?)
    }

    fn internal_mut(&mut self, page_id: PageId) -> Result<InternalNode<&mut [u8]>, BTreeError> {
        Ok(InternalNode::new(self.alloc.page_mut(page_id)?)?)
    }

    fn parent_of(&self, page_id: PageId) -> Result<PageId, BTreeError> {
        Ok(self.node(page_id)?.parent())
    }

    fn set_parent(&mut self, page_id: PageId, parent: PageId) -> Result<(), BTreeError> {
        Node::new(self.alloc.page_mut(page_id)?)?.set_parent(parent);
        Ok(())
    }

    // --- lookup ------------------------------------------------------------

    /// Descend from `root` to the leaf whose range contains `key`.
    fn find_leaf(&self, root: PageId, key: u64) -> Result<PageId, BTreeError> {
        let height = self.alloc.header().height;
        let mut current = root;
        let mut depth = 1;

        loop {
            match self.node(current)? {
                Node::Leaf(_) => return Ok(current),
                Node::Internal(node) => {
                    if depth >= height {
                        return Err(BTreeError::Corruption(format!(
                            "internal page {current} at depth {depth} exceeds tree height {height}"
                        )));
                    }
                    current = node.child(node.child_index_for(key))?;
                    depth += 1;
                }
            }
        }
    }

    // --- insert ------------------------------------------------------------

    fn create_first_root(&mut self, record: &LeafRecord) -> Result<(), BTreeError> {
        let root = self.alloc.allocate()?;
        LeafNode::init(self.alloc.page_mut(root)?, NULL_PAGE).push(record)?;

        self.alloc.update_header(|h| {
            h.root_page = root;
            h.height = 1;
            h.key_count = 1;
        });
        debug!(root, "created root leaf");
        Ok(())
    }

    /// Split a full leaf, distributing its records plus `record` over the
    /// original leaf and a new right sibling.
    fn split_leaf_and_insert(
        &mut self,
        leaf_id: PageId,
        record: LeafRecord,
    ) -> Result<(), BTreeError> {
        let (mut buffer, parent, old_next) = {
            let leaf = self.leaf(leaf_id)?;
            (leaf.records(), leaf.parent(), leaf.next())
        };
        let position = buffer.partition_point(|r| r.key < record.key);
        buffer.insert(position, record);

        let new_id = self.alloc.allocate()?;
        let split = buffer.len() / 2;
        let separator = buffer[split].key;

        {
            let mut left = self.leaf_mut(leaf_id)?;
            left.clear();
            for r in &buffer[..split] {
                left.push(r)?;
            }
            left.set_next(new_id);
        }
        {
            let mut right = LeafNode::init(self.alloc.page_mut(new_id)?, parent);
            for r in &buffer[split..] {
                right.push(r)?;
            }
            right.set_prev(leaf_id);
            right.set_next(old_next);
        }
        if old_next != NULL_PAGE {
            self.leaf_mut(old_next)?.set_prev(new_id);
        }

        trace!(leaf = leaf_id, new_leaf = new_id, separator, "split leaf");
        self.insert_parent(leaf_id, separator, new_id)
    }

    /// Link `right` into the parent of `left`, just after `left`.
    fn insert_parent(&mut self, left: PageId, key: u64, right: PageId) -> Result<(), BTreeError> {
        let parent = self.parent_of(left)?;
        if parent == NULL_PAGE {
            return self.create_new_root(left, key, right);
        }

        let (position, full) = {
            let node = self.internal(parent)?;
            (node.position_of_child(left), node.is_full())
        };
        let Some(position) = position else {
            return Err(BTreeError::Corruption(format!(
                "page {left} is not a child of its parent {parent}"
            )));
        };

        if full {
            return self.split_internal_and_insert(parent, position, key, right);
        }

        self.internal_mut(parent)?.insert_at(position, key, right)?;
        self.set_parent(right, parent)
    }

    fn create_new_root(&mut self, left: PageId, key: u64, right: PageId) -> Result<(), BTreeError> {
        let root = self.alloc.allocate()?;
        InternalNode::init(self.alloc.page_mut(root)?, NULL_PAGE, left).push(key, right)?;
        self.set_parent(left, root)?;
        self.set_parent(right, root)?;

        self.alloc.update_header(|h| {
            h.root_page = root;
            h.height += 1;
        });
        debug!(root, height = self.alloc.header().height, "grew new root");
        Ok(())
    }

    /// Split a full internal node while inserting `(key, right)` at
    /// `position`, promoting the middle key.
    fn split_internal_and_insert(
        &mut self,
        node_id: PageId,
        position: usize,
        key: u64,
        right: PageId,
    ) -> Result<(), BTreeError> {
        let (mut keys, mut children, parent) = {
            let node = self.internal(node_id)?;
            (node.keys(), node.children(), node.parent())
        };
        keys.insert(position, key);
        children.insert(position + 1, right);

        let new_id = self.alloc.allocate()?;
        let mid = keys.len() / 2;
        let promoted = keys[mid];

        {
            let mut left = self.internal_mut(node_id)?;
            left.clear(children[0]);
            for (&k, &c) in keys[..mid].iter().zip(&children[1..=mid]) {
                left.push(k, c)?;
            }
        }
        {
            let mut sibling =
                InternalNode::init(self.alloc.page_mut(new_id)?, parent, children[mid + 1]);
            for (&k, &c) in keys[mid + 1..].iter().zip(&children[mid + 2..]) {
                sibling.push(k, c)?;
            }
        }

        for &child in &children[..=mid] {
            self.set_parent(child, node_id)?;
        }
        for &child in &children[mid + 1..] {
            self.set_parent(child, new_id)?;
        }

        trace!(node = node_id, new_node = new_id, promoted, "split internal node");
        self.insert_parent(node_id, promoted, new_id)
    }

    // --- delete ------------------------------------------------------------

    fn siblings(&self, node_id: PageId) -> Result<Siblings, BTreeError> {
        let parent = self.parent_of(node_id)?;
        if parent == NULL_PAGE {
            return Err(BTreeError::Corruption(format!(
                "non-root page {node_id} has no parent"
            )));
        }

        let node = self.internal(parent)?;
        let index = node.position_of_child(node_id).ok_or_else(|| {
            BTreeError::Corruption(format!("page {node_id} is not a child of its parent {parent}"))
        })?;
        let left = if index > 0 {
            Some(node.child(index - 1)?)
        } else {
            None
        };
        let right = if index < node.key_count() {
            Some(node.child(index + 1)?)
        } else {
            None
        };

        Ok(Siblings {
            parent,
            index,
            left,
            right,
        })
    }

    fn handle_leaf_underflow(&mut self, leaf_id: PageId) -> Result<(), BTreeError> {
        let s = self.siblings(leaf_id)?;

        if let Some(left) = s.left
            && self.leaf(left)?.key_count() > MIN_LEAF_KEYS
        {
            return self.borrow_from_left_leaf(leaf_id, left, s.parent, s.index);
        }
        if let Some(right) = s.right
            && self.leaf(right)?.key_count() > MIN_LEAF_KEYS
        {
            return self.borrow_from_right_leaf(leaf_id, right, s.parent, s.index);
        }

        match (s.left, s.right) {
            (Some(left), _) => self.merge_leaves(left, leaf_id, s.parent, s.index - 1),
            (None, Some(right)) => self.merge_leaves(leaf_id, right, s.parent, s.index),
            (None, None) => Err(BTreeError::Corruption(format!(
                "leaf {leaf_id} has no siblings under parent {}",
                s.parent
            ))),
        }
    }

    fn borrow_from_left_leaf(
        &mut self,
        leaf_id: PageId,
        left: PageId,
        parent: PageId,
        index: usize,
    ) -> Result<(), BTreeError> {
        let borrowed = {
            let mut left = self.leaf_mut(left)?;
            let last = left.key_count() - 1;
            left.remove_at(last)?
        };
        self.leaf_mut(leaf_id)?.insert_at(0, &borrowed)?;
        self.internal_mut(parent)?.set_key(index - 1, borrowed.key)?;
        Ok(())
    }

    fn borrow_from_right_leaf(
        &mut self,
        leaf_id: PageId,
        right: PageId,
        parent: PageId,
        index: usize,
    ) -> Result<(), BTreeError> {
        let (borrowed, new_first) = {
            let mut right = self.leaf_mut(right)?;
            let borrowed = right.remove_at(0)?;
            (borrowed, right.key(0)?)
        };
        self.leaf_mut(leaf_id)?.push(&borrowed)?;
        self.internal_mut(parent)?.set_key(index, new_first)?;
        Ok(())
    }

    /// Append `right`'s records to `left`, free `right` and drop the
    /// separator at `separator_index` from the parent.
    fn merge_leaves(
        &mut self,
        left: PageId,
        right: PageId,
        parent: PageId,
        separator_index: usize,
    ) -> Result<(), BTreeError> {
        let (records, next) = {
            let right = self.leaf(right)?;
            (right.records(), right.next())
        };
        {
            let mut left = self.leaf_mut(left)?;
            for r in &records {
                left.push(r)?;
            }
            left.set_next(next);
        }
        if next != NULL_PAGE {
            self.leaf_mut(next)?.set_prev(left);
        }

        self.alloc.free(right)?;
        trace!(left, right, "merged leaves");
        self.remove_from_internal(parent, separator_index)
    }

    /// Remove `key[index]` and `child[index + 1]` from `node_id`, then
    /// rebalance.
    fn remove_from_internal(&mut self, node_id: PageId, index: usize) -> Result<(), BTreeError> {
        let remaining = {
            let mut node = self.internal_mut(node_id)?;
            node.remove_at(index)?;
            node.key_count()
        };

        if self.alloc.header().root() == Some(node_id) {
            return self.adjust_root();
        }
        if remaining < MIN_INTERNAL_KEYS {
            self.handle_internal_underflow(node_id)?;
        }
        Ok(())
    }

    /// Collapse an internal root that has lost its last key.
    fn adjust_root(&mut self) -> Result<(), BTreeError> {
        let root = self.alloc.header().root_page;
        let new_root = {
            let node = self.internal(root)?;
            if node.key_count() > 0 {
                return Ok(());
            }
            node.child(0)?
        };

        self.set_parent(new_root, NULL_PAGE)?;
        self.alloc.free(root)?;
        self.alloc.update_header(|h| {
            h.root_page = new_root;
            h.height = h.height.saturating_sub(1);
        });
        debug!(
            old_root = root,
            new_root,
            height = self.alloc.header().height,
            "collapsed root"
        );
        Ok(())
    }

    fn handle_internal_underflow(&mut self, node_id: PageId) -> Result<(), BTreeError> {
        let s = self.siblings(node_id)?;

        if let Some(left) = s.left
            && self.internal(left)?.key_count() > MIN_INTERNAL_KEYS
        {
            return self.borrow_from_left_internal(node_id, left, s.parent, s.index);
        }
        if let Some(right) = s.right
            && self.internal(right)?.key_count() > MIN_INTERNAL_KEYS
        {
            return self.borrow_from_right_internal(node_id, right, s.parent, s.index);
        }

        match (s.left, s.right) {
            (Some(left), _) => self.merge_internal(left, node_id, s.parent, s.index - 1),
            (None, Some(right)) => self.merge_internal(node_id, right, s.parent, s.index),
            (None, None) => Err(BTreeError::Corruption(format!(
                "internal page {node_id} has no siblings under parent {}",
                s.parent
            ))),
        }
    }

    /// Rotate the last child of `left` through the parent separator.
    fn borrow_from_left_internal(
        &mut self,
        node_id: PageId,
        left: PageId,
        parent: PageId,
        index: usize,
    ) -> Result<(), BTreeError> {
        let separator = self.internal(parent)?.key(index - 1)?;
        let (key_from_left, child_from_left) = {
            let mut left = self.internal_mut(left)?;
            let last = left.key_count() - 1;
            left.remove_at(last)?
        };
        {
            let mut node = self.internal_mut(node_id)?;
            let first = node.child(0)?;
            node.insert_at(0, separator, first)?;
            node.set_child(0, child_from_left)?;
        }
        self.set_parent(child_from_left, node_id)?;
        self.internal_mut(parent)?.set_key(index - 1, key_from_left)?;
        Ok(())
    }

    /// Rotate the first child of `right` through the parent separator.
    fn borrow_from_right_internal(
        &mut self,
        node_id: PageId,
        right: PageId,
        parent: PageId,
        index: usize,
    ) -> Result<(), BTreeError> {
        let separator = self.internal(parent)?.key(index)?;
        let (child_from_right, key_from_right) = {
            let mut right = self.internal_mut(right)?;
            let first = right.child(0)?;
            let (key, second) = right.remove_at(0)?;
            right.set_child(0, second)?;
            (first, key)
        };
        self.internal_mut(node_id)?.push(separator, child_from_right)?;
        self.set_parent(child_from_right, node_id)?;
        self.internal_mut(parent)?.set_key(index, key_from_right)?;
        Ok(())
    }

    /// Fold the separator and all of `right` into `left`, free `right` and
    /// drop the separator from the parent.
    fn merge_internal(
        &mut self,
        left: PageId,
        right: PageId,
        parent: PageId,
        separator_index: usize,
    ) -> Result<(), BTreeError> {
        let separator = self.internal(parent)?.key(separator_index)?;
        let (keys, children) = {
            let right = self.internal(right)?;
            (right.keys(), right.children())
        };
        {
            let mut left = self.internal_mut(left)?;
            left.push(separator, children[0])?;
            for (&k, &c) in keys.iter().zip(&children[1..]) {
                left.push(k, c)?;
            }
        }
        for &child in &children {
            self.set_parent(child, left)?;
        }

        self.alloc.free(right)?;
        trace!(left, right, "merged internal nodes");
        self.remove_from_internal(parent, separator_index)
    }
}

/// Errors from tree operations.
#[derive(Debug)]
pub enum BTreeError {
    /// Page allocation or storage failure.
    Allocator(AllocatorError),
    /// Node view or bounds failure.
    Node(NodeError),
    /// Tree structure violates an invariant.
    Corruption(String),
}

impl std::fmt::Display for BTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allocator(e) => write!(f, "{e}"),
            Self::Node(e) => write!(f, "node error: {e}"),
            Self::Corruption(msg) => write!(f, "tree corruption: {msg}"),
        }
    }
}

impl std::error::Error for BTreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Allocator(e) => Some(e),
            Self::Node(e) => Some(e),
            Self::Corruption(_) => None,
        }
    }
}

impl From<AllocatorError> for BTreeError {
    fn from(e: AllocatorError) -> Self {
        Self::Allocator(e)
    }
}

impl From<NodeError> for BTreeError {
    fn from(e: NodeError) -> Self {
        Self::Node(e)
    }
}

impl From<StoreError> for BTreeError {
    fn from(e: StoreError) -> Self {
        Self::Allocator(AllocatorError::Store(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::btree::node::{MAX_INTERNAL_KEYS, MAX_LEAF_KEYS};
    use crate::storage::memory::MemoryStore;
    use crate::storage::page::PAGE_SIZE_U64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn memory_tree() -> BTree<MemoryStore> {
        BTree::with_store(MemoryStore::new(), 64).expect("open tree")
    }

    #[test]
    fn test_empty_tree() {
        let mut tree = memory_tree();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.get(1).expect("get"), None);
        assert!(!tree.remove(1).expect("remove"));
    }

    #[test]
    fn test_first_put_creates_root_leaf() {
        let mut tree = memory_tree();
        tree.put(7, b"seven").expect("put");

        assert_eq!(tree.height(), 1);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.header().node_count, 1);
        assert_eq!(tree.get(7).expect("get"), Some(b"seven".to_vec()));
    }

    #[test]
    fn test_put_truncates_long_value() {
        let mut tree = memory_tree();
        let long = vec![b'z'; 200];
        tree.put(1, &long).expect("put");

        let stored = tree.get(1).expect("get").expect("present");
        assert_eq!(stored.len(), MAX_VALUE_LEN);
        assert_eq!(stored, long[..MAX_VALUE_LEN]);
    }

    #[test]
    fn test_leaf_split_links_siblings() {
        let mut tree = memory_tree();
        for key in 0..=MAX_LEAF_KEYS as u64 {
            tree.put(key, b"v").expect("put");
        }

        assert_eq!(tree.height(), 2);
        assert_eq!(tree.header().node_count, 3);

        let root = tree.internal(tree.header().root_page).expect("root");
        assert_eq!(root.keys(), vec![16]);
        let children = root.children();
        let left = tree.leaf(children[0]).expect("left");
        let right = tree.leaf(children[1]).expect("right");
        assert_eq!(left.key_count(), 16);
        assert_eq!(right.key_count(), 16);
        assert_eq!(left.next(), children[1]);
        assert_eq!(right.prev(), children[0]);
        assert_eq!(right.next(), NULL_PAGE);
    }

    #[test]
    fn test_internal_split_grows_height() {
        let mut tree = memory_tree();
        // Enough ascending keys to overflow the first internal root.
        let count = (MAX_INTERNAL_KEYS as u64 + 2) * 16 + 16;
        for key in 0..count {
            tree.put(key, &key.to_le_bytes()).expect("put");
        }

        assert_eq!(tree.height(), 3);
        tree.verify().expect("verify");
        for key in [0, count / 2, count - 1] {
            assert_eq!(
                tree.get(key).expect("get"),
                Some(key.to_le_bytes().to_vec())
            );
        }
    }

    #[test]
    fn test_remove_collapses_to_empty() {
        let mut tree = memory_tree();
        for key in 0..200u64 {
            tree.put(key, b"x").expect("put");
        }
        for key in 0..200u64 {
            assert!(tree.remove(key).expect("remove"), "key {key}");
        }

        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.header().node_count, 0);
        tree.verify().expect("verify");
    }

    #[test]
    fn test_remove_borrows_from_left_leaf() {
        let mut tree = memory_tree();
        // Left leaf gets 0..16, right leaf 16..32; fill left beyond minimum.
        for key in 0..32u64 {
            tree.put(key * 10, b"v").expect("put");
        }
        tree.put(5, b"v").expect("put");

        // Right leaf underflows and borrows from the 17-key left leaf.
        assert!(tree.remove(310).expect("remove"));

        let root = tree.internal(tree.header().root_page).expect("root");
        assert_eq!(root.keys(), vec![150]);
        tree.verify().expect("verify");
    }

    #[test]
    fn test_capacity_error_propagates() {
        let store = MemoryStore::with_limit(2 * PAGE_SIZE_U64);
        let mut tree = BTree::with_store(store, 1).expect("open");

        for key in 0..MAX_LEAF_KEYS as u64 {
            tree.put(key, b"v").expect("fits in root leaf");
        }
        let result = tree.put(1000, b"v");
        assert!(matches!(
            result,
            Err(BTreeError::Allocator(AllocatorError::Store(
                StoreError::CapacityExceeded { .. }
            )))
        ));
        assert_eq!(tree.get(5).expect("get"), Some(b"v".to_vec()));
    }

    #[test]
    fn test_corrupt_descent_reported() {
        let mut tree = memory_tree();
        for key in 0..40u64 {
            tree.put(key, b"v").expect("put");
        }
        tree.alloc.update_header(|h| h.height = 1);

        assert!(matches!(tree.get(3), Err(BTreeError::Corruption(_))));
    }

    /// Remove `keys` in order, verifying every 500 removals. Returns the
    /// `(height, internal_nodes)` seen at each checkpoint.
    fn drain_checked(tree: &mut BTree<MemoryStore>, keys: &[u64]) -> Vec<(u32, u64)> {
        let mut checkpoints = Vec::new();
        for (i, &key) in keys.iter().enumerate() {
            assert!(tree.remove(key).expect("remove"), "key {key} missing");
            if i % 500 == 0 {
                let summary = tree.verify().expect("verify");
                checkpoints.push((summary.height, summary.internal_nodes));
                if let Some(&next) = keys.get(i + 1) {
                    assert!(tree.get(next).expect("get").is_some());
                }
            }
        }
        assert!(tree.is_empty());
        tree.verify().expect("verify empty tree");
        checkpoints
    }

    fn three_level_tree(insert_order: &[u64]) -> (BTree<MemoryStore>, u64) {
        let mut tree = BTree::with_store(MemoryStore::new(), 1024).expect("open tree");
        for &key in insert_order {
            tree.put(key, &key.to_le_bytes()).expect("put");
        }
        let summary = tree.verify().expect("verify");
        assert_eq!(summary.height, 3);
        assert!(summary.internal_nodes > 2);
        (tree, summary.internal_nodes)
    }

    fn assert_internal_levels_collapse(checkpoints: &[(u32, u64)], internal_before: u64) {
        assert!(
            checkpoints
                .windows(2)
                .all(|w| w[1].0 <= w[0].0 && w[1].1 <= w[0].1),
            "tree grew while removing: {checkpoints:?}"
        );
        assert!(checkpoints.iter().any(|&(height, _)| height == 2));
        assert!(checkpoints.iter().any(|&(_, internal)| internal < internal_before));
        assert!(checkpoints.iter().any(|&(_, internal)| internal == 1));
    }

    const REBALANCE_KEYS: u64 = 40_000;

    #[test]
    fn test_internal_rebalance_shuffled() {
        let mut keys: Vec<u64> = (0..REBALANCE_KEYS).collect();
        keys.shuffle(&mut StdRng::seed_from_u64(11));
        let (mut tree, internal_before) = three_level_tree(&keys);

        keys.shuffle(&mut StdRng::seed_from_u64(12));
        let checkpoints = drain_checked(&mut tree, &keys);
        assert_internal_levels_collapse(&checkpoints, internal_before);
    }

    #[test]
    fn test_internal_rebalance_descending() {
        let mut keys: Vec<u64> = (0..REBALANCE_KEYS).collect();
        let (mut tree, internal_before) = three_level_tree(&keys);

        keys.reverse();
        let checkpoints = drain_checked(&mut tree, &keys);
        assert_internal_levels_collapse(&checkpoints, internal_before);
    }

    #[test]
    fn test_internal_rebalance_ascending() {
        let keys: Vec<u64> = (0..REBALANCE_KEYS).collect();
        let (mut tree, internal_before) = three_level_tree(&keys);

        let checkpoints = drain_checked(&mut tree, &keys);
        assert_internal_levels_collapse(&checkpoints, internal_before);
    }
}
