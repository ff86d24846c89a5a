//! B+ tree node layouts.
//!
//! Nodes are views over the raw bytes of a page. A view borrows the page
//! (`&[u8]` for reads, `&mut [u8]` for writes) and is rebuilt whenever it is
//! needed, never stored. Every node page starts with the 64-byte
//! `PageHeader`; the payload follows:
//!
//! - Leaf: an array of 128-byte records sorted by key.
//! - Internal: `child[0]`, then `(key[i], child[i + 1])` pairs of 16 bytes.

#![allow(clippy::cast_possible_truncation)]

use crate::storage::page::{NULL_PAGE, PAGE_SIZE, PageBytes, PageHeader, PageId, PageType};

/// Longest value a leaf record can hold; longer values are truncated.
pub const MAX_VALUE_LEN: usize = 119;

/// Size of one leaf record slot: key (8) + length (1) + value (119).
pub const LEAF_RECORD_SIZE: usize = 128;

/// Size of one internal `(key, child)` pair.
const INTERNAL_ENTRY_SIZE: usize = 16;

/// Maximum records in a leaf.
pub const MAX_LEAF_KEYS: usize = 31;

/// Minimum records in a non-root leaf.
pub const MIN_LEAF_KEYS: usize = 16;

/// Maximum keys in an internal node.
pub const MAX_INTERNAL_KEYS: usize = 250;

/// Minimum keys in a non-root internal node.
pub const MIN_INTERNAL_KEYS: usize = 125;

const _: () = assert!(PageHeader::SIZE + MAX_LEAF_KEYS * LEAF_RECORD_SIZE <= PAGE_SIZE);
const _: () =
    assert!(PageHeader::SIZE + 8 + MAX_INTERNAL_KEYS * INTERNAL_ENTRY_SIZE <= PAGE_SIZE);

mod record_offsets {
    pub const KEY: usize = 0;
    pub const LEN: usize = 8;
    pub const VALUE: usize = 9;
}

/// A key/value record as stored in a leaf slot.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LeafRecord {
    pub key: u64,
    len: u8,
    value: [u8; MAX_VALUE_LEN],
}

impl LeafRecord {
    /// Build a record, keeping at most `MAX_VALUE_LEN` bytes of `value`.
    #[must_use]
    pub fn new(key: u64, value: &[u8]) -> Self {
        let len = value.len().min(MAX_VALUE_LEN);
        let mut buf = [0u8; MAX_VALUE_LEN];
        buf[..len].copy_from_slice(&value[..len]);
        Self {
            key,
            len: len as u8,
            value: buf,
        }
    }

    /// The stored value bytes.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value[..usize::from(self.len)]
    }

    fn read(slot: &[u8]) -> Self {
        let len = slot[record_offsets::LEN].min(MAX_VALUE_LEN as u8);
        let mut value = [0u8; MAX_VALUE_LEN];
        value.copy_from_slice(&slot[record_offsets::VALUE..LEAF_RECORD_SIZE]);
        Self {
            key: slot.read_u64(record_offsets::KEY),
            len,
            value,
        }
    }

    fn write(&self, slot: &mut [u8]) {
        slot.write_u64(record_offsets::KEY, self.key);
        slot[record_offsets::LEN] = self.len;
        slot[record_offsets::VALUE..LEAF_RECORD_SIZE].copy_from_slice(&self.value);
    }
}

impl std::fmt::Debug for LeafRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafRecord")
            .field("key", &self.key)
            .field("len", &self.len)
            .field("value", &String::from_utf8_lossy(self.value()))
            .finish()
    }
}

const fn record_range(index: usize) -> std::ops::Range<usize> {
    let start = PageHeader::SIZE + index * LEAF_RECORD_SIZE;
    start..start + LEAF_RECORD_SIZE
}

const FIRST_CHILD_OFFSET: usize = PageHeader::SIZE;

const fn internal_key_offset(index: usize) -> usize {
    PageHeader::SIZE + 8 + index * INTERNAL_ENTRY_SIZE
}

const fn internal_child_offset(index: usize) -> usize {
    if index == 0 {
        FIRST_CHILD_OFFSET
    } else {
        internal_key_offset(index - 1) + 8
    }
}

fn expect_kind(page: &[u8], expected: PageType) -> Result<(), NodeError> {
    match PageHeader::page_type(page) {
        Ok(found) if found == expected => Ok(()),
        Ok(found) => Err(NodeError::WrongNodeType { expected, found }),
        Err(byte) => Err(NodeError::InvalidNodeType(byte)),
    }
}

fn key_count(page: &[u8]) -> usize {
    usize::from(page.read_u16(PageHeader::KEY_COUNT_OFFSET))
}

fn set_key_count(page: &mut [u8], count: usize) {
    page.write_u16(PageHeader::KEY_COUNT_OFFSET, count as u16);
}

/// Reset the node header of `page` for a fresh node of `kind`.
fn init_header(page: &mut [u8], kind: PageType, parent: PageId) {
    page[..PageHeader::SIZE].fill(0);
    page[PageHeader::TYPE_OFFSET] = kind as u8;
    page.write_u64(PageHeader::PARENT_OFFSET, parent);
    page.write_u64(PageHeader::NEXT_LEAF_OFFSET, NULL_PAGE);
    page.write_u64(PageHeader::PREV_LEAF_OFFSET, NULL_PAGE);
}

/// Either kind of node, for code that only needs the shared header.
#[derive(Debug)]
pub enum Node<B> {
    Leaf(LeafNode<B>),
    Internal(InternalNode<B>),
}

impl<B: AsRef<[u8]>> Node<B> {
    /// Interpret a page as a node of whatever kind its header says.
    pub fn new(page: B) -> Result<Self, NodeError> {
        match PageHeader::page_type(page.as_ref()) {
            Ok(PageType::Leaf) => Ok(Self::Leaf(LeafNode { page })),
            Ok(PageType::Internal) => Ok(Self::Internal(InternalNode { page })),
            Ok(PageType::Free) => Err(NodeError::FreePage),
            Err(byte) => Err(NodeError::InvalidNodeType(byte)),
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Self::Leaf(leaf) => leaf.page.as_ref(),
            Self::Internal(internal) => internal.page.as_ref(),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        key_count(self.bytes())
    }

    #[must_use]
    pub fn parent(&self) -> PageId {
        self.bytes().read_u64(PageHeader::PARENT_OFFSET)
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Node<B> {
    pub fn set_parent(&mut self, parent: PageId) {
        let page = match self {
            Self::Leaf(leaf) => leaf.page.as_mut(),
            Self::Internal(internal) => internal.page.as_mut(),
        };
        page.write_u64(PageHeader::PARENT_OFFSET, parent);
    }
}

/// A leaf node: sorted records plus links to its neighbours.
#[derive(Debug)]
pub struct LeafNode<B> {
    page: B,
}

impl<B: AsRef<[u8]>> LeafNode<B> {
    /// Interpret `page` as a leaf, checking its type byte.
    pub fn new(page: B) -> Result<Self, NodeError> {
        expect_kind(page.as_ref(), PageType::Leaf)?;
        Ok(Self { page })
    }

    fn bytes(&self) -> &[u8] {
        self.page.as_ref()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        key_count(self.bytes())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.key_count() >= MAX_LEAF_KEYS
    }

    #[must_use]
    pub fn parent(&self) -> PageId {
        self.bytes().read_u64(PageHeader::PARENT_OFFSET)
    }

    /// Next leaf in key order, or `NULL_PAGE`.
    #[must_use]
    pub fn next(&self) -> PageId {
        self.bytes().read_u64(PageHeader::NEXT_LEAF_OFFSET)
    }

    /// Previous leaf in key order, or `NULL_PAGE`.
    #[must_use]
    pub fn prev(&self) -> PageId {
        self.bytes().read_u64(PageHeader::PREV_LEAF_OFFSET)
    }

    fn check_index(&self, index: usize) -> Result<(), NodeError> {
        let count = self.key_count();
        if index >= count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        Ok(())
    }

    pub fn record(&self, index: usize) -> Result<LeafRecord, NodeError> {
        self.check_index(index)?;
        Ok(LeafRecord::read(&self.bytes()[record_range(index)]))
    }

    pub fn key(&self, index: usize) -> Result<u64, NodeError> {
        self.check_index(index)?;
        Ok(self.bytes()[record_range(index)].read_u64(record_offsets::KEY))
    }

    /// Scan for `key` in ascending order.
    ///
    /// Returns `Ok(index)` if found, or `Err(index)` with the position the
    /// key would be inserted at.
    pub fn search(&self, key: u64) -> Result<usize, usize> {
        let page = self.bytes();
        for index in 0..self.key_count() {
            let found = page[record_range(index)].read_u64(record_offsets::KEY);
            if found == key {
                return Ok(index);
            }
            if found > key {
                return Err(index);
            }
        }
        Err(self.key_count())
    }

    /// All records in key order.
    #[must_use]
    pub fn records(&self) -> Vec<LeafRecord> {
        let page = self.bytes();
        (0..self.key_count())
            .map(|i| LeafRecord::read(&page[record_range(i)]))
            .collect()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> LeafNode<B> {
    /// Turn `page` into an empty, unlinked leaf.
    pub fn init(mut page: B, parent: PageId) -> Self {
        init_header(page.as_mut(), PageType::Leaf, parent);
        Self { page }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.page.as_mut()
    }

    pub fn set_parent(&mut self, parent: PageId) {
        self.bytes_mut().write_u64(PageHeader::PARENT_OFFSET, parent);
    }

    pub fn set_next(&mut self, next: PageId) {
        self.bytes_mut().write_u64(PageHeader::NEXT_LEAF_OFFSET, next);
    }

    pub fn set_prev(&mut self, prev: PageId) {
        self.bytes_mut().write_u64(PageHeader::PREV_LEAF_OFFSET, prev);
    }

    /// Overwrite the record at `index`.
    pub fn set_record(&mut self, index: usize, record: &LeafRecord) -> Result<(), NodeError> {
        self.check_index(index)?;
        record.write(&mut self.bytes_mut()[record_range(index)]);
        Ok(())
    }

    /// Insert `record` at `index`, shifting later records right.
    pub fn insert_at(&mut self, index: usize, record: &LeafRecord) -> Result<(), NodeError> {
        let count = self.key_count();
        if index > count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        if count >= MAX_LEAF_KEYS {
            return Err(NodeError::NodeFull);
        }

        let page = self.bytes_mut();
        page.copy_within(
            record_range(index).start..record_range(count).start,
            record_range(index + 1).start,
        );
        record.write(&mut page[record_range(index)]);
        set_key_count(page, count + 1);
        Ok(())
    }

    /// Remove and return the record at `index`, shifting later records left.
    pub fn remove_at(&mut self, index: usize) -> Result<LeafRecord, NodeError> {
        let record = self.record(index)?;
        let count = self.key_count();

        let page = self.bytes_mut();
        page.copy_within(
            record_range(index + 1).start..record_range(count).start,
            record_range(index).start,
        );
        page[record_range(count - 1)].fill(0);
        set_key_count(page, count - 1);
        Ok(record)
    }

    /// Append `record` after the last one.
    pub fn push(&mut self, record: &LeafRecord) -> Result<(), NodeError> {
        self.insert_at(self.key_count(), record)
    }

    /// Drop every record, keeping the header links.
    pub fn clear(&mut self) {
        let count = self.key_count();
        let page = self.bytes_mut();
        page[PageHeader::SIZE..record_range(count).start].fill(0);
        set_key_count(page, 0);
    }
}

/// An internal node: `n` separator keys and `n + 1` children.
///
/// `child[i]` holds keys `< key[i]`; `child[n]` holds keys `>= key[n - 1]`.
#[derive(Debug)]
pub struct InternalNode<B> {
    page: B,
}

impl<B: AsRef<[u8]>> InternalNode<B> {
    /// Interpret `page` as an internal node, checking its type byte.
    pub fn new(page: B) -> Result<Self, NodeError> {
        expect_kind(page.as_ref(), PageType::Internal)?;
        Ok(Self { page })
    }

    fn bytes(&self) -> &[u8] {
        self.page.as_ref()
    }

    #[must_use]
    pub fn key_count(&self) -> usize {
        key_count(self.bytes())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.key_count() >= MAX_INTERNAL_KEYS
    }

    #[must_use]
    pub fn parent(&self) -> PageId {
        self.bytes().read_u64(PageHeader::PARENT_OFFSET)
    }

    pub fn key(&self, index: usize) -> Result<u64, NodeError> {
        let count = self.key_count();
        if index >= count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        Ok(self.bytes().read_u64(internal_key_offset(index)))
    }

    /// Child at `index`; `index` may equal the key count.
    pub fn child(&self, index: usize) -> Result<PageId, NodeError> {
        let count = self.key_count();
        if index > count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        Ok(self.bytes().read_u64(internal_child_offset(index)))
    }

    /// Index of the child whose subtree may contain `key`: the first `i`
    /// with `key < key[i]`, or the key count if there is none.
    #[must_use]
    pub fn child_index_for(&self, key: u64) -> usize {
        let page = self.bytes();
        let count = self.key_count();
        (0..count)
            .find(|&i| key < page.read_u64(internal_key_offset(i)))
            .unwrap_or(count)
    }

    /// Position of `child` among this node's children.
    #[must_use]
    pub fn position_of_child(&self, child: PageId) -> Option<usize> {
        let page = self.bytes();
        (0..=self.key_count()).find(|&i| page.read_u64(internal_child_offset(i)) == child)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<u64> {
        let page = self.bytes();
        (0..self.key_count())
            .map(|i| page.read_u64(internal_key_offset(i)))
            .collect()
    }

    #[must_use]
    pub fn children(&self) -> Vec<PageId> {
        let page = self.bytes();
        (0..=self.key_count())
            .map(|i| page.read_u64(internal_child_offset(i)))
            .collect()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> InternalNode<B> {
    /// Turn `page` into an internal node with no keys and `child[0] = first_child`.
    pub fn init(mut page: B, parent: PageId, first_child: PageId) -> Self {
        let bytes = page.as_mut();
        init_header(bytes, PageType::Internal, parent);
        bytes.write_u64(FIRST_CHILD_OFFSET, first_child);
        Self { page }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        self.page.as_mut()
    }

    pub fn set_parent(&mut self, parent: PageId) {
        self.bytes_mut().write_u64(PageHeader::PARENT_OFFSET, parent);
    }

    pub fn set_key(&mut self, index: usize, key: u64) -> Result<(), NodeError> {
        let count = self.key_count();
        if index >= count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        self.bytes_mut().write_u64(internal_key_offset(index), key);
        Ok(())
    }

    pub fn set_child(&mut self, index: usize, child: PageId) -> Result<(), NodeError> {
        let count = self.key_count();
        if index > count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        self.bytes_mut().write_u64(internal_child_offset(index), child);
        Ok(())
    }

    /// Insert `key` at `index` with `right` as the child just after it.
    pub fn insert_at(&mut self, index: usize, key: u64, right: PageId) -> Result<(), NodeError> {
        let count = self.key_count();
        if index > count {
            return Err(NodeError::IndexOutOfRange { index, count });
        }
        if count >= MAX_INTERNAL_KEYS {
            return Err(NodeError::NodeFull);
        }

        let page = self.bytes_mut();
        page.copy_within(
            internal_key_offset(index)..internal_key_offset(count),
            internal_key_offset(index + 1),
        );
        page.write_u64(internal_key_offset(index), key);
        page.write_u64(internal_child_offset(index + 1), right);
        set_key_count(page, count + 1);
        Ok(())
    }

    /// Remove `key[index]` and `child[index + 1]`, returning both.
    pub fn remove_at(&mut self, index: usize) -> Result<(u64, PageId), NodeError> {
        let key = self.key(index)?;
        let count = self.key_count();
        let page = self.bytes_mut();
        let child = page.read_u64(internal_child_offset(index + 1));

        page.copy_within(
            internal_key_offset(index + 1)..internal_key_offset(count),
            internal_key_offset(index),
        );
        page[internal_key_offset(count - 1)..internal_key_offset(count)].fill(0);
        set_key_count(page, count - 1);
        Ok((key, child))
    }

    /// Append a `(key, child)` pair after the last one.
    pub fn push(&mut self, key: u64, child: PageId) -> Result<(), NodeError> {
        self.insert_at(self.key_count(), key, child)
    }

    /// Drop every key, leaving `child[0] = first_child`.
    pub fn clear(&mut self, first_child: PageId) {
        let count = self.key_count();
        let page = self.bytes_mut();
        page[internal_key_offset(0)..internal_key_offset(count)].fill(0);
        page.write_u64(FIRST_CHILD_OFFSET, first_child);
        set_key_count(page, 0);
    }
}

/// Errors from node operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Record, key or child index beyond the node's contents.
    IndexOutOfRange { index: usize, count: usize },
    /// Page holds a different kind of node.
    WrongNodeType { expected: PageType, found: PageType },
    /// Page type byte is not a known page type.
    InvalidNodeType(u8),
    /// Page is on the free list.
    FreePage,
    /// Node has no room for another entry.
    NodeFull,
}

impl std::fmt::Display for NodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, count } => {
                write!(f, "index {index} out of range for node with {count} keys")
            }
            Self::WrongNodeType { expected, found } => {
                write!(f, "expected {expected} node, found {found} page")
            }
            Self::InvalidNodeType(byte) => write!(f, "invalid node type byte: {byte:#04x}"),
            Self::FreePage => write!(f, "page is free, not a node"),
            Self::NodeFull => write!(f, "node is full"),
        }
    }
}

impl std::error::Error for NodeError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_page() -> Vec<u8> {
        vec![0u8; PAGE_SIZE]
    }

    fn leaf_with_keys(page: &mut [u8], keys: &[u64]) {
        let mut leaf = LeafNode::init(page, NULL_PAGE);
        for &key in keys {
            leaf.push(&LeafRecord::new(key, format!("v{key}").as_bytes()))
                .expect("push");
        }
    }

    #[test]
    fn test_record_truncates_long_values() {
        let long = vec![b'x'; 300];
        let record = LeafRecord::new(7, &long);
        assert_eq!(record.value().len(), MAX_VALUE_LEN);

        let short = LeafRecord::new(8, b"abc");
        assert_eq!(short.value(), b"abc");
    }

    #[test]
    fn test_leaf_insert_keeps_order() {
        let mut page = blank_page();
        leaf_with_keys(&mut page, &[10, 30]);

        let mut leaf = LeafNode::new(page.as_mut_slice()).expect("leaf");
        let pos = leaf.search(20).expect_err("absent");
        assert_eq!(pos, 1);
        leaf.insert_at(pos, &LeafRecord::new(20, b"v20")).expect("insert");

        let keys: Vec<_> = leaf.records().iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![10, 20, 30]);
        assert_eq!(leaf.record(1).expect("record").value(), b"v20");
        assert_eq!(leaf.search(30), Ok(2));
        assert_eq!(leaf.search(99), Err(3));
    }

    #[test]
    fn test_leaf_remove_shifts_left() {
        let mut page = blank_page();
        leaf_with_keys(&mut page, &[1, 2, 3, 4]);

        let mut leaf = LeafNode::new(page.as_mut_slice()).expect("leaf");
        let removed = leaf.remove_at(1).expect("remove");
        assert_eq!(removed.key, 2);
        assert_eq!(removed.value(), b"v2");

        let keys: Vec<_> = leaf.records().iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![1, 3, 4]);
        assert_eq!(
            leaf.remove_at(3),
            Err(NodeError::IndexOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn test_leaf_full_rejects_insert() {
        let mut page = blank_page();
        let keys: Vec<u64> = (0..MAX_LEAF_KEYS as u64).collect();
        leaf_with_keys(&mut page, &keys);

        let mut leaf = LeafNode::new(page.as_mut_slice()).expect("leaf");
        assert!(leaf.is_full());
        assert_eq!(
            leaf.push(&LeafRecord::new(1000, b"x")),
            Err(NodeError::NodeFull)
        );
        assert_eq!(
            leaf.key(MAX_LEAF_KEYS - 1).expect("last"),
            MAX_LEAF_KEYS as u64 - 1
        );
    }

    #[test]
    fn test_leaf_links_and_parent() {
        let mut page = blank_page();
        let mut leaf = LeafNode::init(page.as_mut_slice(), 9);
        assert_eq!(leaf.next(), NULL_PAGE);
        assert_eq!(leaf.prev(), NULL_PAGE);

        leaf.set_next(4);
        leaf.set_prev(2);
        leaf.set_parent(11);

        let node = Node::new(page.as_slice()).expect("node");
        assert!(node.is_leaf());
        assert_eq!(node.parent(), 11);
        let leaf = LeafNode::new(page.as_slice()).expect("leaf");
        assert_eq!((leaf.prev(), leaf.next()), (2, 4));
    }

    #[test]
    fn test_internal_insert_and_route() {
        let mut page = blank_page();
        let mut node = InternalNode::init(page.as_mut_slice(), NULL_PAGE, 100);
        node.insert_at(0, 50, 101).expect("insert");
        node.insert_at(0, 20, 102).expect("insert at front");
        node.insert_at(2, 80, 103).expect("insert at end");

        assert_eq!(node.keys(), vec![20, 50, 80]);
        assert_eq!(node.children(), vec![100, 102, 101, 103]);

        assert_eq!(node.child_index_for(5), 0);
        assert_eq!(node.child_index_for(20), 1);
        assert_eq!(node.child_index_for(49), 1);
        assert_eq!(node.child_index_for(50), 2);
        assert_eq!(node.child_index_for(1000), 3);

        assert_eq!(node.position_of_child(101), Some(2));
        assert_eq!(node.position_of_child(999), None);
    }

    #[test]
    fn test_internal_remove_pair() {
        let mut page = blank_page();
        let mut node = InternalNode::init(page.as_mut_slice(), NULL_PAGE, 1);
        node.push(10, 2).expect("push");
        node.push(20, 3).expect("push");
        node.push(30, 4).expect("push");

        assert_eq!(node.remove_at(1), Ok((20, 3)));
        assert_eq!(node.keys(), vec![10, 30]);
        assert_eq!(node.children(), vec![1, 2, 4]);

        assert_eq!(node.remove_at(0), Ok((10, 2)));
        assert_eq!(node.remove_at(0), Ok((30, 4)));
        assert_eq!(node.key_count(), 0);
        assert_eq!(node.child(0), Ok(1));
    }

    #[test]
    fn test_internal_bounds() {
        let mut page = blank_page();
        let mut node = InternalNode::init(page.as_mut_slice(), NULL_PAGE, 1);
        node.push(10, 2).expect("push");

        assert_eq!(node.child(1), Ok(2));
        assert_eq!(
            node.child(2),
            Err(NodeError::IndexOutOfRange { index: 2, count: 1 })
        );
        assert_eq!(
            node.key(1),
            Err(NodeError::IndexOutOfRange { index: 1, count: 1 })
        );
        assert!(node.set_child(1, 7).is_ok());
        assert!(node.set_key(1, 7).is_err());
    }

    #[test]
    fn test_internal_full() {
        let mut page = blank_page();
        let mut node = InternalNode::init(page.as_mut_slice(), NULL_PAGE, 0);
        for i in 0..MAX_INTERNAL_KEYS as u64 {
            node.push(i * 10, i + 1).expect("push");
        }
        assert!(node.is_full());
        assert_eq!(node.push(1_000_000, 9), Err(NodeError::NodeFull));
        assert_eq!(
            node.child(MAX_INTERNAL_KEYS),
            Ok(MAX_INTERNAL_KEYS as u64)
        );
    }

    #[test]
    fn test_wrong_node_type() {
        let mut page = blank_page();
        LeafNode::init(page.as_mut_slice(), NULL_PAGE);

        let result = InternalNode::new(page.as_slice());
        assert!(matches!(
            result,
            Err(NodeError::WrongNodeType {
                expected: PageType::Internal,
                found: PageType::Leaf
            })
        ));

        page[0] = 0x42;
        assert!(matches!(
            Node::new(page.as_slice()),
            Err(NodeError::InvalidNodeType(0x42))
        ));

        page[0] = PageType::Free as u8;
        assert!(matches!(
            Node::new(page.as_slice()),
            Err(NodeError::FreePage)
        ));
    }

    #[test]
    fn test_record_debug_shows_length() {
        let record = LeafRecord::new(4, b"four");
        assert_eq!(
            format!("{record:?}"),
            r#"LeafRecord { key: 4, len: 4, value: "four" }"#
        );
    }
}
