//! Disk-resident B+ tree keyed by `u64`.
//!
//! # Structure
//!
//! The tree consists of:
//! - Internal nodes: separator keys and child page ids routing the descent
//! - Leaf nodes: fixed-size key/value records, doubly-linked in key order
//!
//! All nodes refer to each other by page id; the tree never keeps a view of
//! a page across an allocation.
//!
//! # Usage
//!
//! ```
//! use bptree::storage::{BTree, MemoryStore};
//!
//! let mut tree = BTree::with_store(MemoryStore::new(), 16).unwrap();
//! tree.put(42, b"answer").unwrap();
//!
//! assert_eq!(tree.get(42).unwrap(), Some(b"answer".to_vec()));
//! assert!(tree.remove(42).unwrap());
//! assert!(tree.is_empty());
//! ```

mod dump;
mod node;
mod tree;
mod verify;

pub use dump::TreeStats;
pub use node::{
    InternalNode, LEAF_RECORD_SIZE, LeafNode, LeafRecord, MAX_INTERNAL_KEYS, MAX_LEAF_KEYS,
    MAX_VALUE_LEN, MIN_INTERNAL_KEYS, MIN_LEAF_KEYS, Node, NodeError,
};
pub use tree::{BTree, BTreeError};
pub use verify::TreeSummary;
