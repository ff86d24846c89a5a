//! Page-file storage engine for the B+ tree.
//!
//! # File Format
//!
//! The tree is stored in a single file of 4KB pages:
//!
//! - Page 0: tree header (format identification, root, free list, counters)
//! - Pages 1-N: B+ tree nodes or free pages
//!
//! Free pages form a singly-linked list headed in the tree header. The file
//! grows in batches of pages when the list is exhausted.

pub mod btree;

mod allocator;
mod file;
mod header;
mod io;
mod memory;
mod page;

pub use allocator::{AllocatorError, DEFAULT_GROWTH_BATCH, PageAllocator};
pub use btree::{BTree, BTreeError, TreeStats, TreeSummary};
pub use file::MappedFile;
pub use header::{FORMAT_VERSION, HeaderError, MAGIC, TreeHeader};
pub use io::{PageStore, StoreError};
pub use memory::MemoryStore;
pub use page::{NULL_PAGE, PAGE_SIZE, PageId, PageType};
