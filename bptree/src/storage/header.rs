//! Tree header structure and serialization.
//!
//! The tree header occupies page 0 and contains metadata about the tree
//! file: format identification, the root page, the free list and the
//! global counters.

// PAGE_SIZE and the node orders are compile-time constants that fit their fields.
#![allow(clippy::cast_possible_truncation)]

use crate::storage::btree::{MAX_INTERNAL_KEYS, MAX_LEAF_KEYS};
use crate::storage::page::{NULL_PAGE, PAGE_SIZE, PageBytes, PageId};

/// Magic number identifying a tree file: "BPL1" read as a little-endian u32.
pub const MAGIC: u32 = 0x314C_5042;

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Page size as u32 for storage in the header.
const PAGE_SIZE_U32: u32 = PAGE_SIZE as u32;

/// Header field offsets.
mod offsets {
    pub const MAGIC: usize = 0;
    pub const FORMAT_VERSION: usize = 4;
    pub const PAGE_SIZE: usize = 8;
    pub const FLAGS: usize = 12;
    pub const ROOT_PAGE: usize = 16;
    pub const HEIGHT: usize = 24;
    pub const LEAF_ORDER: usize = 28;
    pub const INTERNAL_ORDER: usize = 30;
    pub const FREE_LIST_HEAD: usize = 32;
    pub const NEXT_PAGE_ID: usize = 40;
    pub const KEY_COUNT: usize = 48;
    pub const NODE_COUNT: usize = 56;
    /// CRC32 over bytes `0..CHECKSUM`.
    pub const CHECKSUM: usize = 64;
    // 68-4095: zero
}

/// The tree header contains all metadata about the tree file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TreeHeader {
    /// Format version number.
    pub format_version: u32,
    /// Page size in bytes (should always be `PAGE_SIZE`).
    pub page_size: u32,
    /// Reserved flags.
    pub flags: u32,
    /// Root page of the tree, `NULL_PAGE` when the tree is empty.
    pub root_page: PageId,
    /// Number of levels; 0 for an empty tree, 1 for a lone root leaf.
    pub height: u32,
    /// Maximum keys per leaf the file was built with.
    pub leaf_order: u16,
    /// Maximum keys per internal node the file was built with.
    pub internal_order: u16,
    /// Head of the free page list, `NULL_PAGE` when empty.
    pub free_list_head: PageId,
    /// First page id that has never been part of the file.
    pub next_page_id: PageId,
    /// Number of keys stored in the tree.
    pub key_count: u64,
    /// Number of live node pages.
    pub node_count: u64,
}

impl TreeHeader {
    /// Create a header for a fresh, empty tree file.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            page_size: PAGE_SIZE_U32,
            flags: 0,
            root_page: NULL_PAGE,
            height: 0,
            leaf_order: MAX_LEAF_KEYS as u16,
            internal_order: MAX_INTERNAL_KEYS as u16,
            free_list_head: NULL_PAGE,
            next_page_id: 1,
            key_count: 0,
            node_count: 0,
        }
    }

    /// Root page, if the tree is not empty.
    #[must_use]
    pub const fn root(&self) -> Option<PageId> {
        if self.root_page == NULL_PAGE {
            None
        } else {
            Some(self.root_page)
        }
    }

    /// Serialize the header into page 0.
    pub fn write_to_page(&self, page: &mut [u8]) {
        page.write_u32(offsets::MAGIC, MAGIC);
        page.write_u32(offsets::FORMAT_VERSION, self.format_version);
        page.write_u32(offsets::PAGE_SIZE, self.page_size);
        page.write_u32(offsets::FLAGS, self.flags);
        page.write_u64(offsets::ROOT_PAGE, self.root_page);
        page.write_u32(offsets::HEIGHT, self.height);
        page.write_u16(offsets::LEAF_ORDER, self.leaf_order);
        page.write_u16(offsets::INTERNAL_ORDER, self.internal_order);
        page.write_u64(offsets::FREE_LIST_HEAD, self.free_list_head);
        page.write_u64(offsets::NEXT_PAGE_ID, self.next_page_id);
        page.write_u64(offsets::KEY_COUNT, self.key_count);
        page.write_u64(offsets::NODE_COUNT, self.node_count);

        let checksum = compute_checksum(page);
        page.write_u32(offsets::CHECKSUM, checksum);
    }

    /// Deserialize and validate a header from page 0.
    pub fn from_page(page: &[u8]) -> Result<Self, HeaderError> {
        if page.len() < PAGE_SIZE {
            return Err(HeaderError::Truncated {
                file_size: page.len() as u64,
                expected: PAGE_SIZE as u64,
            });
        }

        let magic = page.read_u32(offsets::MAGIC);
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        let format_version = page.read_u32(offsets::FORMAT_VERSION);
        if format_version != FORMAT_VERSION {
            return Err(HeaderError::UnsupportedVersion(format_version));
        }

        let page_size = page.read_u32(offsets::PAGE_SIZE);
        if page_size != PAGE_SIZE_U32 {
            return Err(HeaderError::InvalidPageSize(page_size));
        }

        let expected = compute_checksum(page);
        let actual = page.read_u32(offsets::CHECKSUM);
        if expected != actual {
            return Err(HeaderError::ChecksumMismatch { expected, actual });
        }

        let leaf_order = page.read_u16(offsets::LEAF_ORDER);
        let internal_order = page.read_u16(offsets::INTERNAL_ORDER);
        if usize::from(leaf_order) != MAX_LEAF_KEYS
            || usize::from(internal_order) != MAX_INTERNAL_KEYS
        {
            return Err(HeaderError::UnsupportedOrder {
                leaf: leaf_order,
                internal: internal_order,
            });
        }

        Ok(Self {
            format_version,
            page_size,
            flags: page.read_u32(offsets::FLAGS),
            root_page: page.read_u64(offsets::ROOT_PAGE),
            height: page.read_u32(offsets::HEIGHT),
            leaf_order,
            internal_order,
            free_list_head: page.read_u64(offsets::FREE_LIST_HEAD),
            next_page_id: page.read_u64(offsets::NEXT_PAGE_ID),
            key_count: page.read_u64(offsets::KEY_COUNT),
            node_count: page.read_u64(offsets::NODE_COUNT),
        })
    }
}

impl Default for TreeHeader {
    fn default() -> Self {
        Self::new()
    }
}

fn compute_checksum(page: &[u8]) -> u32 {
    crc32fast::hash(&page[..offsets::CHECKSUM])
}

/// Errors that can occur when reading a tree header.
#[derive(Debug, PartialEq, Eq)]
pub enum HeaderError {
    /// Invalid magic number: not a tree file.
    InvalidMagic(u32),
    /// Unsupported format version.
    UnsupportedVersion(u32),
    /// Invalid page size.
    InvalidPageSize(u32),
    /// Header bytes do not match their checksum.
    ChecksumMismatch { expected: u32, actual: u32 },
    /// File was built with different node orders.
    UnsupportedOrder { leaf: u16, internal: u16 },
    /// File is shorter than the header says it should be.
    Truncated { file_size: u64, expected: u64 },
}

impl std::fmt::Display for HeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMagic(magic) => {
                write!(
                    f,
                    "file is not a BPL1 tree (magic {:?})",
                    String::from_utf8_lossy(&magic.to_le_bytes())
                )
            }
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::InvalidPageSize(s) => write!(f, "invalid page size: {s}"),
            Self::ChecksumMismatch { expected, actual } => {
                write!(
                    f,
                    "header checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
                )
            }
            Self::UnsupportedOrder { leaf, internal } => write!(
                f,
                "unsupported node orders: leaf {leaf}, internal {internal} (expected {MAX_LEAF_KEYS}, {MAX_INTERNAL_KEYS})"
            ),
            Self::Truncated {
                file_size,
                expected,
            } => write!(
                f,
                "file truncated: {file_size} bytes, header requires {expected}"
            ),
        }
    }
}

impl std::error::Error for HeaderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_roundtrip() {
        let mut header = TreeHeader::new();
        header.root_page = 5;
        header.height = 3;
        header.free_list_head = 17;
        header.next_page_id = 1025;
        header.key_count = 4_000;
        header.node_count = 150;

        let mut page = vec![0u8; PAGE_SIZE];
        header.write_to_page(&mut page);
        let restored = TreeHeader::from_page(&page).expect("should parse");

        assert_eq!(restored, header);
        assert_eq!(restored.root(), Some(5));
    }

    #[test]
    fn test_fresh_header_is_empty() {
        let header = TreeHeader::new();
        assert_eq!(header.root(), None);
        assert_eq!(header.height, 0);
        assert_eq!(header.free_list_head, NULL_PAGE);
        assert_eq!(header.next_page_id, 1);
    }

    #[test]
    fn test_header_invalid_magic() {
        let mut page = vec![0u8; PAGE_SIZE];
        page[..8].copy_from_slice(b"BADMAGIC");

        let result = TreeHeader::from_page(&page);
        assert!(matches!(result, Err(HeaderError::InvalidMagic(_))));
    }

    #[test]
    fn test_header_checksum_mismatch() {
        let mut page = vec![0u8; PAGE_SIZE];
        TreeHeader::new().write_to_page(&mut page);
        page[offsets::KEY_COUNT] ^= 0x01;

        let result = TreeHeader::from_page(&page);
        assert!(matches!(result, Err(HeaderError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_header_unsupported_version() {
        let mut page = vec![0u8; PAGE_SIZE];
        let mut header = TreeHeader::new();
        header.format_version = 2;
        header.write_to_page(&mut page);

        let result = TreeHeader::from_page(&page);
        assert_eq!(result, Err(HeaderError::UnsupportedVersion(2)));
    }

    #[test]
    fn test_header_short_page() {
        let result = TreeHeader::from_page(&[0u8; 100]);
        assert!(matches!(result, Err(HeaderError::Truncated { .. })));
    }
}
