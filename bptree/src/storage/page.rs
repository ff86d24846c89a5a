//! Page types and constants for the page file.
//!
//! The tree file is an array of 4KB pages. Page 0 holds the tree header;
//! every other page starts with a 64-byte node header whose first byte is
//! the page type.

/// Page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Page size as u64 for offset calculations.
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// A page identifier (0-indexed page number).
pub type PageId = u64;

/// Sentinel page id meaning "no page".
pub const NULL_PAGE: PageId = u64::MAX;

/// Page type identifiers stored in byte 0 of every non-header page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageType {
    /// B+ tree internal node
    Internal = 0x00,
    /// B+ tree leaf node
    Leaf = 0x01,
    /// Free page (on free list)
    Free = 0xFF,
}

impl TryFrom<u8> for PageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Internal),
            0x01 => Ok(Self::Leaf),
            0xFF => Ok(Self::Free),
            _ => Err(value),
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::Leaf => write!(f, "leaf"),
            Self::Free => write!(f, "free"),
        }
    }
}

/// Common header present at the start of every non-header page.
///
/// Layout:
/// - `page_type`: 1 byte
/// - `reserved`: 1 byte
/// - `key_count`: 2 bytes
/// - `align`: 4 bytes
/// - `parent`: 8 bytes (free pages store the next free page here)
/// - `next_leaf`: 8 bytes
/// - `prev_leaf`: 8 bytes
/// - `padding`: 32 bytes
///
/// Total: 64 bytes
pub struct PageHeader;

impl PageHeader {
    /// Size of the page header in bytes.
    pub const SIZE: usize = 64;

    pub const TYPE_OFFSET: usize = 0;
    pub const KEY_COUNT_OFFSET: usize = 2;
    pub const PARENT_OFFSET: usize = 8;
    pub const NEXT_FREE_OFFSET: usize = 8;
    pub const NEXT_LEAF_OFFSET: usize = 16;
    pub const PREV_LEAF_OFFSET: usize = 24;

    /// Read the page type byte.
    pub fn page_type(page: &[u8]) -> Result<PageType, u8> {
        PageType::try_from(page[Self::TYPE_OFFSET])
    }
}

/// Little-endian field access over raw page bytes.
pub trait PageBytes {
    fn read_u16(&self, offset: usize) -> u16;
    fn read_u32(&self, offset: usize) -> u32;
    fn read_u64(&self, offset: usize) -> u64;
    fn write_u16(&mut self, offset: usize, value: u16);
    fn write_u32(&mut self, offset: usize, value: u32);
    fn write_u64(&mut self, offset: usize, value: u64);
}

impl PageBytes for [u8] {
    fn read_u16(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self[offset], self[offset + 1]])
    }

    fn read_u32(&self, offset: usize) -> u32 {
        u32::from_le_bytes([
            self[offset],
            self[offset + 1],
            self[offset + 2],
            self[offset + 3],
        ])
    }

    fn read_u64(&self, offset: usize) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self[offset..offset + 8]);
        u64::from_le_bytes(buf)
    }

    fn write_u16(&mut self, offset: usize, value: u16) {
        self[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, offset: usize, value: u32) {
        self[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, offset: usize, value: u64) {
        self[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }
}

/// Byte range of a page inside the page file.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // page ids are bounds-checked against the mapped length
pub const fn page_range(page_id: PageId) -> std::ops::Range<usize> {
    let start = page_id as usize * PAGE_SIZE;
    start..start + PAGE_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_read_write() {
        let mut page = vec![0u8; PAGE_SIZE];

        page.write_u16(2, 0xBEEF);
        assert_eq!(page.read_u16(2), 0xBEEF);

        page.write_u32(100, 0x1234_5678);
        assert_eq!(page.read_u32(100), 0x1234_5678);

        page.write_u64(200, 0x0102_0304_0506_0708);
        assert_eq!(page.read_u64(200), 0x0102_0304_0506_0708);
        assert_eq!(page[200], 0x08, "fields are little-endian");
    }

    #[test]
    fn test_page_type_conversion() {
        assert_eq!(PageType::try_from(0x00), Ok(PageType::Internal));
        assert_eq!(PageType::try_from(0x01), Ok(PageType::Leaf));
        assert_eq!(PageType::try_from(0xFF), Ok(PageType::Free));
        assert_eq!(PageType::try_from(0x07), Err(0x07));
    }

    #[test]
    fn test_page_range() {
        assert_eq!(page_range(0), 0..PAGE_SIZE);
        assert_eq!(page_range(3), 3 * PAGE_SIZE..4 * PAGE_SIZE);
    }
}
