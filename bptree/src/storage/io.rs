//! Storage abstraction over the raw bytes of the page file.
//!
//! This module provides a `PageStore` trait that abstracts over the backing
//! byte region, allowing the tree to run on a memory-mapped file in
//! production and on an in-memory buffer in tests.
//!
//! # Design
//!
//! The trait is a minimal view of a resizable mapping:
//! - The whole region as one contiguous byte slice
//! - Resize (grow the backing storage and remap)
//! - Flush to durable storage
//!
//! Any slice obtained from `bytes` or `bytes_mut` is invalidated by
//! `resize`; the borrow checker enforces this since `resize` takes
//! `&mut self`.

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StoreError {
    /// I/O error.
    Io(std::io::Error),
    /// Resize request beyond the store's capacity limit.
    CapacityExceeded { requested: u64, limit: u64 },
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::CapacityExceeded { requested, limit } => write!(
                f,
                "cannot grow store to {requested} bytes (limit: {limit} bytes)"
            ),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::CapacityExceeded { .. } => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstraction over a resizable, byte-addressable backing region.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `bytes` returns exactly `size()` bytes
/// - `resize` preserves the existing prefix and zero-fills new bytes
/// - `flush` makes all previous writes durable
pub trait PageStore {
    /// Current size of the region in bytes.
    fn size(&self) -> u64;

    /// The whole region.
    fn bytes(&self) -> &[u8];

    /// The whole region, mutably.
    fn bytes_mut(&mut self) -> &mut [u8];

    /// Grow (or shrink) the region to `new_size` bytes.
    fn resize(&mut self, new_size: u64) -> Result<(), StoreError>;

    /// Flush all writes to durable storage.
    fn flush(&mut self) -> Result<(), StoreError>;
}
