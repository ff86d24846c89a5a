//! In-memory page store for tests.
//!
//! Behaves like a mapped file that never reaches the disk. A capacity
//! limit can be set to make growth fail, which exercises the resource
//! error path of the allocator and the tree.

use crate::storage::io::{PageStore, StoreError};

/// A `Vec`-backed `PageStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Vec<u8>,
    limit: Option<u64>,
    flush_count: u64,
}

impl MemoryStore {
    /// Create an empty store with no capacity limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            limit: None,
            flush_count: 0,
        }
    }

    /// Create an empty store that refuses to grow past `limit` bytes.
    #[must_use]
    pub const fn with_limit(limit: u64) -> Self {
        Self {
            data: Vec::new(),
            limit: Some(limit),
            flush_count: 0,
        }
    }

    /// Wrap existing bytes, e.g. the contents of a previously used store.
    #[must_use]
    pub const fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            limit: None,
            flush_count: 0,
        }
    }

    /// Consume the store and return its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Number of times `flush` has been called.
    #[must_use]
    pub const fn flush_count(&self) -> u64 {
        self.flush_count
    }
}

impl PageStore for MemoryStore {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn bytes(&self) -> &[u8] {
        &self.data
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    fn resize(&mut self, new_size: u64) -> Result<(), StoreError> {
        if let Some(limit) = self.limit
            && new_size > limit
        {
            return Err(StoreError::CapacityExceeded {
                requested: new_size,
                limit,
            });
        }

        let new_len = usize::try_from(new_size).map_err(|_| StoreError::CapacityExceeded {
            requested: new_size,
            limit: usize::MAX as u64,
        })?;
        self.data.resize(new_len, 0);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flush_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resize_zero_fills_and_preserves_prefix() {
        let mut store = MemoryStore::new();
        store.resize(8).expect("resize");
        store.bytes_mut()[..4].copy_from_slice(b"abcd");

        store.resize(16).expect("grow");

        assert_eq!(store.size(), 16);
        assert_eq!(&store.bytes()[..4], b"abcd");
        assert!(store.bytes()[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_capacity_limit() {
        let mut store = MemoryStore::with_limit(100);
        store.resize(100).expect("within limit");

        let result = store.resize(101);
        assert!(matches!(
            result,
            Err(StoreError::CapacityExceeded {
                requested: 101,
                limit: 100
            })
        ));
        assert_eq!(store.size(), 100);
    }

    #[test]
    fn test_flush_is_counted() {
        let mut store = MemoryStore::new();
        store.flush().expect("flush");
        store.flush().expect("flush");
        assert_eq!(store.flush_count(), 2);
    }
}
