//! Memory-mapped page file.
//!
//! The whole file is mapped read-write. Growing the file drops the mapping,
//! extends the file and maps it again, so the base address may change on
//! every resize.

// Mapping a file is inherently unsafe: the mapping aliases the file, and any
// other writer of the same file could change the bytes under us. The tree
// assumes exclusive single-process access to its file.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::storage::io::{PageStore, StoreError};

/// A read-write memory mapping of a whole file.
#[derive(Debug)]
pub struct MappedFile {
    file: File,
    /// `None` while the file is empty (a zero-length file cannot be mapped).
    map: Option<MmapMut>,
    path: PathBuf,
}

impl MappedFile {
    /// Open the file at `path`, creating an empty one if it does not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let len = file.metadata()?.len();
        let map = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().map_mut(&file)? })
        };

        tracing::debug!(path = %path.display(), len, "mapped page file");

        Ok(Self {
            file,
            map,
            path: path.to_path_buf(),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PageStore for MappedFile {
    fn size(&self) -> u64 {
        self.map.as_ref().map_or(0, |map| map.len() as u64)
    }

    fn bytes(&self) -> &[u8] {
        match &self.map {
            Some(map) => &map[..],
            None => &[],
        }
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.map {
            Some(map) => &mut map[..],
            None => &mut [],
        }
    }

    fn resize(&mut self, new_size: u64) -> Result<(), StoreError> {
        // Drop the current mapping before touching the file length.
        if let Some(map) = self.map.take() {
            map.flush()?;
        }

        self.file.set_len(new_size)?;

        if new_size > 0 {
            self.map = Some(unsafe { MmapOptions::new().map_mut(&self.file)? });
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if let Some(map) = &self.map {
            map.flush()?;
        }
        self.file.sync_all()?;
        Ok(())
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(path = %self.path.display(), "failed to flush page file on close: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("new.db");

        let file = MappedFile::open(&path).expect("open");

        assert!(path.exists());
        assert_eq!(file.size(), 0);
        assert!(file.bytes().is_empty());
    }

    #[test]
    fn test_resize_and_write() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("grow.db");

        let mut file = MappedFile::open(&path).expect("open");
        file.resize(4096).expect("resize");
        file.bytes_mut()[0..5].copy_from_slice(b"hello");

        file.resize(8192).expect("grow");
        assert_eq!(file.size(), 8192);
        assert_eq!(&file.bytes()[0..5], b"hello");
        assert!(file.bytes()[4096..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_contents_survive_reopen() {
        let dir = tempdir().expect("create temp dir");
        let path = dir.path().join("reopen.db");

        {
            let mut file = MappedFile::open(&path).expect("open");
            file.resize(4096).expect("resize");
            file.bytes_mut()[100..104].copy_from_slice(b"BPL1");
            file.flush().expect("flush");
        }

        let file = MappedFile::open(&path).expect("reopen");
        assert_eq!(file.size(), 4096);
        assert_eq!(&file.bytes()[100..104], b"BPL1");
    }
}
