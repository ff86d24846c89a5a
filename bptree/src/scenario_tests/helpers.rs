//! Common helpers for scenario tests.

use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tempfile::TempDir;

use crate::storage::{BTree, MappedFile};

/// A tree file in a scratch directory that is removed on drop.
pub struct TestTree {
    pub tree: BTree<MappedFile>,
    path: PathBuf,
    // Declared last so the tree is closed before the directory goes away.
    _dir: TempDir,
}

impl TestTree {
    /// Create a fresh, empty tree file.
    #[must_use]
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tree.db");
        let tree = BTree::open(&path).expect("Failed to create tree file");
        Self {
            tree,
            path,
            _dir: dir,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush the tree and open the file again.
    pub fn reopen(&mut self) {
        self.tree.flush().expect("Failed to flush tree");
        self.tree = BTree::open(&self.path).expect("Failed to reopen tree file");
    }

    pub fn put_str(&mut self, key: u64, value: &str) {
        self.tree.put(key, value.as_bytes()).expect("put failed");
    }

    #[must_use]
    pub fn get_string(&self, key: u64) -> Option<String> {
        self.tree
            .get(key)
            .expect("get failed")
            .map(|v| String::from_utf8(v).expect("value is not utf8"))
    }
}

/// Value stored for `key` in bulk scenarios.
#[must_use]
pub fn value_for(key: u64) -> String {
    format!("value-{key}")
}

/// Keys `0..count` in a deterministic shuffled order.
#[must_use]
pub fn shuffled_keys(count: u64, seed: u64) -> Vec<u64> {
    let mut keys: Vec<u64> = (0..count).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    keys.shuffle(&mut rng);
    keys
}
