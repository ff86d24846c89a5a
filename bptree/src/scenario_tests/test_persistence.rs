//! Test that tree contents survive closing and reopening the file.

use crate::scenario_tests::helpers::{TestTree, shuffled_keys, value_for};
use crate::storage::{AllocatorError, BTree, BTreeError, HeaderError};

#[test]
fn test_round_trip_across_reopen() {
    let mut t = TestTree::new();
    for key in shuffled_keys(3_000, 3) {
        t.put_str(key, &value_for(key));
    }
    for key in (0..3_000).step_by(5) {
        t.put_str(key, "updated");
    }
    for key in (0..3_000).step_by(7) {
        t.tree.remove(key).expect("remove");
    }
    let header_before = *t.tree.header();

    t.reopen();

    assert_eq!(*t.tree.header(), header_before);
    for key in 0..3_000 {
        let expected = if key % 7 == 0 {
            None
        } else if key % 5 == 0 {
            Some("updated".to_string())
        } else {
            Some(value_for(key))
        };
        assert_eq!(t.get_string(key), expected, "key {key}");
    }
    t.tree.verify().expect("verify");
}

#[test]
fn test_reopened_tree_accepts_writes() {
    let mut t = TestTree::new();
    t.put_str(1, "one");
    t.reopen();

    t.put_str(2, "two");
    t.reopen();

    assert_eq!(t.get_string(1).as_deref(), Some("one"));
    assert_eq!(t.get_string(2).as_deref(), Some("two"));
}

#[test]
fn test_foreign_file_rejected() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("not-a-tree.bin");
    std::fs::write(&path, vec![0xAB; 8192]).expect("write file");

    let result = BTree::open(&path);
    assert!(matches!(
        result,
        Err(BTreeError::Allocator(AllocatorError::Header(
            HeaderError::InvalidMagic(_)
        )))
    ));
}
