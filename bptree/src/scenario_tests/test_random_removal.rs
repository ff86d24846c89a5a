//! Test deleting a random half of the keys keeps the tree balanced.

use std::collections::HashSet;

use crate::scenario_tests::helpers::{TestTree, shuffled_keys, value_for};

#[test]
fn test_remove_random_half() {
    let mut t = TestTree::new();
    let keys = shuffled_keys(2_000, 42);
    for &key in &keys {
        t.put_str(key, &value_for(key));
    }

    let removed: HashSet<u64> = shuffled_keys(2_000, 1337).into_iter().take(1_000).collect();
    for &key in &removed {
        assert!(t.tree.remove(key).expect("remove"), "key {key} should exist");
    }

    assert_eq!(t.tree.len(), 1_000);
    for key in 0..2_000 {
        if removed.contains(&key) {
            assert_eq!(t.get_string(key), None, "key {key} should be gone");
        } else {
            assert_eq!(t.get_string(key), Some(value_for(key)), "key {key}");
        }
    }
    t.tree.verify().expect("verify");
}

#[test]
fn test_remove_everything_in_random_order() {
    let mut t = TestTree::new();
    for key in 0..3_000 {
        t.put_str(key, &value_for(key));
    }

    for (i, key) in shuffled_keys(3_000, 9).into_iter().enumerate() {
        assert!(t.tree.remove(key).expect("remove"));
        if i % 500 == 0 {
            t.tree.verify().expect("verify mid-way");
        }
    }

    assert!(t.tree.is_empty());
    let summary = t.tree.verify().expect("verify");
    assert_eq!(summary.keys, 0);
    assert_eq!(t.tree.header().node_count, 0);
}

#[test]
fn test_freed_pages_are_reused() {
    let mut t = TestTree::new();
    for key in 0..2_000 {
        t.put_str(key, &value_for(key));
    }
    let pages_before = t.tree.header().next_page_id;

    for key in 0..2_000 {
        t.tree.remove(key).expect("remove");
    }
    for key in 0..2_000 {
        t.put_str(key, &value_for(key));
    }

    assert_eq!(t.tree.header().next_page_id, pages_before);
    t.tree.verify().expect("verify");
}
