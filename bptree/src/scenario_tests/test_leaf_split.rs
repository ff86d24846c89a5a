//! Test that inserting more keys than a leaf holds splits it.

use crate::scenario_tests::helpers::{TestTree, value_for};

#[test]
fn test_fifty_keys_split_leaf() {
    let mut t = TestTree::new();
    for key in 0..50 {
        t.put_str(key, &value_for(key));
    }

    assert!(t.tree.height() >= 2);
    let summary = t.tree.verify().expect("verify");
    assert!(summary.leaves >= 2);
    for key in 0..50 {
        assert_eq!(t.get_string(key), Some(value_for(key)), "key {key}");
    }
}

#[test]
fn test_descending_inserts_split_leaf() {
    let mut t = TestTree::new();

    for key in (0..50).rev() {
        t.put_str(key, &value_for(key));
    }

    t.tree.verify().expect("verify");
    for key in 0..50 {
        assert_eq!(t.get_string(key), Some(value_for(key)), "key {key}");
    }
}
