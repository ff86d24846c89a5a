//! Test that many inserts split internal nodes and grow the tree.

use crate::scenario_tests::helpers::{TestTree, shuffled_keys, value_for};

#[test]
fn test_ten_thousand_keys() {
    let mut t = TestTree::new();

    for key in 0..10_000 {
        t.put_str(key, &value_for(key));
    }

    assert!(t.tree.height() > 1);
    assert_eq!(t.tree.len(), 10_000);
    for key in [0, 5000, 9999] {
        assert_eq!(t.get_string(key), Some(value_for(key)));
    }
    let summary = t.tree.verify().expect("verify");
    assert!(summary.internal_nodes > 1, "expected an internal split");
}

#[test]
fn test_shuffled_inserts_stay_ordered() {
    let mut t = TestTree::new();

    for key in shuffled_keys(5_000, 7) {
        t.put_str(key, &value_for(key));
    }

    t.tree.verify().expect("verify");
    for key in (0..5_000).step_by(37) {
        assert_eq!(t.get_string(key), Some(value_for(key)));
    }
    assert_eq!(t.get_string(5_000), None);
}
