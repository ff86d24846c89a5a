//! Test that putting an existing key replaces its value.

use crate::scenario_tests::helpers::TestTree;

#[test]
fn test_update_overwrites_value() {
    let mut t = TestTree::new();

    t.put_str(100, "Old");
    t.put_str(100, "New");

    assert_eq!(t.get_string(100).as_deref(), Some("New"));
    assert_eq!(t.tree.len(), 1);
    let summary = t.tree.verify().expect("verify");
    assert_eq!(summary.keys, 1);
}

#[test]
fn test_update_after_split_keeps_single_record() {
    let mut t = TestTree::new();
    for key in 0..100 {
        t.put_str(key, "first");
    }
    for key in (0..100).step_by(3) {
        t.put_str(key, "second");
    }

    assert_eq!(t.tree.len(), 100);
    assert_eq!(t.get_string(99).as_deref(), Some("second"));
    assert_eq!(t.get_string(98).as_deref(), Some("first"));
    t.tree.verify().expect("verify");
}
