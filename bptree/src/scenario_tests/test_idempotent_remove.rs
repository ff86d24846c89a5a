//! Test that removing an absent key changes nothing.

use crate::scenario_tests::helpers::{TestTree, value_for};

#[test]
fn test_remove_absent_key() {
    let mut t = TestTree::new();
    for key in (0..200).map(|k| k * 2) {
        t.put_str(key, &value_for(key));
    }
    let header_before = *t.tree.header();
    let dump_before = t.tree.dump_structure().expect("dump");

    assert!(!t.tree.remove(1).expect("remove"));
    assert!(!t.tree.remove(10_001).expect("remove"));

    assert_eq!(*t.tree.header(), header_before);
    assert_eq!(t.tree.dump_structure().expect("dump"), dump_before);
}

#[test]
fn test_double_remove() {
    let mut t = TestTree::new();
    t.put_str(1, "x");
    t.put_str(2, "y");

    assert!(t.tree.remove(1).expect("remove"));
    assert!(!t.tree.remove(1).expect("remove again"));
    assert_eq!(t.get_string(2).as_deref(), Some("y"));
}
