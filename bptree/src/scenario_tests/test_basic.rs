//! Test basic put and get on a fresh tree file.

use crate::scenario_tests::helpers::TestTree;

#[test]
fn test_put_then_get() {
    let mut t = TestTree::new();

    t.put_str(1, "Value 1");
    t.put_str(2, "Value 2");

    assert_eq!(t.get_string(1).as_deref(), Some("Value 1"));
    assert_eq!(t.get_string(2).as_deref(), Some("Value 2"));
    assert_eq!(t.get_string(3), None);
    assert_eq!(t.tree.len(), 2);
}

#[test]
fn test_new_file_is_created_and_empty() {
    let t = TestTree::new();

    assert!(t.path().exists());
    assert!(t.tree.is_empty());
    assert_eq!(t.tree.height(), 0);
    assert_eq!(t.get_string(0), None);
}

#[test]
fn test_extreme_keys() {
    let mut t = TestTree::new();

    t.put_str(0, "zero");
    t.put_str(u64::MAX, "max");

    assert_eq!(t.get_string(0).as_deref(), Some("zero"));
    assert_eq!(t.get_string(u64::MAX).as_deref(), Some("max"));
    t.tree.verify().expect("verify");
}
