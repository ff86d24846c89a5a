//! Test that removing the only key empties the tree.

use crate::scenario_tests::helpers::TestTree;

#[test]
fn test_remove_last_key_empties_tree() {
    let mut t = TestTree::new();
    t.put_str(5, "only");

    assert!(t.tree.remove(5).expect("remove"));

    assert!(t.tree.is_empty());
    assert_eq!(t.tree.header().root(), None);
    assert_eq!(t.tree.height(), 0);
    assert_eq!(t.get_string(5), None);
    assert_eq!(t.get_string(6), None);
    t.tree.verify().expect("verify");
}

#[test]
fn test_tree_usable_after_emptying() {
    let mut t = TestTree::new();
    t.put_str(1, "a");
    t.tree.remove(1).expect("remove");

    t.put_str(2, "b");
    assert_eq!(t.get_string(2).as_deref(), Some("b"));
    assert_eq!(t.tree.height(), 1);
    t.tree.verify().expect("verify");
}
