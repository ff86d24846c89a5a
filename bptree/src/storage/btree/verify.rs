//! Structural invariant checks.

use std::collections::HashSet;

use crate::storage::btree::node::{
    MAX_INTERNAL_KEYS, MAX_LEAF_KEYS, MIN_INTERNAL_KEYS, MIN_LEAF_KEYS, Node,
};
use crate::storage::btree::tree::{BTree, BTreeError};
use crate::storage::io::PageStore;
use crate::storage::page::{NULL_PAGE, PageId};

/// Counts gathered by a successful `BTree::verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSummary {
    pub height: u32,
    pub keys: u64,
    pub leaves: u64,
    pub internal_nodes: u64,
    pub free_pages: u64,
}

impl std::fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "height={} keys={} leaves={} internal={} free={}",
            self.height, self.keys, self.leaves, self.internal_nodes, self.free_pages
        )
    }
}

/// Key range a subtree must stay within: `lower <= key < upper`.
#[derive(Clone, Copy)]
struct Bounds {
    lower: Option<u64>,
    upper: Option<u64>,
}

impl Bounds {
    fn contains(self, key: u64) -> bool {
        self.lower.is_none_or(|lower| key >= lower) && self.upper.is_none_or(|upper| key < upper)
    }
}

#[derive(Default)]
struct Walk {
    visited: HashSet<PageId>,
    leaves: Vec<PageId>,
    keys: u64,
    internal_nodes: u64,
}

const fn corruption(msg: String) -> BTreeError {
    BTreeError::Corruption(msg)
}

impl<S: PageStore> BTree<S> {
    /// Check every structural invariant of the tree and its page accounting.
    ///
    /// Any violation is reported as `BTreeError::Corruption`.
    pub fn verify(&self) -> Result<TreeSummary, BTreeError> {
        let header = *self.header();
        let free_pages = self.free_page_count()?;

        let mut walk = Walk::default();
        match header.root() {
            None => {
                if header.height != 0 || header.key_count != 0 {
                    return Err(corruption(format!(
                        "empty tree records height {} and {} keys",
                        header.height, header.key_count
                    )));
                }
            }
            Some(root) => {
                let bounds = Bounds {
                    lower: None,
                    upper: None,
                };
                self.verify_node(&mut walk, root, NULL_PAGE, 1, bounds)?;
                self.verify_leaf_chain(&walk.leaves)?;
            }
        }

        if walk.keys != header.key_count {
            return Err(corruption(format!(
                "header counts {} keys, tree holds {}",
                header.key_count, walk.keys
            )));
        }

        let nodes = walk.visited.len() as u64;
        if nodes != header.node_count {
            return Err(corruption(format!(
                "header counts {} nodes, tree holds {nodes}",
                header.node_count
            )));
        }

        if nodes + free_pages != header.next_page_id - 1 {
            return Err(corruption(format!(
                "{nodes} nodes and {free_pages} free pages do not account for {} pages",
                header.next_page_id - 1
            )));
        }

        Ok(TreeSummary {
            height: header.height,
            keys: walk.keys,
            leaves: walk.leaves.len() as u64,
            internal_nodes: walk.internal_nodes,
            free_pages,
        })
    }

    fn verify_node(
        &self,
        walk: &mut Walk,
        page_id: PageId,
        expected_parent: PageId,
        depth: u32,
        bounds: Bounds,
    ) -> Result<(), BTreeError> {
        let height = self.header().height;
        if !walk.visited.insert(page_id) {
            return Err(corruption(format!("page {page_id} is reachable twice")));
        }

        let node = self
            .node(page_id)
            .map_err(|e| corruption(format!("page {page_id} is not a node: {e}")))?;
        if node.parent() != expected_parent {
            return Err(corruption(format!(
                "page {page_id} records parent {}, expected {expected_parent}",
                node.parent()
            )));
        }

        let is_root = expected_parent == NULL_PAGE;
        let count = node.key_count();

        match node {
            Node::Leaf(leaf) => {
                if depth != height {
                    return Err(corruption(format!(
                        "leaf {page_id} at depth {depth}, tree height is {height}"
                    )));
                }
                let (min, max) = if is_root {
                    (1, MAX_LEAF_KEYS)
                } else {
                    (MIN_LEAF_KEYS, MAX_LEAF_KEYS)
                };
                if !(min..=max).contains(&count) {
                    return Err(corruption(format!(
                        "leaf {page_id} holds {count} keys, allowed {min}..={max}"
                    )));
                }

                let records = leaf.records();
                for (i, record) in records.iter().enumerate() {
                    if i > 0 && records[i - 1].key >= record.key {
                        return Err(corruption(format!("leaf {page_id} keys out of order")));
                    }
                    if !bounds.contains(record.key) {
                        return Err(corruption(format!(
                            "key {} in leaf {page_id} outside its parent range",
                            record.key
                        )));
                    }
                }

                walk.keys += count as u64;
                walk.leaves.push(page_id);
            }
            Node::Internal(internal) => {
                if depth >= height {
                    return Err(corruption(format!(
                        "internal page {page_id} at depth {depth}, tree height is {height}"
                    )));
                }
                let (min, max) = if is_root {
                    (1, MAX_INTERNAL_KEYS)
                } else {
                    (MIN_INTERNAL_KEYS, MAX_INTERNAL_KEYS)
                };
                if !(min..=max).contains(&count) {
                    return Err(corruption(format!(
                        "internal page {page_id} holds {count} keys, allowed {min}..={max}"
                    )));
                }

                let keys = internal.keys();
                let children = internal.children();
                for (i, &key) in keys.iter().enumerate() {
                    if i > 0 && keys[i - 1] >= key {
                        return Err(corruption(format!(
                            "internal page {page_id} keys out of order"
                        )));
                    }
                    if !bounds.contains(key) {
                        return Err(corruption(format!(
                            "separator {key} in page {page_id} outside its parent range"
                        )));
                    }
                }

                walk.internal_nodes += 1;
                for (i, &child) in children.iter().enumerate() {
                    let child_bounds = Bounds {
                        lower: if i == 0 { bounds.lower } else { Some(keys[i - 1]) },
                        upper: keys.get(i).copied().or(bounds.upper),
                    };
                    self.verify_node(walk, child, page_id, depth + 1, child_bounds)?;
                }
            }
        }
        Ok(())
    }

    /// Leaves found by the walk, left to right, must match the sibling links.
    fn verify_leaf_chain(&self, leaves: &[PageId]) -> Result<(), BTreeError> {
        for (i, &page_id) in leaves.iter().enumerate() {
            let leaf = self.leaf(page_id)?;
            let expected_prev = if i == 0 { NULL_PAGE } else { leaves[i - 1] };
            let expected_next = leaves.get(i + 1).copied().unwrap_or(NULL_PAGE);

            if leaf.prev() != expected_prev || leaf.next() != expected_next {
                return Err(corruption(format!(
                    "leaf {page_id} links prev={} next={}, expected prev={expected_prev} next={expected_next}",
                    leaf.prev(),
                    leaf.next()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::page::{PageBytes, PageHeader};

    fn tree_with_keys(count: u64) -> BTree<MemoryStore> {
        let mut tree = BTree::with_store(MemoryStore::new(), 32).expect("open tree");
        for key in 0..count {
            tree.put(key, b"v").expect("put");
        }
        tree
    }

    #[test]
    fn test_verify_empty_tree() {
        let tree = tree_with_keys(0);
        let summary = tree.verify().expect("verify");
        assert_eq!(summary.keys, 0);
        assert_eq!(summary.leaves, 0);
        assert_eq!(summary.free_pages, 0);
    }

    #[test]
    fn test_verify_summary() {
        let tree = tree_with_keys(100);
        let summary = tree.verify().expect("verify");

        assert_eq!(summary.height, 2);
        assert_eq!(summary.keys, 100);
        assert_eq!(summary.internal_nodes, 1);
        assert_eq!(summary.leaves + summary.internal_nodes, tree.header().node_count);
        assert_eq!(
            summary.to_string(),
            format!(
                "height=2 keys=100 leaves={} internal=1 free={}",
                summary.leaves, summary.free_pages
            )
        );
    }

    #[test]
    fn test_verify_detects_bad_parent() {
        let mut tree = tree_with_keys(40);
        let leaf = tree.internal(tree.header().root_page).expect("root").children()[1];
        tree.alloc
            .page_mut(leaf)
            .expect("page")
            .write_u64(PageHeader::PARENT_OFFSET, 999);

        assert!(matches!(tree.verify(), Err(BTreeError::Corruption(_))));
    }

    #[test]
    fn test_verify_detects_broken_leaf_chain() {
        let mut tree = tree_with_keys(40);
        let first = tree.internal(tree.header().root_page).expect("root").children()[0];
        tree.alloc
            .page_mut(first)
            .expect("page")
            .write_u64(PageHeader::NEXT_LEAF_OFFSET, NULL_PAGE);

        assert!(matches!(tree.verify(), Err(BTreeError::Corruption(_))));
    }

    #[test]
    fn test_verify_detects_key_count_drift() {
        let mut tree = tree_with_keys(10);
        tree.alloc.update_header(|h| h.key_count = 11);

        assert!(matches!(tree.verify(), Err(BTreeError::Corruption(_))));
    }
}
