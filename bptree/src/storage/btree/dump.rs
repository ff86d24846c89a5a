//! Human-readable tree statistics and structure dumps.

use crate::storage::btree::node::Node;
use crate::storage::btree::tree::{BTree, BTreeError};
use crate::storage::io::PageStore;
use crate::storage::page::{NULL_PAGE, PageId};

/// Values longer than this many characters are shortened in dumps.
const MAX_DUMP_VALUE_CHARS: usize = 16;

/// Snapshot of the tree header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    pub page_size: u32,
    pub height: u32,
    pub node_count: u64,
    pub key_count: u64,
    pub root_page: Option<PageId>,
    pub next_page_id: PageId,
    pub free_list_head: Option<PageId>,
}

impl std::fmt::Display for TreeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "--- B+ Tree Stats ---")?;
        writeln!(f, "Page Size: {}", self.page_size)?;
        writeln!(f, "Height:    {}", self.height)?;
        writeln!(f, "Nodes:     {}", self.node_count)?;
        writeln!(f, "Keys:      {}", self.key_count)?;
        writeln!(f, "Root Page: {}", PageLabel(self.root_page.unwrap_or(NULL_PAGE)))?;
        writeln!(f, "Next PID:  {}", self.next_page_id)?;
        write!(
            f,
            "Free Head: {}",
            PageLabel(self.free_list_head.unwrap_or(NULL_PAGE))
        )
    }
}

/// Page id that prints `none` for `NULL_PAGE`.
struct PageLabel(PageId);

impl std::fmt::Display for PageLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 == NULL_PAGE {
            write!(f, "none")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

fn shorten(value: &[u8]) -> String {
    let text = String::from_utf8_lossy(value);
    if text.chars().count() > MAX_DUMP_VALUE_CHARS {
        let mut short: String = text.chars().take(MAX_DUMP_VALUE_CHARS).collect();
        short.push_str("..");
        short
    } else {
        text.into_owned()
    }
}

impl<S: PageStore> BTree<S> {
    #[must_use]
    pub fn stats(&self) -> TreeStats {
        let header = self.header();
        TreeStats {
            page_size: header.page_size,
            height: header.height,
            node_count: header.node_count,
            key_count: header.key_count,
            root_page: header.root(),
            next_page_id: header.next_page_id,
            free_list_head: (header.free_list_head != NULL_PAGE).then_some(header.free_list_head),
        }
    }

    /// Render every node and record as an indented tree.
    ///
    /// ```text
    /// ROOT [3] (H=2)
    /// L-[INT 3] P:none Keys: 1
    ///    |-[LEAF 1] P:3 Next:2 Prev:none
    ///    |  |-[0] zero
    ///    ...
    /// ```
    pub fn dump_structure(&self) -> Result<String, BTreeError> {
        let mut out = String::new();
        let Some(root) = self.header().root() else {
            out.push_str("Empty Tree\n");
            return Ok(out);
        };

        out.push_str(&format!("ROOT [{root}] (H={})\n", self.header().height));
        self.dump_node(&mut out, root, "", true)?;
        Ok(out)
    }

    fn dump_node(
        &self,
        out: &mut String,
        page_id: PageId,
        prefix: &str,
        is_last: bool,
    ) -> Result<(), BTreeError> {
        let branch = if is_last { "L-" } else { "|-" };
        let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "|  " });

        match self.node(page_id)? {
            Node::Internal(node) => {
                out.push_str(&format!(
                    "{prefix}{branch}[INT {page_id}] P:{} Keys: {}\n",
                    PageLabel(node.parent()),
                    node.key_count()
                ));
                let children = node.children();
                let last = children.len() - 1;
                for (i, child) in children.into_iter().enumerate() {
                    self.dump_node(out, child, &child_prefix, i == last)?;
                }
            }
            Node::Leaf(leaf) => {
                out.push_str(&format!(
                    "{prefix}{branch}[LEAF {page_id}] P:{} Next:{} Prev:{}\n",
                    PageLabel(leaf.parent()),
                    PageLabel(leaf.next()),
                    PageLabel(leaf.prev())
                ));
                let records = leaf.records();
                for (i, record) in records.iter().enumerate() {
                    let branch = if i + 1 == records.len() { "L-" } else { "|-" };
                    out.push_str(&format!(
                        "{child_prefix}{branch}[{}] {}\n",
                        record.key,
                        shorten(record.value())
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    fn memory_tree() -> BTree<MemoryStore> {
        BTree::with_store(MemoryStore::new(), 16).expect("open tree")
    }

    #[test]
    fn test_stats_display() {
        let mut tree = memory_tree();
        tree.put(1, b"one").expect("put");
        tree.put(2, b"two").expect("put");

        let text = tree.stats().to_string();
        let expected = "--- B+ Tree Stats ---\n\
                        Page Size: 4096\n\
                        Height:    1\n\
                        Nodes:     1\n\
                        Keys:      2\n\
                        Root Page: 1\n\
                        Next PID:  17\n\
                        Free Head: 2";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_dump_empty_tree() {
        let tree = memory_tree();
        assert_eq!(tree.dump_structure().expect("dump"), "Empty Tree\n");
        assert_eq!(tree.stats().root_page, None);
    }

    #[test]
    fn test_dump_single_leaf() {
        let mut tree = memory_tree();
        tree.put(2, b"a value longer than sixteen chars").expect("put");
        tree.put(1, b"short").expect("put");

        let dump = tree.dump_structure().expect("dump");
        let expected = "ROOT [1] (H=1)\n\
                        L-[LEAF 1] P:none Next:none Prev:none\n   \
                        |-[1] short\n   \
                        L-[2] a value longer t..\n";
        assert_eq!(dump, expected);
    }

    #[test]
    fn test_dump_two_levels() {
        let mut tree = memory_tree();
        for key in 0..32u64 {
            tree.put(key, b"v").expect("put");
        }

        let dump = tree.dump_structure().expect("dump");
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "ROOT [3] (H=2)");
        assert_eq!(lines[1], "L-[INT 3] P:none Keys: 1");
        assert_eq!(lines[2], "   |-[LEAF 1] P:3 Next:2 Prev:none");
        assert_eq!(lines[3], "   |  |-[0] v");
        assert!(lines.contains(&"   L-[LEAF 2] P:3 Next:none Prev:1"));
        assert_eq!(lines.last().copied(), Some("      L-[31] v"));
    }
}
