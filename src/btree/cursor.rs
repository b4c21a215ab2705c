//! Full-table scan over the ascending leaf chain.

use crate::btree::node::{self, InternalNode, LeafNode, NodeType};
use crate::btree::tree::BTree;
use crate::common::{PageId, Result};
use crate::row::Row;

/// Lazy, non-restartable traversal of every row in key order.
///
/// Starts at the leftmost leaf and follows next-leaf links; each step reads
/// the tree as it is at that moment (no isolation, none is needed —
/// the engine is single-threaded and the scan holds the tree exclusively).
pub struct Scan<'a> {
    tree: &'a mut BTree,
    page_id: PageId,
    cell: usize,
    done: bool,
}

impl<'a> Scan<'a> {
    pub(crate) fn start(tree: &'a mut BTree) -> Result<Self> {
        let mut page_id = PageId::ROOT;
        loop {
            let page = tree.pager.get_page(page_id)?;
            match node::node_type(page) {
                NodeType::Internal => page_id = InternalNode::new(page).child(0),
                NodeType::Leaf => {
                    let done = LeafNode::new(page).num_cells() == 0;
                    return Ok(Self {
                        tree,
                        page_id,
                        cell: 0,
                        done,
                    });
                }
            }
        }
    }
}

impl Iterator for Scan<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = match self.tree.pager.get_page(self.page_id) {
            Ok(page) => page,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };
        let leaf = LeafNode::new(page);
        let row = Row::deserialize(leaf.value(self.cell));

        self.cell += 1;
        if self.cell >= leaf.num_cells() as usize {
            match leaf.next_leaf() {
                Some(next) => {
                    self.page_id = next;
                    self.cell = 0;
                }
                None => self.done = true,
            }
        }
        Some(Ok(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_row(id: u32) -> Row {
        Row {
            id,
            username: format!("user{id}"),
            email: format!("person{id}@example.com"),
        }
    }

    #[test]
    fn test_empty_tree_scans_nothing() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::open(dir.path().join("test.db")).unwrap();
        assert_eq!(tree.scan().unwrap().count(), 0);
    }

    #[test]
    fn test_scan_crosses_leaf_boundaries() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::open(dir.path().join("test.db")).unwrap();
        // three leaves after two splits
        for id in 1..=21 {
            tree.insert(&sample_row(id)).unwrap();
        }

        let ids: Vec<u32> = tree.scan().unwrap().map(|r| r.unwrap().id).collect();
        assert_eq!(ids, (1..=21).collect::<Vec<_>>());
    }

    #[test]
    fn test_scan_is_lazy_and_finite() {
        let dir = tempdir().unwrap();
        let mut tree = BTree::open(dir.path().join("test.db")).unwrap();
        for id in 1..=5 {
            tree.insert(&sample_row(id)).unwrap();
        }

        let mut scan = tree.scan().unwrap();
        assert_eq!(scan.next().unwrap().unwrap().id, 1);
        assert_eq!(scan.next().unwrap().unwrap().id, 2);
        assert_eq!(scan.by_ref().count(), 3);
        assert!(scan.next().is_none());
    }
}
