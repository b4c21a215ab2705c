//! The B+tree engine: search, insert with splits, and tree inspection.
//!
//! All structure lives in page bytes; this module only ever holds one page
//! view at a time, snapshotting what it needs before mutating, so a split is
//! a sequence of whole-node rewrites rather than C-style in-place aliasing.

use std::path::Path;

use crate::btree::cursor::Scan;
use crate::btree::node::{
    self, InternalNode, InternalNodeMut, LeafNode, LeafNodeMut, NodeType,
    INTERNAL_NODE_MAX_KEYS, LEAF_NODE_CELL_SIZE, LEAF_NODE_KEY_SIZE,
    LEAF_NODE_LEFT_SPLIT_COUNT, LEAF_NODE_MAX_CELLS,
};
use crate::common::{Error, PageId, Result};
use crate::row::Row;
use crate::storage::Pager;

/// The single-table B+tree over a [`Pager`].
///
/// Page 0 is always the root. A fresh database starts as one empty root
/// leaf; the tree grows strictly by splitting full nodes, promoting a new
/// root when the split reaches page 0. Height never decreases.
pub struct BTree {
    pub(crate) pager: Pager,
}

impl BTree {
    /// Open a database file, initializing an empty root leaf when the file
    /// is new.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut pager = Pager::open(path)?;
        if pager.page_count() == 0 {
            let page = pager.get_page(PageId::ROOT)?;
            let mut root = LeafNodeMut::init(page);
            root.set_root(true);
        }
        Ok(Self { pager })
    }

    /// Locate `key`: the leaf page that does or would contain it, and the
    /// cell slot within that leaf (the insertion point when absent).
    pub fn find(&mut self, key: u32) -> Result<(PageId, usize)> {
        let mut page_id = PageId::ROOT;
        loop {
            let page = self.pager.get_page(page_id)?;
            match node::node_type(page) {
                NodeType::Leaf => {
                    let slot = LeafNode::new(page).search(key).slot();
                    return Ok((page_id, slot));
                }
                NodeType::Internal => {
                    let internal = InternalNode::new(page);
                    page_id = internal.child(internal.find_child(key));
                }
            }
        }
    }

    /// Insert a row keyed by its id.
    ///
    /// # Errors
    /// [`Error::DuplicateKey`] when the id is already present, and
    /// [`Error::TableFull`] when the pages a split would need exceed the
    /// ceiling. Either way no page is modified.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let key = row.id;
        let (leaf_id, slot) = self.find(key)?;

        let page = self.pager.get_page(leaf_id)?;
        let leaf = LeafNode::new(page);
        let num_cells = leaf.num_cells() as usize;
        if slot < num_cells && leaf.key(slot) == key {
            return Err(Error::DuplicateKey(key));
        }

        if num_cells < LEAF_NODE_MAX_CELLS {
            let mut leaf = LeafNodeMut::new(self.pager.get_page(leaf_id)?);
            leaf.insert_cell(slot, key, row);
            return Ok(());
        }
        self.split_leaf(leaf_id, slot, key, row)
    }

    /// Ordered traversal over every row, leftmost leaf onward.
    pub fn scan(&mut self) -> Result<Scan<'_>> {
        Scan::start(self)
    }

    /// Flush all pages and release the backing file.
    pub fn close(self) -> Result<()> {
        self.pager.close()
    }

    /// Depth-first dump of the tree structure, one node or key per line.
    pub fn render(&mut self) -> Result<String> {
        let mut out = String::new();
        self.render_node(PageId::ROOT, 0, &mut out)?;
        Ok(out)
    }

    /// Split a full leaf to absorb `key`, then re-parent the new sibling.
    fn split_leaf(&mut self, leaf_id: PageId, slot: usize, key: u32, row: &Row) -> Result<()> {
        // Refuse up front if the cascade cannot fit under the page ceiling;
        // past this point every allocation is guaranteed to succeed.
        self.reserve_split_pages(leaf_id)?;

        // Snapshot the full leaf and merge the new cell in key order.
        let (was_root, parent_id, old_next, old_max, mut cells) = {
            let page = self.pager.get_page(leaf_id)?;
            let leaf = LeafNode::new(page);
            let cells: Vec<Vec<u8>> = (0..leaf.num_cells() as usize)
                .map(|i| leaf.cell(i).to_vec())
                .collect();
            (
                node::is_root(page),
                node::parent(page),
                leaf.next_leaf(),
                leaf.max_key(),
                cells,
            )
        };
        let mut new_cell = vec![0u8; LEAF_NODE_CELL_SIZE];
        new_cell[..LEAF_NODE_KEY_SIZE].copy_from_slice(&key.to_le_bytes());
        row.serialize(&mut new_cell[LEAF_NODE_KEY_SIZE..]);
        cells.insert(slot, new_cell);

        let new_leaf_id = self.pager.allocate_page()?;
        let split_key = cell_key(&cells[LEAF_NODE_LEFT_SPLIT_COUNT - 1]);

        // Left half rewrites the original leaf in place, keeping its header.
        {
            let mut leaf = LeafNodeMut::new(self.pager.get_page(leaf_id)?);
            for (i, cell) in cells[..LEAF_NODE_LEFT_SPLIT_COUNT].iter().enumerate() {
                leaf.cell_mut(i).copy_from_slice(cell);
            }
            leaf.set_num_cells(LEAF_NODE_LEFT_SPLIT_COUNT as u32);
            leaf.set_next_leaf(Some(new_leaf_id));
        }
        // Right half fills the fresh page and takes over the old successor.
        {
            let mut leaf = LeafNodeMut::init(self.pager.get_page(new_leaf_id)?);
            for (i, cell) in cells[LEAF_NODE_LEFT_SPLIT_COUNT..].iter().enumerate() {
                leaf.cell_mut(i).copy_from_slice(cell);
            }
            leaf.set_num_cells((cells.len() - LEAF_NODE_LEFT_SPLIT_COUNT) as u32);
            leaf.set_next_leaf(old_next);
            leaf.set_parent(parent_id);
        }

        if was_root {
            self.promote_root(new_leaf_id)
        } else {
            {
                let mut parent = InternalNodeMut::new(self.pager.get_page(parent_id)?);
                parent.update_key(old_max, split_key);
            }
            self.insert_into_internal(parent_id, new_leaf_id)
        }
    }

    /// Hang `child_id` off internal node `node_id`, splitting the node when
    /// it is already at capacity.
    fn insert_into_internal(&mut self, node_id: PageId, child_id: PageId) -> Result<()> {
        let child_max = self.node_max_key(child_id)?;
        let (num_keys, right_child) = {
            let node = InternalNode::new(self.pager.get_page(node_id)?);
            (node.num_keys() as usize, node.right_child())
        };
        if num_keys >= INTERNAL_NODE_MAX_KEYS {
            return self.split_internal(node_id, child_id);
        }

        let right_max = self.node_max_key(right_child)?;
        let mut node = InternalNodeMut::new(self.pager.get_page(node_id)?);
        if child_max > right_max {
            // The new child becomes the rightmost; the old rightmost child
            // moves into the pair array with its separator.
            node.set_pair(num_keys, right_child, right_max);
            node.set_num_keys(num_keys as u32 + 1);
            node.set_right_child(child_id);
        } else {
            let index = node.find_child(child_max);
            node.insert_pair(index, child_id, child_max);
        }
        Ok(())
    }

    /// Split an overfull internal node around its middle child and push the
    /// promoted separator one level up.
    fn split_internal(&mut self, node_id: PageId, extra_child_id: PageId) -> Result<()> {
        // Snapshot every child with its subtree maximum, rightmost included.
        let (was_root, parent_id, mut entries, right_child) = {
            let page = self.pager.get_page(node_id)?;
            let internal = InternalNode::new(page);
            let pairs: Vec<(PageId, u32)> = (0..internal.num_keys() as usize)
                .map(|i| (internal.child(i), internal.key(i)))
                .collect();
            (
                node::is_root(page),
                node::parent(page),
                pairs,
                internal.right_child(),
            )
        };
        let old_max = self.node_max_key(right_child)?;
        entries.push((right_child, old_max));

        let extra_max = self.node_max_key(extra_child_id)?;
        let pos = entries.partition_point(|&(_, max)| max < extra_max);
        entries.insert(pos, (extra_child_id, extra_max));

        // General split rule: the left node keeps the ceiling half of the
        // children, the promoted separator is its new subtree maximum.
        let left_children = entries.len().div_ceil(2);
        let split_key = entries[left_children - 1].1;

        let new_id = self.pager.allocate_page()?;

        {
            let mut internal = InternalNodeMut::new(self.pager.get_page(node_id)?);
            for (i, &(child, max)) in entries[..left_children - 1].iter().enumerate() {
                internal.set_pair(i, child, max);
            }
            internal.set_num_keys(left_children as u32 - 1);
            internal.set_right_child(entries[left_children - 1].0);
        }
        {
            let mut internal = InternalNodeMut::init(self.pager.get_page(new_id)?);
            let right = &entries[left_children..];
            for (i, &(child, max)) in right[..right.len() - 1].iter().enumerate() {
                internal.set_pair(i, child, max);
            }
            internal.set_num_keys(right.len() as u32 - 1);
            internal.set_right_child(right[right.len() - 1].0);
            internal.set_parent(parent_id);
        }

        // Every child now hangs off one of the two halves; the moved ones
        // (and the freshly split-in child) need their parent pointers fixed.
        for &(child, _) in &entries[..left_children] {
            node::set_parent(self.pager.get_page(child)?, node_id);
        }
        for &(child, _) in &entries[left_children..] {
            node::set_parent(self.pager.get_page(child)?, new_id);
        }

        if was_root {
            self.promote_root(new_id)
        } else {
            {
                let mut parent = InternalNodeMut::new(self.pager.get_page(parent_id)?);
                parent.update_key(old_max, split_key);
            }
            self.insert_into_internal(parent_id, new_id)
        }
    }

    /// Grow the tree by one level: relocate the old root's content to a
    /// fresh page and rewrite page 0 as an internal root over the two
    /// halves of the split.
    fn promote_root(&mut self, right_id: PageId) -> Result<()> {
        let left_id = self.pager.allocate_page()?;

        let root_bytes = self.pager.get_page(PageId::ROOT)?.as_slice().to_vec();
        {
            let page = self.pager.get_page(left_id)?;
            page.as_mut_slice().copy_from_slice(&root_bytes);
            node::set_is_root(page, false);
            node::set_parent(page, PageId::ROOT);
        }

        // Children of a relocated internal node must learn their new parent.
        let left_is_internal =
            node::node_type(self.pager.get_page(left_id)?) == NodeType::Internal;
        if left_is_internal {
            let children: Vec<PageId> = {
                let internal = InternalNode::new(self.pager.get_page(left_id)?);
                (0..=internal.num_keys() as usize)
                    .map(|i| internal.child(i))
                    .collect()
            };
            for child in children {
                node::set_parent(self.pager.get_page(child)?, left_id);
            }
        }

        let split_key = self.node_max_key(left_id)?;
        {
            let page = self.pager.get_page(PageId::ROOT)?;
            let mut root = InternalNodeMut::init(page);
            root.set_root(true);
            root.set_pair(0, left_id, split_key);
            root.set_num_keys(1);
            root.set_right_child(right_id);
        }
        node::set_parent(self.pager.get_page(right_id)?, PageId::ROOT);
        Ok(())
    }

    /// Pages a split cascade starting at `leaf_id` will allocate: one new
    /// sibling per full node on the ancestor path, plus one relocation page
    /// when the cascade reaches the root.
    fn reserve_split_pages(&mut self, leaf_id: PageId) -> Result<()> {
        let mut needed = 1u32;
        let mut node_id = leaf_id;
        loop {
            let page = self.pager.get_page(node_id)?;
            if node::is_root(page) {
                needed += 1;
                break;
            }
            let parent_id = node::parent(page);
            let parent_full = {
                let parent = InternalNode::new(self.pager.get_page(parent_id)?);
                parent.num_keys() as usize >= INTERNAL_NODE_MAX_KEYS
            };
            if !parent_full {
                break;
            }
            needed += 1;
            node_id = parent_id;
        }
        self.pager.reserve(needed)
    }

    /// Largest key under `page_id`: rightmost descent to a leaf.
    fn node_max_key(&mut self, page_id: PageId) -> Result<u32> {
        let mut page_id = page_id;
        loop {
            let page = self.pager.get_page(page_id)?;
            match node::node_type(page) {
                NodeType::Leaf => return Ok(LeafNode::new(page).max_key()),
                NodeType::Internal => page_id = InternalNode::new(page).right_child(),
            }
        }
    }

    fn render_node(&mut self, page_id: PageId, depth: usize, out: &mut String) -> Result<()> {
        enum Snapshot {
            Leaf(Vec<u32>),
            Internal(Vec<(PageId, u32)>, PageId),
        }
        let snapshot = {
            let page = self.pager.get_page(page_id)?;
            match node::node_type(page) {
                NodeType::Leaf => {
                    let leaf = LeafNode::new(page);
                    Snapshot::Leaf((0..leaf.num_cells() as usize).map(|i| leaf.key(i)).collect())
                }
                NodeType::Internal => {
                    let internal = InternalNode::new(page);
                    Snapshot::Internal(
                        (0..internal.num_keys() as usize)
                            .map(|i| (internal.child(i), internal.key(i)))
                            .collect(),
                        internal.right_child(),
                    )
                }
            }
        };

        let indent = "  ".repeat(depth);
        match snapshot {
            Snapshot::Leaf(keys) => {
                out.push_str(&format!("{indent}- leaf (size {})\n", keys.len()));
                for key in keys {
                    out.push_str(&format!("{indent}  - {key}\n"));
                }
            }
            Snapshot::Internal(pairs, right_child) => {
                out.push_str(&format!("{indent}- internal (size {})\n", pairs.len()));
                for (child, key) in pairs {
                    self.render_node(child, depth + 1, out)?;
                    out.push_str(&format!("{indent}  - key {key}\n"));
                }
                self.render_node(right_child, depth + 1, out)?;
            }
        }
        Ok(())
    }
}

fn cell_key(cell: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&cell[..LEAF_NODE_KEY_SIZE]);
    u32::from_le_bytes(buf)
}
