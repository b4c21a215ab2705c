//! The paged B+tree: node layout, engine, and scan cursor.

pub mod cursor;
pub mod node;
pub mod tree;

pub use cursor::Scan;
pub use tree::BTree;
