//! Storage layer: the 4KB page and the pager that owns the backing file.

pub mod page;
pub mod pager;

pub use page::Page;
pub use pager::Pager;
