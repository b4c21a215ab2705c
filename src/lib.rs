//! SaplingDB - a single-table database persisted in a page-based B+tree.
//!
//! # Architecture
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │                       SaplingDB                        │
//! ├────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────┐    │
//! │  │          Command Processor (repl)              │    │
//! │  │    line → meta-command / statement → message   │    │
//! │  └────────────────────────────────────────────────┘    │
//! │                         ↓                              │
//! │  ┌────────────────────────────────────────────────┐    │
//! │  │           B+Tree Engine (btree/)               │    │
//! │  │     find · insert/split · scan · render        │    │
//! │  │      node layout over raw page bytes           │    │
//! │  └────────────────────────────────────────────────┘    │
//! │                         ↓                              │
//! │  ┌────────────────────────────────────────────────┐    │
//! │  │          Storage Layer (storage/)              │    │
//! │  │    Pager: file ⇄ 4KB pages, cache, ceiling     │    │
//! │  └────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! The persisted file is a bare sequence of 4KB pages; page 0 is always the
//! tree root, and all parent/child/sibling relationships are page indices,
//! so the structure survives a restart with zero translation.
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, Error, config)
//! - [`storage`] - The 4KB page and the pager that owns the backing file
//! - [`row`] - The fixed-schema record and its 293-byte codec
//! - [`btree`] - Node layout, the tree engine, and the scan cursor
//! - [`repl`] - The line-oriented command loop
//!
//! # Quick Start
//! ```no_run
//! use saplingdb::btree::BTree;
//! use saplingdb::row::Row;
//!
//! let mut table = BTree::open("my_database.db").unwrap();
//! table
//!     .insert(&Row {
//!         id: 1,
//!         username: "user1".into(),
//!         email: "person1@example.com".into(),
//!     })
//!     .unwrap();
//! for row in table.scan().unwrap() {
//!     println!("{}", row.unwrap());
//! }
//! table.close().unwrap();
//! ```

pub mod btree;
pub mod common;
pub mod repl;
pub mod row;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use btree::{BTree, Scan};
pub use common::config::PAGE_SIZE;
pub use common::{Error, PageId, Result};
pub use row::Row;
pub use storage::{Page, Pager};
