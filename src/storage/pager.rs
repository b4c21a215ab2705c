//! Pager - owns the backing file and the in-memory page cache.
//!
//! The [`Pager`] handles all direct file operations:
//! - Loading pages on demand
//! - Allocating new page indices
//! - Flushing every allocated page back to disk on close

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::{PAGE_SIZE, TABLE_MAX_PAGES};
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages the single database file and its page cache.
///
/// # File Layout
/// The database is stored as a bare sequence of pages with no file header:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Page N lives at file offset `N × PAGE_SIZE`; page 0 is always the tree
/// root. Because the format has no header, a valid file length is always a
/// whole number of pages — anything else is treated as corruption at open.
///
/// # Caching
/// Pages are faulted in on first access and kept until [`Pager::close`];
/// there is no eviction. [`TABLE_MAX_PAGES`] bounds both the file and the
/// cache. Writes only reach the file during `close`, which flushes every
/// cached page in index order and syncs.
///
/// # Thread Safety
/// `Pager` is single-threaded by design; the engine above it never suspends
/// mid-operation.
pub struct Pager {
    file: File,
    /// Length of the file at open time. Unchanged until close, since all
    /// writes are deferred to the final flush.
    file_length: u64,
    /// Number of pages the database logically contains, counting pages that
    /// exist only in the cache so far.
    page_count: u32,
    cache: HashMap<u32, Box<Page>>,
}

impl Pager {
    /// Open the database file, creating it if it does not exist.
    ///
    /// # Errors
    /// Returns [`Error::Corrupt`] if the file length is not a multiple of
    /// the page size, and [`Error::Io`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;

        let file_length = file.metadata()?.len();
        if file_length % PAGE_SIZE as u64 != 0 {
            return Err(Error::Corrupt(file_length));
        }

        let page_count = (file_length / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            file_length,
            page_count,
            cache: HashMap::new(),
        })
    }

    /// Get a mutable view of page `id`, faulting it in on first access.
    ///
    /// If the file is long enough to contain the page it is read from disk;
    /// otherwise a zeroed page is handed out, which is semantically a newly
    /// allocated page. Accessing an index at or beyond the current page
    /// count extends the count.
    ///
    /// # Errors
    /// Returns [`Error::TableFull`] when `id` is at or beyond
    /// [`TABLE_MAX_PAGES`].
    pub fn get_page(&mut self, id: PageId) -> Result<&mut Page> {
        if id.0 >= TABLE_MAX_PAGES {
            return Err(Error::TableFull);
        }

        if id.0 >= self.page_count {
            self.page_count = id.0 + 1;
        }

        match self.cache.entry(id.0) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut page = Box::new(Page::new());
                let pages_on_disk = self.file_length / PAGE_SIZE as u64;
                if u64::from(id.0) < pages_on_disk {
                    self.file.seek(SeekFrom::Start(id.offset()))?;
                    self.file.read_exact(page.as_mut_slice())?;
                }
                Ok(entry.insert(page))
            }
        }
    }

    /// Return the next unused page index, extending the page count.
    ///
    /// Pages are allocated monotonically and never freed or reused.
    ///
    /// # Errors
    /// Returns [`Error::TableFull`] at the ceiling.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        if self.page_count >= TABLE_MAX_PAGES {
            return Err(Error::TableFull);
        }
        let id = PageId::new(self.page_count);
        self.page_count += 1;
        Ok(id)
    }

    /// Check that `n` further allocations would fit under the ceiling.
    ///
    /// Mutates nothing; the tree uses this to refuse a split cascade before
    /// it touches any page, keeping a failed insert byte-for-byte invisible.
    pub fn reserve(&self, n: u32) -> Result<()> {
        if self.page_count + n > TABLE_MAX_PAGES {
            return Err(Error::TableFull);
        }
        Ok(())
    }

    /// Number of pages the database currently contains.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Flush every cached page to its file offset, sync, and release the
    /// file handle.
    ///
    /// Pages below the page count that were never faulted in cannot differ
    /// from their on-disk bytes and are left untouched.
    pub fn close(mut self) -> Result<()> {
        for index in 0..self.page_count {
            if let Some(page) = self.cache.get(&index) {
                self.file.seek(SeekFrom::Start(PageId::new(index).offset()))?;
                self.file.write_all(page.as_slice())?;
            }
        }
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let pager = Pager::open(&path).unwrap();
        assert_eq!(pager.page_count(), 0);
    }

    #[test]
    fn test_get_page_hands_out_zeroed_page() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        let page = pager.get_page(PageId::ROOT).unwrap();
        assert_eq!(page.as_slice()[0], 0);
        assert_eq!(page.as_slice()[4095], 0);
        assert_eq!(pager.page_count(), 1);
    }

    #[test]
    fn test_allocate_is_monotonic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        pager.get_page(PageId::ROOT).unwrap();
        assert_eq!(pager.allocate_page().unwrap(), PageId::new(1));
        assert_eq!(pager.allocate_page().unwrap(), PageId::new(2));
        assert_eq!(pager.page_count(), 3);
    }

    #[test]
    fn test_close_persists_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            let page = pager.get_page(PageId::ROOT).unwrap();
            page.as_mut_slice()[0] = 0x42;
            page.as_mut_slice()[4095] = 0x24;
            pager.close().unwrap();
        }

        {
            let mut pager = Pager::open(&path).unwrap();
            assert_eq!(pager.page_count(), 1);
            let page = pager.get_page(PageId::ROOT).unwrap();
            assert_eq!(page.as_slice()[0], 0x42);
            assert_eq!(page.as_slice()[4095], 0x24);
        }
    }

    #[test]
    fn test_corrupt_length_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        std::fs::write(&path, vec![0u8; PAGE_SIZE + 17]).unwrap();

        match Pager::open(&path) {
            Err(Error::Corrupt(len)) => assert_eq!(len, PAGE_SIZE as u64 + 17),
            other => panic!("expected Corrupt error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_page_ceiling() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut pager = Pager::open(&path).unwrap();
        assert!(matches!(
            pager.get_page(PageId::new(TABLE_MAX_PAGES)),
            Err(Error::TableFull)
        ));

        assert!(pager.reserve(TABLE_MAX_PAGES).is_ok());
        assert!(matches!(
            pager.reserve(TABLE_MAX_PAGES + 1),
            Err(Error::TableFull)
        ));
    }

    #[test]
    fn test_only_touched_pages_are_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut pager = Pager::open(&path).unwrap();
            let page = pager.get_page(PageId::new(2)).unwrap();
            page.as_mut_slice()[0] = 0xAA;
            // pages 0 and 1 were never touched
            pager.close().unwrap();
        }

        // Writing page 2 extends the file through offset 3×4096; the
        // untouched leading pages read back as zeroes on the next open.
        let mut pager = Pager::open(&path).unwrap();
        assert_eq!(pager.page_count(), 3);
        assert_eq!(pager.get_page(PageId::ROOT).unwrap().as_slice()[0], 0);
        assert_eq!(pager.get_page(PageId::new(2)).unwrap().as_slice()[0], 0xAA);
    }
}
