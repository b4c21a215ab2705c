//! Error types for SaplingDB.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in the storage engine.
///
/// The REPL layer has its own statement-preparation errors; everything that
/// can go wrong below the statement boundary is one of these.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The database file length is not a whole number of pages.
    ///
    /// The persisted format is a bare sequence of 4096-byte pages, so any
    /// other length means the file was truncated or corrupted.
    #[error("database file is {0} bytes, which is not a whole number of pages")]
    Corrupt(u64),

    /// The key being inserted is already present in the tree.
    #[error("duplicate key {0}")]
    DuplicateKey(u32),

    /// The page ceiling was reached; no further rows can be stored.
    #[error("table full")]
    TableFull,
}

impl Error {
    /// True when the persisted store can no longer be trusted and the
    /// process should stop instead of continuing the command loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DuplicateKey(42);
        assert_eq!(format!("{}", err), "duplicate key 42");

        let err = Error::TableFull;
        assert_eq!(format!("{}", err), "table full");

        let err = Error::Corrupt(4100);
        assert_eq!(
            format!("{}", err),
            "database file is 4100 bytes, which is not a whole number of pages"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::Corrupt(1).is_fatal());
        assert!(!Error::DuplicateKey(1).is_fatal());
        assert!(!Error::TableFull.is_fatal());
    }
}
