//! The one supported record shape and its fixed-width codec.

use std::fmt;

/// Maximum byte length of the `username` column.
pub const USERNAME_MAX_LEN: usize = 32;
/// Maximum byte length of the `email` column.
pub const EMAIL_MAX_LEN: usize = 255;

const ID_SIZE: usize = 4;
// Each text field carries one terminator byte past its maximum length.
const USERNAME_FIELD_SIZE: usize = USERNAME_MAX_LEN + 1;
const EMAIL_FIELD_SIZE: usize = EMAIL_MAX_LEN + 1;

const ID_OFFSET: usize = 0;
const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_FIELD_SIZE;

/// Serialized size of a row in bytes.
///
/// # Layout (293 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     id (u32, little-endian)
/// 4       33    username (zero-padded, terminator byte included)
/// 37      256   email    (zero-padded, terminator byte included)
/// ```
pub const ROW_SIZE: usize = ID_SIZE + USERNAME_FIELD_SIZE + EMAIL_FIELD_SIZE;

/// A row of the single fixed-schema table.
///
/// The codec performs no length validation; the command processor rejects
/// over-long strings before a `Row` is ever constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    /// Pack this row into `out`, which must hold at least [`ROW_SIZE`] bytes.
    ///
    /// Text fields are left-justified and zero-padded through their
    /// terminator byte.
    ///
    /// # Panics
    /// Panics if `out` is too small or a field exceeds its column width
    /// (a caller-side validation bug).
    pub fn serialize(&self, out: &mut [u8]) {
        assert!(out.len() >= ROW_SIZE, "buffer too small for Row");

        out[ID_OFFSET..ID_OFFSET + ID_SIZE].copy_from_slice(&self.id.to_le_bytes());
        write_text(
            &mut out[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE],
            self.username.as_bytes(),
        );
        write_text(
            &mut out[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE],
            self.email.as_bytes(),
        );
    }

    /// Read a row back out of its serialized form.
    ///
    /// Text fields are read up to their terminator byte or full width.
    ///
    /// # Panics
    /// Panics if `src` is shorter than [`ROW_SIZE`].
    pub fn deserialize(src: &[u8]) -> Self {
        assert!(src.len() >= ROW_SIZE, "buffer too small for Row");

        let mut id_bytes = [0u8; ID_SIZE];
        id_bytes.copy_from_slice(&src[ID_OFFSET..ID_OFFSET + ID_SIZE]);

        Self {
            id: u32::from_le_bytes(id_bytes),
            username: read_text(&src[USERNAME_OFFSET..USERNAME_OFFSET + USERNAME_FIELD_SIZE]),
            email: read_text(&src[EMAIL_OFFSET..EMAIL_OFFSET + EMAIL_FIELD_SIZE]),
        }
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

fn write_text(dst: &mut [u8], src: &[u8]) {
    dst.fill(0);
    dst[..src.len()].copy_from_slice(src);
}

fn read_text(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u32, username: &str, email: &str) -> Row {
        Row {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    #[test]
    fn test_row_size() {
        assert_eq!(ROW_SIZE, 293);
        assert_eq!(EMAIL_OFFSET + EMAIL_FIELD_SIZE, 293);
    }

    #[test]
    fn test_round_trip() {
        let original = row(7, "alice", "alice@example.com");
        let mut buf = [0u8; ROW_SIZE];
        original.serialize(&mut buf);

        assert_eq!(Row::deserialize(&buf), original);
    }

    #[test]
    fn test_byte_layout() {
        let mut buf = [0xFFu8; ROW_SIZE];
        row(0x04030201, "ab", "c").serialize(&mut buf);

        // id, little-endian
        assert_eq!(&buf[0..4], &[0x01, 0x02, 0x03, 0x04]);
        // username starts at offset 4, zero-padded through its field
        assert_eq!(&buf[4..7], b"ab\0");
        assert_eq!(buf[36], 0);
        // email starts at offset 37
        assert_eq!(&buf[37..39], b"c\0");
        assert_eq!(buf[292], 0);
    }

    #[test]
    fn test_maximum_width_fields_keep_terminator() {
        let original = row(1, &"u".repeat(USERNAME_MAX_LEN), &"e".repeat(EMAIL_MAX_LEN));
        let mut buf = [0xFFu8; ROW_SIZE];
        original.serialize(&mut buf);

        // the terminator byte survives even at full column width
        assert_eq!(buf[USERNAME_OFFSET + USERNAME_MAX_LEN], 0);
        assert_eq!(buf[EMAIL_OFFSET + EMAIL_MAX_LEN], 0);

        let decoded = Row::deserialize(&buf);
        assert_eq!(decoded.username.len(), USERNAME_MAX_LEN);
        assert_eq!(decoded.email.len(), EMAIL_MAX_LEN);
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_display() {
        let r = row(1, "user1", "person1@example.com");
        assert_eq!(format!("{}", r), "(1, user1, person1@example.com)");
    }
}
