//! Container format constants.
//!
//! ```text
//! +----------------------+
//! | Magic: "F3dCache"    |  8 bytes
//! +----------------------+
//! | Frozen flag          |  1 byte (0x00 while writing, 0xFF once closed)
//! | Reserved             |  1 byte
//! | Version              |  2 bytes (u16 LE)
//! | Reserved             |  4 bytes
//! +----------------------+
//! | Index position       |  8 bytes (u64 LE)
//! +----------------------+
//! | Blocks: [u64 size][payload] ...
//! +----------------------+
//! ```

/// Magic bytes at the start of a cache file.
pub const CACHE_MAGIC: &[u8; 8] = b"F3dCache";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 8;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 10;

/// Offset of the index position in the header.
pub const INDEX_POS_OFFSET: usize = 16;

/// Current container version.
pub const CURRENT_VERSION: u16 = 1;

/// Frozen flag value once the file is closed and the index written.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag value while the file is still being written.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// Position value meaning "no block".
pub const NO_BLOCK: u64 = 0;

/// Build a header for the given frozen state and index position.
pub fn make_header(frozen: bool, index_pos: u64) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..8].copy_from_slice(CACHE_MAGIC);
    header[FROZEN_OFFSET] = if frozen { FROZEN_FLAG } else { NOT_FROZEN_FLAG };
    header[VERSION_OFFSET..VERSION_OFFSET + 2].copy_from_slice(&CURRENT_VERSION.to_le_bytes());
    header[INDEX_POS_OFFSET..INDEX_POS_OFFSET + 8].copy_from_slice(&index_pos.to_le_bytes());
    header
}
