//! Compression support for layer payloads.
//!
//! Every payload is framed with a one-byte codec tag so the reader never
//! has to guess: `0` = stored, `1` = zlib. Zlib frames carry the
//! uncompressed size so the output buffer is allocated once.

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

const CODEC_STORED: u8 = 0;
const CODEC_ZLIB: u8 = 1;

/// Upper bound on the zlib ratio; a size header claiming more is corrupt.
const MAX_INFLATE_RATIO: usize = 1032;

/// Compress a payload.
///
/// # Arguments
/// * `data` - Payload bytes
/// * `level` - Compression level (0-9, where 0 stores the payload as-is)
pub fn compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    if level <= 0 || data.is_empty() {
        return Ok(stored(data));
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.clamp(1, 9) as u32));
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    // Only use compression if it actually saves space
    if compressed.len() + 8 >= data.len() {
        return Ok(stored(data));
    }

    // Format: [codec: u8][uncompressed_size: u64 LE][zlib stream]
    let mut result = Vec::with_capacity(9 + compressed.len());
    result.push(CODEC_ZLIB);
    result.extend_from_slice(&(data.len() as u64).to_le_bytes());
    result.extend_from_slice(&compressed);
    Ok(result)
}

fn stored(data: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(1 + data.len());
    result.push(CODEC_STORED);
    result.extend_from_slice(data);
    result
}

/// Decompress a framed payload produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let (&codec, rest) = data
        .split_first()
        .ok_or_else(|| Error::invalid("empty layer payload"))?;

    match codec {
        CODEC_STORED => Ok(rest.to_vec()),
        CODEC_ZLIB => {
            if rest.len() < 8 {
                return Err(Error::UnexpectedEof(data.len() as u64));
            }
            let mut size = [0u8; 8];
            size.copy_from_slice(&rest[..8]);
            let uncompressed_size = u64::from_le_bytes(size);
            let stream = &rest[8..];
            let limit = stream.len().saturating_mul(MAX_INFLATE_RATIO).max(64) as u64;
            if uncompressed_size > limit {
                return Err(Error::invalid(format!(
                    "payload claims {} bytes from a {} byte zlib stream",
                    uncompressed_size,
                    stream.len()
                )));
            }
            let uncompressed_size = uncompressed_size as usize;

            let mut decoder = ZlibDecoder::new(stream);
            let mut decompressed = Vec::with_capacity(uncompressed_size);
            decoder.read_to_end(&mut decompressed)?;
            if decompressed.len() != uncompressed_size {
                return Err(Error::invalid(format!(
                    "payload inflated to {} bytes, header says {}",
                    decompressed.len(),
                    uncompressed_size
                )));
            }
            Ok(decompressed)
        }
        other => Err(Error::invalid(format!("unknown payload codec {}", other))),
    }
}
