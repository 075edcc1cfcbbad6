use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

use crate::{Result, ShardError};

/// Compresses `data` into a single, self-contained gzip member.
pub fn apply(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), level);
    encoder
        .write_all(data)
        .map_err(|err| ShardError::CompressionError(format!("gzip encode failed: {err}")))?;
    encoder
        .finish()
        .map_err(|err| ShardError::CompressionError(format!("gzip finish failed: {err}")))
}

/// Decompresses one gzip member produced by [`apply`].
///
/// Bytes trailing the first member are ignored, matching `GzDecoder`.
pub fn reverse(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut output = Vec::with_capacity(data.len().saturating_mul(2));
    decoder
        .read_to_end(&mut output)
        .map_err(|err| ShardError::DecompressionError(format!("gzip decode failed: {err}")))?;
    Ok(output)
}
