//! Single-block codec.
//!
//! Every block and the manifest are stored as independent gzip members, so
//! any block can be decoded without touching its neighbours.

use std::time::Instant;

use flate2::Compression;

use crate::Result;
use crate::telemetry::{self, tags};
use crate::types::duration_to_us;

pub mod gzip;

/// Compresses one buffer.
pub fn apply_compression(data: &[u8], level: Compression) -> Result<Vec<u8>> {
    let start = Instant::now();
    let compressed = gzip::apply(data, level)?;

    telemetry::increment_counter(tags::METRIC_CODEC_APPLY_COUNT, 1);
    telemetry::record_histogram(
        tags::METRIC_CODEC_APPLY_LATENCY_US,
        duration_to_us(start.elapsed()),
    );
    telemetry::record_histogram(tags::METRIC_CODEC_APPLY_INPUT_BYTES, data.len() as u64);
    telemetry::record_histogram(
        tags::METRIC_CODEC_APPLY_OUTPUT_BYTES,
        compressed.len() as u64,
    );
    Ok(compressed)
}

/// Decompresses one buffer produced by [`apply_compression`].
pub fn reverse_compression(data: &[u8]) -> Result<Vec<u8>> {
    let start = Instant::now();
    let decompressed = gzip::reverse(data)?;

    telemetry::increment_counter(tags::METRIC_CODEC_REVERSE_COUNT, 1);
    telemetry::record_histogram(
        tags::METRIC_CODEC_REVERSE_LATENCY_US,
        duration_to_us(start.elapsed()),
    );
    telemetry::record_histogram(tags::METRIC_CODEC_REVERSE_INPUT_BYTES, data.len() as u64);
    telemetry::record_histogram(
        tags::METRIC_CODEC_REVERSE_OUTPUT_BYTES,
        decompressed.len() as u64,
    );
    Ok(decompressed)
}
