use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::core::PoolRuntimeSnapshot;
use crate::format::Manifest;

/// Statistics for one compression run.
#[derive(Debug, Clone, Serialize)]
pub struct CompressStats {
    pub elapsed: Duration,
    pub input_bytes: u64,
    /// Full container size: body, compressed manifest and trailer.
    pub output_bytes: u64,
    pub body_bytes: u64,
    pub blocks: usize,
    pub workers: PoolRuntimeSnapshot,
}

impl CompressStats {
    /// Output size relative to input size; 0.0 for empty input.
    pub fn ratio(&self) -> f64 {
        if self.input_bytes == 0 {
            0.0
        } else {
            self.output_bytes as f64 / self.input_bytes as f64
        }
    }
}

/// Statistics for one decompression run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DecompressStats {
    pub elapsed: Duration,
    pub input_bytes: u64,
    pub output_bytes: u64,
    pub blocks: usize,
}

/// Writer and manifest handed back by [`Compressor::compress_reader`](super::Compressor::compress_reader).
#[derive(Debug)]
pub struct CompressOutcome<W> {
    pub writer: W,
    pub manifest: Manifest,
    pub stats: CompressStats,
}

/// Result of a file-to-file run: where the output went and how it went.
#[derive(Debug, Clone)]
pub struct FileReport<S> {
    pub output_path: PathBuf,
    pub stats: S,
}
