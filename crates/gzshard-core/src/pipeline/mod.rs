//! Compression and decompression pipelines.
//!
//! Compression runs three actors: the [`Splitter`] reads fixed-size blocks
//! and dispatches them to the worker pool, workers gzip blocks into the
//! shared slot buffer as they finish, and the [`Packer`] drains that buffer
//! into the container body before writing the manifest footer.

mod compress;
mod decompress;
mod packer;
mod splitter;
mod types;

pub use compress::Compressor;
pub use decompress::Decompressor;
pub use packer::{PackOutcome, PackStats, Packer};
pub use splitter::{SplitStats, Splitter, block_count_for};
pub use types::{CompressOutcome, CompressStats, DecompressStats, FileReport};
