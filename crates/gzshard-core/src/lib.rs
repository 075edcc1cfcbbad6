pub mod buffer;
pub mod codec;
pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod paths;
pub mod pipeline;
pub mod telemetry;
pub mod types;

pub use buffer::SlotBuffer;
pub use config::PipelineConfig;
pub use crate::core::{PoolRuntimeSnapshot, WorkerPool, WorkerPoolHandle, WorkerRuntimeSnapshot};
pub use error::ShardError;
pub use format::{ContainerReader, DecodeStage, FooterBuilder, Manifest, ManifestEntry, Trailer};
pub use pipeline::{
    CompressOutcome, CompressStats, Compressor, DecompressStats, Decompressor, FileReport, Packer,
    Splitter,
};
pub use telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
pub use types::{Block, CompressedBlock, Result};

/// Re-exported so callers can name gzip levels without a direct dependency.
pub use flate2::Compression;
