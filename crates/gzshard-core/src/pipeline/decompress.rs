use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use std::time::Instant;

use crate::format::ContainerReader;
use crate::paths;
use crate::telemetry::tags;
use crate::types::Result;

use super::types::{DecompressStats, FileReport};

/// Restores the original byte stream from a container.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decompressor;

impl Decompressor {
    pub fn new() -> Self {
        Self
    }

    /// Decodes the container in `reader` and writes the original bytes to `writer`.
    pub fn decompress_reader<R, W>(&self, reader: R, writer: &mut W) -> Result<DecompressStats>
    where
        R: Read + Seek,
        W: Write,
    {
        let started_at = Instant::now();
        let container = ContainerReader::new(reader)?;
        decode(container, writer, started_at)
    }

    /// Decompresses `input` into `<output_base><inner extension>`.
    ///
    /// The container is validated before the output file is created, so a
    /// foreign input never leaves an empty output behind.
    pub fn decompress_file(
        &self,
        input: &Path,
        output_base: &Path,
    ) -> Result<FileReport<DecompressStats>> {
        paths::ensure_input_exists(input)?;
        let output_path = paths::decompressed_output_path(input, output_base);
        let started_at = Instant::now();
        let context = || format!("decompressing \"{}\"", input.display());

        let container = ContainerReader::new(BufReader::new(File::open(input)?))
            .map_err(|error| error.with_context(context()))?;
        let mut target = BufWriter::new(paths::create_output(&output_path)?);

        match decode(container, &mut target, started_at) {
            Ok(stats) => Ok(FileReport { output_path, stats }),
            Err(error) => {
                drop(target);
                if let Err(remove_error) = fs::remove_file(&output_path) {
                    tracing::warn!(
                        target: tags::TARGET_PIPELINE,
                        path = %output_path.display(),
                        error = %remove_error,
                        "failed to remove partial output"
                    );
                }
                Err(error.with_context(context()))
            }
        }
    }
}

fn decode<R: Read + Seek, W: Write>(
    mut container: ContainerReader<R>,
    writer: &mut W,
    started_at: Instant,
) -> Result<DecompressStats> {
    let output_bytes = container.emit_blocks(writer)?;
    let stats = DecompressStats {
        elapsed: started_at.elapsed(),
        input_bytes: container.container_len(),
        output_bytes,
        blocks: container.block_count(),
    };

    tracing::debug!(
        target: tags::TARGET_PIPELINE,
        blocks = stats.blocks,
        input_bytes = stats.input_bytes,
        output_bytes = stats.output_bytes,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "decompression finished"
    );
    Ok(stats)
}
