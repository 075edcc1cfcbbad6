use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::ShardError;
use crate::buffer::SlotBuffer;
use crate::config::PipelineConfig;
use crate::core::{PoolRuntimeSnapshot, WorkerPool};
use crate::paths;
use crate::telemetry::tags;
use crate::types::Result;

use super::packer::{PackOutcome, Packer};
use super::splitter::{SplitStats, Splitter};
use super::types::{CompressOutcome, CompressStats, FileReport};

/// Runs the splitter, the worker pool and the packer against one input.
///
/// The splitter (with the pool it feeds) and the packer each get a scoped
/// thread. Both are joined before returning, and the first root-cause error
/// of the three wins over the aborts it triggers in the others.
#[derive(Debug, Clone)]
pub struct Compressor {
    config: PipelineConfig,
}

impl Compressor {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Compresses `reader` into a container written to `writer`.
    pub fn compress_reader<R, W>(&self, reader: R, writer: W) -> Result<CompressOutcome<W>>
    where
        R: Read + Send,
        W: Write + Send,
    {
        let started_at = Instant::now();
        let slots = Arc::new(SlotBuffer::new(self.config.slot_capacity));
        let pool = WorkerPool::new(self.config.workers, self.config.level);
        let splitter = Splitter::new(self.config.block_size);
        let packer = Packer::new(writer, self.config.level);

        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            block_size = self.config.block_size,
            workers = pool.num_workers(),
            slot_capacity = slots.capacity(),
            "compression started"
        );

        let (produced, packed) = thread::scope(|scope| {
            let producer = scope.spawn(|| produce(&splitter, &pool, &slots, reader));
            let consumer = scope.spawn(|| packer.run(&slots));
            let produced = producer.join().unwrap_or_else(|_| {
                slots.abort();
                (Err(panicked("splitter")), Err(panicked("splitter")))
            });
            let packed = consumer.join().unwrap_or_else(|_| {
                slots.abort();
                Err(panicked("packer"))
            });
            (produced, packed)
        });

        let (split, finished) = produced;
        let (split, workers, packed) = match (split, finished, packed) {
            (Ok(split), Ok(workers), Ok(packed)) => (split, workers, packed),
            (split, finished, packed) => {
                return Err(root_cause([finished.err(), split.err(), packed.err()]));
            }
        };

        let PackOutcome {
            writer,
            manifest,
            stats: pack,
        } = packed;
        let stats = CompressStats {
            elapsed: started_at.elapsed(),
            input_bytes: split.bytes,
            output_bytes: pack.container_bytes(),
            body_bytes: pack.body_bytes,
            blocks: pack.blocks,
            workers,
        };

        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            blocks = stats.blocks,
            input_bytes = stats.input_bytes,
            output_bytes = stats.output_bytes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "compression finished"
        );
        Ok(CompressOutcome {
            writer,
            manifest,
            stats,
        })
    }

    /// Compresses `input` into `<output_base><input extension>.gz`.
    ///
    /// Refuses to overwrite an existing output and removes a partially
    /// written one if the run fails.
    pub fn compress_file(
        &self,
        input: &Path,
        output_base: &Path,
    ) -> Result<FileReport<CompressStats>> {
        paths::ensure_input_exists(input)?;
        let output_path = paths::compressed_output_path(input, output_base);
        let source = File::open(input)?;
        let target = paths::create_output(&output_path)?;

        match self.compress_reader(source, BufWriter::new(target)) {
            Ok(outcome) => Ok(FileReport {
                output_path,
                stats: outcome.stats,
            }),
            Err(error) => {
                discard_partial_output(&output_path);
                Err(error.with_context(format!("compressing \"{}\"", input.display())))
            }
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(PipelineConfig::detect())
    }
}

/// Producer side: split the input, then wait for every dispatched task.
///
/// The slot buffer is marked exhausted only once all workers returned
/// cleanly; any failure aborts it instead.
fn produce<R: Read>(
    splitter: &Splitter,
    pool: &WorkerPool,
    slots: &Arc<SlotBuffer>,
    reader: R,
) -> (Result<SplitStats>, Result<PoolRuntimeSnapshot>) {
    let _abort_guard = slots.abort_on_panic();
    let handle = pool.spawn(Arc::clone(slots));
    let split = splitter.run(reader, &handle, slots);
    if split.is_err() {
        slots.abort();
    }

    let finished = handle.finish();
    if split.is_ok() && finished.is_ok() {
        slots.mark_exhausted();
    } else {
        slots.abort();
    }
    (split, finished)
}

/// Picks the error that started the failure, skipping the aborts it caused.
fn root_cause<const N: usize>(errors: [Option<ShardError>; N]) -> ShardError {
    let mut fallback = None;
    for error in errors.into_iter().flatten() {
        if matches!(error, ShardError::Aborted(_)) {
            fallback.get_or_insert(error);
        } else {
            return error;
        }
    }
    fallback.unwrap_or(ShardError::Aborted("pipeline failed without an error"))
}

fn panicked(actor: &str) -> ShardError {
    ShardError::Other(anyhow::anyhow!("{actor} thread panicked"))
}

fn discard_partial_output(path: &Path) {
    if let Err(error) = fs::remove_file(path) {
        tracing::warn!(
            target: tags::TARGET_PIPELINE,
            path = %path.display(),
            %error,
            "failed to remove partial output"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_cause_prefers_non_abort_errors() {
        let error = root_cause([
            Some(ShardError::Aborted("slot buffer aborted while inserting")),
            None,
            Some(ShardError::CompressionError("boom".to_string())),
        ]);
        assert!(matches!(error, ShardError::CompressionError(_)));
    }

    #[test]
    fn root_cause_falls_back_to_first_abort() {
        let error = root_cause([None, Some(ShardError::Aborted("first")), None]);
        assert!(matches!(error, ShardError::Aborted("first")));
    }
}
