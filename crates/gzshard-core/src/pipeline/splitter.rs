use std::io::{ErrorKind, Read};

use bytes::Bytes;
use serde::Serialize;

use crate::buffer::SlotBuffer;
use crate::core::WorkerPoolHandle;
use crate::telemetry::{self, tags};
use crate::types::{Block, Result};

/// Totals reported by a finished splitter run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SplitStats {
    pub blocks: usize,
    pub bytes: u64,
}

/// Cuts an input stream into fixed-size blocks and feeds them to the pool.
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    block_size: usize,
}

impl Splitter {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Reads `reader` to EOF, submitting one block at a time.
    ///
    /// After each submission the splitter holds off while the slot buffer is
    /// at least half full, so compression cannot outrun packing.
    pub fn run<R: Read>(
        &self,
        mut reader: R,
        pool: &WorkerPoolHandle,
        slots: &SlotBuffer,
    ) -> Result<SplitStats> {
        let throttle_at = (slots.capacity() / 2).max(1);
        let mut stats = SplitStats::default();

        while let Some(data) = self.read_block(&mut reader)? {
            stats.bytes += data.len() as u64;
            pool.submit(Block::new(stats.blocks, data))?;
            stats.blocks += 1;
            telemetry::increment_counter(tags::METRIC_SPLITTER_BLOCK_COUNT, 1);

            if slots.occupancy() >= throttle_at {
                telemetry::increment_counter(tags::METRIC_SPLITTER_THROTTLE_COUNT, 1);
                tracing::trace!(
                    target: tags::TARGET_PIPELINE,
                    occupancy = slots.occupancy(),
                    throttle_at,
                    "splitter throttled"
                );
                slots.wait_until_below(throttle_at)?;
            }
        }

        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            blocks = stats.blocks,
            bytes = stats.bytes,
            "input split"
        );
        Ok(stats)
    }

    /// Fills one block, retrying short reads. Returns `None` at EOF.
    fn read_block<R: Read>(&self, reader: &mut R) -> Result<Option<Bytes>> {
        let mut buffer = vec![0u8; self.block_size];
        let mut filled = 0;

        while filled < self.block_size {
            match reader.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }

        if filled == 0 {
            return Ok(None);
        }
        buffer.truncate(filled);
        Ok(Some(Bytes::from(buffer)))
    }
}

/// Number of blocks an input of `input_len` bytes splits into.
pub fn block_count_for(input_len: u64, block_size: usize) -> u64 {
    input_len.div_ceil(block_size.max(1) as u64)
}
