use std::thread;

use flate2::Compression;

use crate::telemetry::{self, tags};

/// Default size of each raw input block.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024;
/// Upper bound on slot buffer capacity regardless of available memory.
pub const MAX_SLOT_CAPACITY: usize = 1000;
/// Smallest usable slot buffer; the splitter throttles at half capacity.
pub const MIN_SLOT_CAPACITY: usize = 2;
/// Cores left free for the splitter and packer threads.
pub const RESERVED_CORES: usize = 2;
/// Share of available physical memory budgeted for packed-but-unwritten blocks.
pub const MEMORY_BUDGET_PERCENT: u64 = 10;

/// Tuning knobs for one compression run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
    /// Raw bytes per block; the last block may be shorter.
    pub block_size: usize,
    /// Number of compression worker threads.
    pub workers: usize,
    /// Capacity of the slot buffer, in compressed blocks.
    pub slot_capacity: usize,
    /// Gzip level applied to every block and to the manifest.
    pub level: Compression,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: 1,
            slot_capacity: MAX_SLOT_CAPACITY,
            level: Compression::default(),
        }
    }
}

impl PipelineConfig {
    /// Builds a configuration sized for the current machine.
    ///
    /// Worker count comes from the detected core count and slot capacity
    /// from available physical memory. Detection failures degrade to one
    /// worker and the maximum slot capacity.
    pub fn detect() -> Self {
        let workers = detect_workers();
        let available = telemetry::system_memory().available_bytes;
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers,
            slot_capacity: slot_capacity_for(available, DEFAULT_BLOCK_SIZE),
            level: Compression::default(),
        }
    }

    /// Sets the block size and re-derives slot capacity from available memory.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self.slot_capacity =
            slot_capacity_for(telemetry::system_memory().available_bytes, self.block_size);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_slot_capacity(mut self, slot_capacity: usize) -> Self {
        self.slot_capacity = slot_capacity.max(MIN_SLOT_CAPACITY);
        self
    }

    /// Sets the gzip level, clamped to 0..=9.
    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Compression::new(level.min(9));
        self
    }
}

/// Worker count for a machine with `cores` logical cores, never below one.
pub fn worker_count_for_cores(cores: usize) -> usize {
    cores.saturating_sub(RESERVED_CORES).max(1)
}

/// Slot capacity for a memory budget and block size.
///
/// Ten percent of available memory divided by the block size, clamped to
/// `MIN_SLOT_CAPACITY..=MAX_SLOT_CAPACITY`. Unknown memory yields the maximum.
pub fn slot_capacity_for(available_bytes: Option<u64>, block_size: usize) -> usize {
    let Some(available) = available_bytes else {
        return MAX_SLOT_CAPACITY;
    };

    let budget = available / 100 * MEMORY_BUDGET_PERCENT;
    let slots = budget / block_size.max(1) as u64;
    usize::try_from(slots)
        .unwrap_or(MAX_SLOT_CAPACITY)
        .clamp(MIN_SLOT_CAPACITY, MAX_SLOT_CAPACITY)
}

fn detect_workers() -> usize {
    match thread::available_parallelism() {
        Ok(cores) => worker_count_for_cores(cores.get()),
        Err(error) => {
            tracing::warn!(
                target: tags::TARGET_CONFIG,
                %error,
                "unable to detect the number of cores; only 1 worker will be used"
            );
            1
        }
    }
}
