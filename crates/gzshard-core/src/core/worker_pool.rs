use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};
use flate2::Compression;
use serde::Serialize;

use crate::ShardError;
use crate::buffer::SlotBuffer;
use crate::codec;
use crate::telemetry::worker::{DefaultWorkerTelemetry, WorkerTelemetry};
use crate::types::{Block, CompressedBlock, Result, duration_to_us};

/// Compresses one block. Receives the worker id, the block and the gzip level.
pub type BlockProcessor =
    dyn Fn(usize, Block, Compression) -> Result<CompressedBlock> + Send + Sync;

/// Fixed-size pool of compression threads.
///
/// The pool size is the concurrency bound: at most `num_workers` blocks are
/// being compressed at once. Dispatch goes through a bounded queue holding
/// one pending block per worker, so the submitter blocks instead of piling
/// up raw blocks in memory.
pub struct WorkerPool {
    num_workers: usize,
    level: Compression,
    telemetry: Arc<dyn WorkerTelemetry>,
}

impl WorkerPool {
    /// Creates a worker pool using the default worker telemetry implementation.
    pub fn new(num_workers: usize, level: Compression) -> Self {
        Self::with_telemetry(num_workers, level, Arc::new(DefaultWorkerTelemetry))
    }

    /// Creates a worker pool with a custom telemetry backend.
    pub fn with_telemetry(
        num_workers: usize,
        level: Compression,
        telemetry: Arc<dyn WorkerTelemetry>,
    ) -> Self {
        Self {
            num_workers: num_workers.max(1),
            level,
            telemetry,
        }
    }

    /// Number of workers configured in this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Spawns workers that gzip each block and insert it into `slots`.
    pub fn spawn(&self, slots: Arc<SlotBuffer>) -> WorkerPoolHandle {
        self.spawn_with(slots, |_worker_id, block, level| {
            let data = codec::apply_compression(block.data(), level)?;
            Ok(CompressedBlock::new(block.id, data, block.len() as u64))
        })
    }

    /// Spawns workers running a custom block processor.
    pub fn spawn_with<F>(&self, slots: Arc<SlotBuffer>, processor: F) -> WorkerPoolHandle
    where
        F: Fn(usize, Block, Compression) -> Result<CompressedBlock> + Send + Sync + 'static,
    {
        let (task_tx, task_rx) = bounded::<Block>(self.num_workers);
        let state = Arc::new(WorkerPoolState::new(
            self.level,
            Arc::clone(&self.telemetry),
            self.num_workers,
        ));
        let processor: Arc<BlockProcessor> = Arc::new(processor);

        let mut worker_handles = Vec::with_capacity(self.num_workers);
        for worker_id in 0..self.num_workers {
            let worker_rx = task_rx.clone();
            let worker_state = Arc::clone(&state);
            let worker_slots = Arc::clone(&slots);
            let worker_processor = Arc::clone(&processor);

            let handle = thread::Builder::new()
                .name(format!("gzshard-worker-{worker_id}"))
                .spawn(move || {
                    run_worker_loop(
                        worker_id,
                        worker_rx,
                        worker_state,
                        worker_processor,
                        worker_slots,
                    );
                });
            match handle {
                Ok(handle) => worker_handles.push(handle),
                Err(error) => {
                    state.record_error(ShardError::Io(error));
                    slots.abort();
                    break;
                }
            }
        }

        WorkerPoolHandle {
            state,
            task_tx: Some(task_tx),
            worker_handles,
        }
    }
}

struct WorkerPoolState {
    level: Compression,
    telemetry: Arc<dyn WorkerTelemetry>,
    started_at: Instant,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    task_counts: Vec<AtomicUsize>,
    worker_started_offsets_us: Vec<AtomicU64>,
    worker_stopped_offsets_us: Vec<AtomicU64>,
    worker_busy_us: Vec<AtomicU64>,
    first_error: Mutex<Option<ShardError>>,
}

impl WorkerPoolState {
    fn new(level: Compression, telemetry: Arc<dyn WorkerTelemetry>, num_workers: usize) -> Self {
        Self {
            level,
            telemetry,
            started_at: Instant::now(),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            task_counts: (0..num_workers).map(|_| AtomicUsize::new(0)).collect(),
            worker_started_offsets_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
            worker_stopped_offsets_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
            worker_busy_us: (0..num_workers).map(|_| AtomicU64::new(0)).collect(),
            first_error: Mutex::new(None),
        }
    }

    /// Keeps the first error only; later ones are usually aborts caused by it.
    fn record_error(&self, error: ShardError) {
        let mut slot = match self.first_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            *slot = Some(error);
        }
    }

    fn take_error(&self) -> Option<ShardError> {
        match self.first_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn elapsed_us(&self) -> u64 {
        duration_to_us(self.started_at.elapsed())
    }
}

/// Per-worker runtime metrics captured by the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerRuntimeSnapshot {
    pub worker_id: usize,
    pub tasks_completed: usize,
    pub uptime: Duration,
    pub busy: Duration,
    pub idle: Duration,
    pub utilization: f64,
}

/// Runtime metrics snapshot for the worker pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolRuntimeSnapshot {
    pub elapsed: Duration,
    pub submitted: usize,
    pub completed: usize,
    pub pending: usize,
    pub workers: Vec<WorkerRuntimeSnapshot>,
}

/// Runtime handle for a spawned worker pool.
pub struct WorkerPoolHandle {
    state: Arc<WorkerPoolState>,
    task_tx: Option<Sender<Block>>,
    worker_handles: Vec<JoinHandle<()>>,
}

impl WorkerPoolHandle {
    /// Queues a block for compression, waiting while every worker is busy
    /// and the dispatch queue is full.
    ///
    /// # Errors
    /// Fails once the pool has shut down, or when every worker has exited
    /// because the run failed.
    pub fn submit(&self, block: Block) -> Result<()> {
        let Some(task_tx) = self.task_tx.as_ref() else {
            return Err(ShardError::Aborted(
                "worker pool is shutting down; no new work accepted",
            ));
        };

        self.state.submitted.fetch_add(1, Ordering::AcqRel);
        task_tx.send(block).map_err(|_| {
            self.state.submitted.fetch_sub(1, Ordering::AcqRel);
            ShardError::Aborted("all workers exited before the block was dispatched")
        })
    }

    /// Stops accepting new blocks; workers exit once the queue drains.
    pub fn shutdown(&mut self) {
        self.task_tx.take();
    }

    /// Total submitted task count.
    pub fn submitted_count(&self) -> usize {
        self.state.submitted.load(Ordering::Acquire)
    }

    /// Total completed task count.
    pub fn completed_count(&self) -> usize {
        self.state.completed.load(Ordering::Acquire)
    }

    /// Returns runtime metrics for the pool and each worker.
    pub fn runtime_snapshot(&self) -> PoolRuntimeSnapshot {
        let elapsed = self.state.started_at.elapsed();
        let elapsed_us = duration_to_us(elapsed);
        let submitted = self.submitted_count();
        let completed = self.completed_count();

        let workers = (0..self.state.task_counts.len())
            .map(|worker_id| {
                let started_raw =
                    self.state.worker_started_offsets_us[worker_id].load(Ordering::Acquire);
                let stopped_raw =
                    self.state.worker_stopped_offsets_us[worker_id].load(Ordering::Acquire);
                let busy_us_raw = self.state.worker_busy_us[worker_id].load(Ordering::Acquire);

                let start_us = started_raw.saturating_sub(1);
                let stop_us = if stopped_raw == 0 {
                    elapsed_us
                } else {
                    stopped_raw.saturating_sub(1)
                };
                let uptime_us = if started_raw == 0 {
                    0
                } else {
                    stop_us.saturating_sub(start_us)
                };
                let busy_us = busy_us_raw.min(uptime_us);
                let utilization = if uptime_us == 0 {
                    0.0
                } else {
                    busy_us as f64 / uptime_us as f64
                };

                WorkerRuntimeSnapshot {
                    worker_id,
                    tasks_completed: self.state.task_counts[worker_id].load(Ordering::Acquire),
                    uptime: Duration::from_micros(uptime_us),
                    busy: Duration::from_micros(busy_us),
                    idle: Duration::from_micros(uptime_us.saturating_sub(busy_us)),
                    utilization,
                }
            })
            .collect();

        PoolRuntimeSnapshot {
            elapsed,
            submitted,
            completed,
            pending: submitted.saturating_sub(completed),
            workers,
        }
    }

    /// Shuts down the pool, waits for every dispatched task to return, and
    /// reports the first task failure.
    pub fn finish(mut self) -> Result<PoolRuntimeSnapshot> {
        self.shutdown();
        let join_result = self.join_workers();

        if let Some(error) = self.state.take_error() {
            return Err(error);
        }
        join_result.map_err(ShardError::CompressionError)?;
        Ok(self.runtime_snapshot())
    }

    fn join_workers(&mut self) -> std::result::Result<(), String> {
        let mut first_panic = None;
        for handle in self.worker_handles.drain(..) {
            if let Err(payload) = handle.join() {
                let details = if let Some(message) = payload.downcast_ref::<&str>() {
                    (*message).to_string()
                } else if let Some(message) = payload.downcast_ref::<String>() {
                    message.clone()
                } else {
                    "unknown panic payload".to_string()
                };
                first_panic.get_or_insert(format!("worker thread panicked: {details}"));
            }
        }

        match first_panic {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerPoolHandle {
    fn drop(&mut self) {
        self.shutdown();
        let _ = self.join_workers();
    }
}

fn run_worker_loop(
    worker_id: usize,
    tasks: Receiver<Block>,
    state: Arc<WorkerPoolState>,
    processor: Arc<BlockProcessor>,
    slots: Arc<SlotBuffer>,
) {
    state.worker_started_offsets_us[worker_id]
        .store(state.elapsed_us().saturating_add(1), Ordering::Release);

    for block in tasks.iter() {
        let block_id = block.id;
        state.telemetry.on_task_started(worker_id, block_id);
        let started_at = Instant::now();

        let result = match catch_unwind(AssertUnwindSafe(|| {
            processor(worker_id, block, state.level)
        })) {
            Ok(result) => result,
            Err(_) => Err(ShardError::CompressionError(
                "worker task panicked while compressing block".to_string(),
            )),
        };

        let elapsed = started_at.elapsed();
        state.worker_busy_us[worker_id].fetch_add(duration_to_us(elapsed), Ordering::AcqRel);
        state.completed.fetch_add(1, Ordering::AcqRel);
        state.task_counts[worker_id].fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(compressed) => {
                state
                    .telemetry
                    .on_task_finished(worker_id, block_id, elapsed);
                if let Err(error) = slots.push(compressed) {
                    state.record_error(error);
                    break;
                }
            }
            Err(error) => {
                state.telemetry.on_task_failed(worker_id, block_id, elapsed);
                state.record_error(error.with_context(format!("block {block_id}")));
                slots.abort();
                break;
            }
        }
    }

    state.worker_stopped_offsets_us[worker_id]
        .store(state.elapsed_us().saturating_add(1), Ordering::Release);
}
