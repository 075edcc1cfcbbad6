use std::time::Duration;

use crate::telemetry::{self, tags};
use crate::types::duration_to_us;

/// Hooks the worker pool calls around every compression task.
pub trait WorkerTelemetry: Send + Sync {
    fn on_task_started(&self, worker_id: usize, block_id: usize);
    fn on_task_finished(&self, worker_id: usize, block_id: usize, elapsed: Duration);
    fn on_task_failed(&self, worker_id: usize, block_id: usize, elapsed: Duration);
}

/// Reports task counts, latency and active workers to the registry.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultWorkerTelemetry;

impl DefaultWorkerTelemetry {
    fn task_ended(&self, elapsed_us: u64) {
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_COUNT, 1);
        telemetry::record_histogram(tags::METRIC_WORKER_TASK_LATENCY_US, elapsed_us);
        telemetry::sub_gauge_saturating(tags::METRIC_WORKER_ACTIVE_COUNT, 1);
    }
}

impl WorkerTelemetry for DefaultWorkerTelemetry {
    fn on_task_started(&self, worker_id: usize, block_id: usize) {
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_START_COUNT, 1);
        telemetry::add_gauge(tags::METRIC_WORKER_ACTIVE_COUNT, 1);
        tracing::trace!(
            target: tags::TARGET_WORKER,
            worker_id,
            block_id,
            "block compression started"
        );
    }

    fn on_task_finished(&self, worker_id: usize, block_id: usize, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FINISH_COUNT, 1);
        self.task_ended(elapsed_us);
        tracing::debug!(
            target: tags::TARGET_WORKER,
            worker_id,
            block_id,
            elapsed_us,
            "block compressed"
        );
    }

    fn on_task_failed(&self, worker_id: usize, block_id: usize, elapsed: Duration) {
        let elapsed_us = duration_to_us(elapsed);
        telemetry::increment_counter(tags::METRIC_WORKER_TASK_FAIL_COUNT, 1);
        self.task_ended(elapsed_us);
        tracing::warn!(
            target: tags::TARGET_WORKER,
            worker_id,
            block_id,
            elapsed_us,
            "block compression failed"
        );
    }
}
