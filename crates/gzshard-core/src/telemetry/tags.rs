/// Tracing target for worker runtime events.
pub const TARGET_WORKER: &str = "gzshard.worker";
/// Tracing target for splitter/packer pipeline events.
pub const TARGET_PIPELINE: &str = "gzshard.pipeline";
/// Tracing target for container encode/decode events.
pub const TARGET_FORMAT: &str = "gzshard.format";
/// Tracing target for resource detection.
pub const TARGET_CONFIG: &str = "gzshard.config";

pub const METRIC_CODEC_APPLY_COUNT: &str = "gzshard.codec.apply.count";
pub const METRIC_CODEC_REVERSE_COUNT: &str = "gzshard.codec.reverse.count";
pub const METRIC_CODEC_APPLY_LATENCY_US: &str = "gzshard.codec.apply.latency_us";
pub const METRIC_CODEC_REVERSE_LATENCY_US: &str = "gzshard.codec.reverse.latency_us";
pub const METRIC_CODEC_APPLY_INPUT_BYTES: &str = "gzshard.codec.apply.input_bytes";
pub const METRIC_CODEC_APPLY_OUTPUT_BYTES: &str = "gzshard.codec.apply.output_bytes";
pub const METRIC_CODEC_REVERSE_INPUT_BYTES: &str = "gzshard.codec.reverse.input_bytes";
pub const METRIC_CODEC_REVERSE_OUTPUT_BYTES: &str = "gzshard.codec.reverse.output_bytes";

pub const METRIC_WORKER_TASK_COUNT: &str = "gzshard.worker.task.count";
pub const METRIC_WORKER_TASK_START_COUNT: &str = "gzshard.worker.task.start.count";
pub const METRIC_WORKER_TASK_FINISH_COUNT: &str = "gzshard.worker.task.finish.count";
pub const METRIC_WORKER_TASK_FAIL_COUNT: &str = "gzshard.worker.task.fail.count";
pub const METRIC_WORKER_TASK_LATENCY_US: &str = "gzshard.worker.task.latency_us";
pub const METRIC_WORKER_ACTIVE_COUNT: &str = "gzshard.worker.active.count";

pub const METRIC_SLOT_OCCUPANCY: &str = "gzshard.slot.occupancy";
pub const METRIC_SLOT_OCCUPANCY_HIST: &str = "gzshard.slot.occupancy.hist";
pub const METRIC_SPLITTER_THROTTLE_COUNT: &str = "gzshard.splitter.throttle.count";
pub const METRIC_SPLITTER_BLOCK_COUNT: &str = "gzshard.splitter.block.count";

pub const METRIC_PACKER_BLOCK_COUNT: &str = "gzshard.packer.block.count";
pub const METRIC_PACKER_BODY_BYTES: &str = "gzshard.packer.body_bytes";
pub const METRIC_DECODER_BLOCK_COUNT: &str = "gzshard.decoder.block.count";
