#![cfg(feature = "telemetry")]

use std::io::Cursor;

use gzshard_core::telemetry::{self, tags};
use gzshard_core::{Compressor, Decompressor, PipelineConfig};

#[test]
fn compression_run_records_pipeline_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let before = telemetry::snapshot();
    let input = vec![7u8; 10 * 1024];
    let config = PipelineConfig::default()
        .with_block_size(1024)
        .with_workers(2)
        .with_slot_capacity(4);
    Compressor::new(config).compress_reader(&input[..], Vec::new())?;
    let after = telemetry::snapshot();

    let grew_by = |name: &str| {
        after.counter(name).unwrap_or(0) - before.counter(name).unwrap_or(0)
    };
    // Registry is process-wide; other tests may run concurrently.
    assert!(grew_by(tags::METRIC_SPLITTER_BLOCK_COUNT) >= 10);
    assert!(grew_by(tags::METRIC_PACKER_BLOCK_COUNT) >= 10);
    assert!(grew_by(tags::METRIC_WORKER_TASK_FINISH_COUNT) >= 10);
    // Ten blocks plus the manifest.
    assert!(grew_by(tags::METRIC_CODEC_APPLY_COUNT) >= 11);
    assert!(after.histogram(tags::METRIC_SLOT_OCCUPANCY_HIST).is_some());
    Ok(())
}

#[test]
fn codec_directions_are_recorded_separately() -> Result<(), Box<dyn std::error::Error>> {
    let input = vec![b'z'; 64 * 1024];
    let config = PipelineConfig::default().with_block_size(64 * 1024).with_workers(1);
    let container = Compressor::new(config)
        .compress_reader(&input[..], Vec::new())?
        .writer;

    let before = telemetry::snapshot();
    let mut restored = Vec::new();
    Decompressor::new().decompress_reader(Cursor::new(container), &mut restored)?;
    let after = telemetry::snapshot();

    let samples = |snapshot: &telemetry::TelemetrySnapshot, name: &str| {
        snapshot.histogram(name).map_or(0, |histogram| histogram.count)
    };
    let reverse_out = after
        .histogram(tags::METRIC_CODEC_REVERSE_OUTPUT_BYTES)
        .ok_or("reverse output histogram missing")?;
    assert!(reverse_out.max >= input.len() as u64);
    assert!(
        samples(&after, tags::METRIC_CODEC_REVERSE_INPUT_BYTES)
            > samples(&before, tags::METRIC_CODEC_REVERSE_INPUT_BYTES)
    );
    let apply_in = after
        .histogram(tags::METRIC_CODEC_APPLY_INPUT_BYTES)
        .ok_or("apply input histogram missing")?;
    assert!(apply_in.count >= 1);
    Ok(())
}

#[test]
fn counters_accumulate_in_snapshot() {
    telemetry::increment_counter("gzshard.test.counter", 3);
    telemetry::increment_counter("gzshard.test.counter", 2);
    let snapshot = telemetry::snapshot();
    assert!(snapshot.counter("gzshard.test.counter").unwrap_or(0) >= 5);
}

#[test]
fn gauges_never_go_below_zero() {
    telemetry::sub_gauge_saturating("gzshard.test.gauge", 10);
    assert_eq!(telemetry::snapshot().gauge("gzshard.test.gauge"), Some(0));
}
