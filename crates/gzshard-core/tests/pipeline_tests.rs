use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use gzshard_core::paths;
use gzshard_core::{Compressor, Decompressor, PipelineConfig, ShardError};
use tempfile::TempDir;

fn compressor(block_size: usize) -> Compressor {
    Compressor::new(
        PipelineConfig::default()
            .with_block_size(block_size)
            .with_workers(3)
            .with_slot_capacity(6),
    )
}

fn write_input(dir: &TempDir, name: &str, len: usize) -> std::io::Result<(PathBuf, Vec<u8>)> {
    let data: Vec<u8> = (0..len).map(|i| (i * 31 % 253) as u8).collect();
    let path = dir.path().join(name);
    fs::write(&path, &data)?;
    Ok((path, data))
}

#[test]
fn file_round_trip_uses_derived_names() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (input, data) = write_input(&dir, "data.txt", 300_000)?;

    let packed = compressor(16 * 1024).compress_file(&input, &dir.path().join("out"))?;
    assert_eq!(packed.output_path, dir.path().join("out.txt.gz"));
    assert_eq!(packed.stats.input_bytes, data.len() as u64);
    assert_eq!(packed.stats.blocks, 19);
    assert_eq!(
        packed.stats.output_bytes,
        fs::metadata(&packed.output_path)?.len()
    );

    let restored =
        Decompressor::new().decompress_file(&packed.output_path, &dir.path().join("restored"))?;
    assert_eq!(restored.output_path, dir.path().join("restored.txt"));
    assert_eq!(restored.stats.blocks, 19);
    assert_eq!(fs::read(&restored.output_path)?, data);
    Ok(())
}

#[test]
fn empty_file_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (input, _) = write_input(&dir, "empty.bin", 0)?;

    let packed = compressor(1024).compress_file(&input, &dir.path().join("empty"))?;
    assert_eq!(packed.stats.blocks, 0);
    assert!(fs::metadata(&packed.output_path)?.len() > 8);

    let restored =
        Decompressor::new().decompress_file(&packed.output_path, &dir.path().join("back"))?;
    assert_eq!(fs::metadata(&restored.output_path)?.len(), 0);
    Ok(())
}

#[test]
fn missing_input_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("nope.txt");

    match compressor(1024).compress_file(&missing, &dir.path().join("out")) {
        Err(ShardError::InputMissing(path)) => assert_eq!(path, missing),
        other => panic!("expected InputMissing, got {other:?}"),
    }
    assert!(!dir.path().join("out.txt.gz").exists());
    Ok(())
}

#[test]
fn existing_output_is_never_overwritten() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let (input, _) = write_input(&dir, "data.txt", 4096)?;
    let occupied = dir.path().join("out.txt.gz");
    fs::write(&occupied, b"keep me")?;

    match compressor(1024).compress_file(&input, &dir.path().join("out")) {
        Err(ShardError::OutputExists(path)) => assert_eq!(path, occupied),
        other => panic!("expected OutputExists, got {other:?}"),
    }
    assert_eq!(fs::read(&occupied)?, b"keep me");
    Ok(())
}

#[test]
fn foreign_input_fails_without_creating_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("plain.txt.gz");
    fs::write(&input, b"this file was not produced by gzshard at all")?;

    let error = Decompressor::new()
        .decompress_file(&input, &dir.path().join("restored"))
        .expect_err("foreign input must fail");
    assert!(error.is_format_error());
    assert!(error.to_string().contains("not produced by this encoder"));
    assert!(!dir.path().join("restored.txt").exists());
    Ok(())
}

#[test]
fn output_paths_follow_naming_rules() {
    let compressed = paths::compressed_output_path("a/b.log".as_ref(), "c/d".as_ref());
    assert_eq!(compressed, PathBuf::from("c/d.log.gz"));
    let restored = paths::decompressed_output_path(&compressed, "e".as_ref());
    assert_eq!(restored, PathBuf::from("e.log"));
}

/// Sink whose first write panics, standing in for a crashing packer.
struct PanickingWriter;

impl Write for PanickingWriter {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        panic!("sink exploded");
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn packer_panic_does_not_hang_the_run() -> Result<(), Box<dyn std::error::Error>> {
    let input = vec![b'q'; 64 * 64];
    let compressor = Compressor::new(
        PipelineConfig::default()
            .with_block_size(64)
            .with_workers(2)
            .with_slot_capacity(2),
    );

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let result = compressor.compress_reader(&input[..], PanickingWriter);
        let _ = done_tx.send(result.map(|outcome| outcome.stats.blocks));
    });

    let result = done_rx
        .recv_timeout(Duration::from_secs(10))
        .map_err(|_| "compression hung after the packer panicked")?;
    let error = result.expect_err("a panicking sink must fail the run");
    assert!(
        error.to_string().contains("packer thread panicked"),
        "unexpected error: {error}"
    );
    Ok(())
}
