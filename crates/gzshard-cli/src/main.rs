use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use gzshard_core::{
    CompressStats, Compressor, DecompressStats, Decompressor, FileReport, PipelineConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gzshard",
    version,
    about = "Block-parallel gzip container tool",
    long_about = "Compress a file into independently gzipped blocks packed into one container, \
                  or restore the original file from such a container."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file into `<output><input extension>.gz`.
    Compress {
        /// File to compress.
        input: PathBuf,

        /// Output base name; the input extension and `.gz` are appended.
        output: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,
    },
    /// Restore a file from a container into `<output><inner extension>`.
    Decompress {
        /// Container produced by `gzshard compress`.
        input: PathBuf,

        /// Output base name; the extension preceding `.gz` is appended.
        output: PathBuf,
    },
}

#[derive(clap::Args)]
struct TuningArgs {
    /// Raw block size (supports suffixes K/M/G, e.g. 256K, 1M).
    #[arg(long, default_value = "1M", value_parser = parse_size)]
    block_size: usize,

    /// Number of compression workers (defaults to cores minus two, at least one).
    #[arg(long)]
    workers: Option<usize>,

    /// Slot buffer capacity in blocks (defaults to a share of available memory).
    #[arg(long)]
    slots: Option<usize>,

    /// Gzip compression level.
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: u32,
}

impl TuningArgs {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::detect()
            .with_block_size(self.block_size)
            .with_level(self.level);
        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(slots) = self.slots {
            config = config.with_slot_capacity(slots);
        }
        config
    }
}

fn main() {
    init_tracing();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            std::process::exit(usage_exit_code(&error));
        }
    };
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

/// Help and version requests succeed; every other parse failure exits with 1.
fn usage_exit_code(error: &clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let started_at = Instant::now();

    match cli.command {
        Commands::Compress {
            input,
            output,
            tuning,
        } => {
            print_header("compress", &input);
            let report = Compressor::new(tuning.into_config()).compress_file(&input, &output)?;
            print_compress_summary(&report);
        }
        Commands::Decompress { input, output } => {
            print_header("decompress", &input);
            let report = Decompressor::new().decompress_file(&input, &output)?;
            print_decompress_summary(&report);
        }
    }

    println!("Elapsed time: {}", format_duration(started_at.elapsed()));
    Ok(())
}

fn print_header(command: &str, input: &Path) {
    println!("Command: {command}");
    println!("Input file name: {}", input.display());
}

fn print_compress_summary(report: &FileReport<CompressStats>) {
    let stats = &report.stats;
    println!("Output file name: {}", report.output_path.display());
    println!(
        "  {} -> {} ({:.3}x) in {} blocks",
        format_bytes(stats.input_bytes),
        format_bytes(stats.output_bytes),
        stats.ratio(),
        stats.blocks,
    );

    let runtime = &stats.workers;
    let balance = runtime
        .workers
        .iter()
        .map(|worker| worker.tasks_completed)
        .fold(None, |range: Option<(usize, usize)>, tasks| match range {
            Some((low, high)) => Some((low.min(tasks), high.max(tasks))),
            None => Some((tasks, tasks)),
        });
    if let Some((low, high)) = balance {
        println!(
            "  workers: {} | tasks min/max {low}/{high} | completed {}",
            runtime.workers.len(),
            runtime.completed,
        );
    }
    for worker in &runtime.workers {
        tracing::debug!(
            worker_id = worker.worker_id,
            tasks = worker.tasks_completed,
            busy_ms = worker.busy.as_millis() as u64,
            utilization = worker.utilization,
            "worker runtime"
        );
    }
}

fn print_decompress_summary(report: &FileReport<DecompressStats>) {
    let stats = &report.stats;
    println!("Output file name: {}", report.output_path.display());
    println!(
        "  {} -> {} from {} blocks",
        format_bytes(stats.input_bytes),
        format_bytes(stats.output_bytes),
        stats.blocks,
    );
}

/// Parses a byte count with an optional K/M/G (or KB/MB/GB) suffix.
fn parse_size(value: &str) -> Result<usize, String> {
    let trimmed = value.trim();
    let digits_end = trimmed
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, suffix) = trimmed.split_at(digits_end);
    if digits.is_empty() {
        return Err(format!("invalid size: '{value}'"));
    }

    let base: usize = digits
        .parse()
        .map_err(|_| format!("invalid size number: '{value}'"))?;
    let shift = match suffix.trim().to_ascii_lowercase().as_str() {
        "" | "b" => 0,
        "k" | "kb" => 10,
        "m" | "mb" => 20,
        "g" | "gb" => 30,
        other => return Err(format!("invalid size suffix '{other}' in '{value}'")),
    };

    let size = base
        .checked_mul(1usize << shift)
        .ok_or_else(|| format!("size overflow: '{value}'"))?;
    if size == 0 {
        return Err("block size must be at least one byte".to_string());
    }
    Ok(size)
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{value:.2} {}", UNITS[unit]),
    }
}

/// Formats as `hh:mm:ss.mmm`.
fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60,
        duration.subsec_millis()
    )
}
