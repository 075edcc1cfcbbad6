use std::io::Write;

use flate2::Compression;
use serde::Serialize;

use crate::buffer::SlotBuffer;
use crate::format::{FooterBuilder, Manifest};
use crate::telemetry::{self, tags};
use crate::types::{CompressedBlock, Result};

/// Totals reported by a finished packer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PackStats {
    pub blocks: usize,
    pub body_bytes: u64,
    pub footer_bytes: u64,
}

impl PackStats {
    pub fn container_bytes(&self) -> u64 {
        self.body_bytes + self.footer_bytes
    }
}

/// Result of a packer run: the writer handed back plus what was written.
#[derive(Debug)]
pub struct PackOutcome<W> {
    pub writer: W,
    pub manifest: Manifest,
    pub stats: PackStats,
}

/// Writes compressed blocks to the container body in arrival order and
/// closes the container with the manifest footer.
pub struct Packer<W: Write> {
    writer: W,
    footer: FooterBuilder,
    manifest: Manifest,
    stats: PackStats,
}

impl<W: Write> Packer<W> {
    pub fn new(writer: W, level: Compression) -> Self {
        Self {
            writer,
            footer: FooterBuilder::new(level),
            manifest: Manifest::new(),
            stats: PackStats::default(),
        }
    }

    /// Appends one block to the body and records it in the manifest.
    pub fn write_block(&mut self, block: &CompressedBlock) -> Result<()> {
        self.writer.write_all(&block.data)?;
        let written = block.len() as u64;
        self.manifest.push(block.id, written);
        self.stats.blocks += 1;
        self.stats.body_bytes += written;

        telemetry::increment_counter(tags::METRIC_PACKER_BLOCK_COUNT, 1);
        telemetry::add_gauge(tags::METRIC_PACKER_BODY_BYTES, written);
        Ok(())
    }

    /// Writes the manifest footer and trailer, then flushes.
    pub fn finish(mut self) -> Result<PackOutcome<W>> {
        self.stats.footer_bytes = self.footer.write(&mut self.writer, &self.manifest)?;
        self.writer.flush()?;

        tracing::debug!(
            target: tags::TARGET_PIPELINE,
            blocks = self.stats.blocks,
            body_bytes = self.stats.body_bytes,
            footer_bytes = self.stats.footer_bytes,
            "container packed"
        );
        Ok(PackOutcome {
            writer: self.writer,
            manifest: self.manifest,
            stats: self.stats,
        })
    }

    /// Drains `slots` until it is empty and exhausted, then writes the footer.
    ///
    /// Any failure, panics included, aborts `slots` so the splitter and
    /// workers stop waiting.
    pub fn run(mut self, slots: &SlotBuffer) -> Result<PackOutcome<W>> {
        let _abort_guard = slots.abort_on_panic();
        let drained = self.drain(slots);
        match drained.and_then(|()| self.finish()) {
            Ok(outcome) => Ok(outcome),
            Err(error) => {
                slots.abort();
                Err(error)
            }
        }
    }

    fn drain(&mut self, slots: &SlotBuffer) -> Result<()> {
        while let Some(block) = slots.pop()? {
            self.write_block(&block)?;
        }
        Ok(())
    }
}
