use std::io::{Read, Seek, SeekFrom, Write};
use std::time::Instant;

use crate::codec;
use crate::telemetry::{self, tags};
use crate::types::duration_to_us;
use crate::{Result, ShardError};

use super::{Manifest, TRAILER_SIZE, Trailer};

/// Steps of container decoding, in the order they run.
///
/// Format errors carry the stage they were raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    ReadTrailer,
    LocateFooter,
    DecompressManifest,
    ParseManifest,
    ReconstructOffsets,
    EmitBlocks,
    Done,
}

/// Random-access reader over a gzshard container.
///
/// Opening the reader parses the trailer and manifest and builds the offset
/// table; blocks are then read and decompressed on demand.
#[derive(Debug)]
pub struct ContainerReader<R: Read + Seek> {
    reader: R,
    stage: DecodeStage,
    trailer: Trailer,
    manifest: Manifest,
    offsets: Vec<u64>,
    lengths: Vec<u64>,
    body_len: u64,
}

impl<R: Read + Seek> ContainerReader<R> {
    pub fn new(mut reader: R) -> Result<Self> {
        let file_len = reader.seek(SeekFrom::End(0))?;

        // ReadTrailer
        if file_len <= TRAILER_SIZE as u64 {
            return Err(ShardError::invalid(
                DecodeStage::ReadTrailer,
                "file too short to hold a trailer",
            ));
        }
        reader.seek(SeekFrom::Start(file_len - TRAILER_SIZE as u64))?;
        let trailer = Trailer::read(&mut reader)?;

        // LocateFooter
        let footer_region = file_len - TRAILER_SIZE as u64;
        if trailer.manifest_len == 0 || trailer.manifest_len > footer_region {
            return Err(ShardError::invalid(
                DecodeStage::LocateFooter,
                "manifest length points outside the file",
            ));
        }
        let body_len = footer_region - trailer.manifest_len;

        // DecompressManifest
        let manifest_len = usize::try_from(trailer.manifest_len).map_err(|_| {
            ShardError::invalid(DecodeStage::LocateFooter, "manifest exceeds usize range")
        })?;
        let mut compressed = vec![0u8; manifest_len];
        reader.seek(SeekFrom::Start(body_len))?;
        reader.read_exact(&mut compressed)?;
        let text = codec::reverse_compression(&compressed).map_err(|_| {
            ShardError::invalid(
                DecodeStage::DecompressManifest,
                "manifest is not a valid gzip stream",
            )
        })?;

        // ParseManifest
        let manifest = Manifest::parse(&text)?;
        if manifest.body_len() != Some(body_len) {
            return Err(ShardError::invalid(
                DecodeStage::ParseManifest,
                "manifest lengths do not add up to the body size",
            ));
        }

        // ReconstructOffsets
        let offsets = manifest.offsets()?;
        let mut lengths = vec![0u64; offsets.len()];
        for entry in manifest.entries() {
            lengths[entry.index] = entry.compressed_len;
        }

        tracing::debug!(
            target: tags::TARGET_FORMAT,
            file_len,
            body_len,
            manifest_len = trailer.manifest_len,
            blocks = manifest.len(),
            "container opened"
        );

        Ok(Self {
            reader,
            stage: DecodeStage::EmitBlocks,
            trailer,
            manifest,
            offsets,
            lengths,
            body_len,
        })
    }

    pub fn block_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn trailer(&self) -> Trailer {
        self.trailer
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Size of the body segment in bytes.
    pub fn body_len(&self) -> u64 {
        self.body_len
    }

    /// Total container size: body, compressed manifest and trailer.
    pub fn container_len(&self) -> u64 {
        self.body_len + self.trailer.manifest_len + TRAILER_SIZE as u64
    }

    /// `EmitBlocks` once opened, `Done` after [`emit_blocks`](Self::emit_blocks) succeeds.
    pub fn stage(&self) -> DecodeStage {
        self.stage
    }

    /// Body offset of the block with original index `index`.
    pub fn block_offset(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    /// Reads the compressed bytes of the block with original index `index`.
    pub fn read_block(&mut self, index: usize) -> Result<Vec<u8>> {
        let offset = self.block_offset(index).ok_or(ShardError::invalid(
            DecodeStage::EmitBlocks,
            "block index out of range",
        ))?;
        let len = usize::try_from(self.lengths[index]).map_err(|_| {
            ShardError::invalid(DecodeStage::EmitBlocks, "block length exceeds usize range")
        })?;

        self.reader.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; len];
        self.reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Reads and decompresses the block with original index `index`.
    pub fn decode_block(&mut self, index: usize) -> Result<Vec<u8>> {
        let compressed = self.read_block(index)?;
        codec::reverse_compression(&compressed)
            .map_err(|error| error.with_context(format!("block {index}")))
    }

    /// Iterates decompressed blocks in original-index order.
    pub fn iter_blocks(&mut self) -> BlockIterator<'_, R> {
        BlockIterator {
            reader: self,
            next_index: 0,
        }
    }

    /// Decompresses every block in original-index order into `writer`.
    ///
    /// Returns the number of bytes written.
    pub fn emit_blocks<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        let started_at = Instant::now();
        let mut written = 0u64;

        for index in 0..self.block_count() {
            let block = self.decode_block(index)?;
            writer.write_all(&block)?;
            written += block.len() as u64;
            telemetry::increment_counter(tags::METRIC_DECODER_BLOCK_COUNT, 1);
        }
        writer.flush()?;
        self.stage = DecodeStage::Done;

        tracing::debug!(
            target: tags::TARGET_FORMAT,
            blocks = self.block_count(),
            bytes = written,
            elapsed_us = duration_to_us(started_at.elapsed()),
            "container blocks emitted"
        );
        Ok(written)
    }
}

pub struct BlockIterator<'a, R: Read + Seek> {
    reader: &'a mut ContainerReader<R>,
    next_index: usize,
}

impl<R: Read + Seek> Iterator for BlockIterator<'_, R> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_index >= self.reader.block_count() {
            return None;
        }

        let current = self.next_index;
        self.next_index += 1;
        Some(self.reader.decode_block(current))
    }
}
