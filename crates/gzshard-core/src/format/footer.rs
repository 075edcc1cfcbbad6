use std::io::{Read, Write};

use flate2::Compression;

use crate::codec;
use crate::{Result, ShardError};

use super::{DecodeStage, Manifest, TRAILER_SIZE};

/// Fixed-width record closing every container.
///
/// Holds the byte length of the compressed manifest that sits directly
/// before it, so the manifest can be located from the end of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub manifest_len: u64,
}

impl Trailer {
    pub fn new(manifest_len: u64) -> Self {
        Self { manifest_len }
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; TRAILER_SIZE];
        reader.read_exact(&mut bytes).map_err(|_| {
            ShardError::invalid(DecodeStage::ReadTrailer, "truncated trailer")
        })?;
        Ok(Self::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; TRAILER_SIZE] {
        self.manifest_len.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; TRAILER_SIZE]) -> Self {
        Self {
            manifest_len: u64::from_be_bytes(bytes),
        }
    }
}

/// Compresses a finished manifest and closes the container with its trailer.
#[derive(Debug, Clone, Copy)]
pub struct FooterBuilder {
    level: Compression,
}

impl Default for FooterBuilder {
    fn default() -> Self {
        Self::new(Compression::default())
    }
}

impl FooterBuilder {
    pub fn new(level: Compression) -> Self {
        Self { level }
    }

    /// Returns the compressed manifest followed by the trailer.
    pub fn build(&self, manifest: &Manifest) -> Result<Vec<u8>> {
        let mut footer = codec::apply_compression(manifest.to_text().as_bytes(), self.level)?;
        let trailer = Trailer::new(footer.len() as u64);
        footer.extend_from_slice(&trailer.to_bytes());
        Ok(footer)
    }

    /// Appends the footer to `writer` and returns the number of bytes written.
    pub fn write<W: Write>(&self, writer: &mut W, manifest: &Manifest) -> Result<u64> {
        let footer = self.build(manifest)?;
        writer.write_all(&footer)?;
        Ok(footer.len() as u64)
    }
}
