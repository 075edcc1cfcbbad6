use std::time::Duration;

use bytes::Bytes;

use crate::error::ShardError;

pub type Result<T> = std::result::Result<T, ShardError>;

/// A contiguous range of the input file, tagged with its read-order index.
///
/// Blocks are produced by the splitter and handed to exactly one worker.
#[derive(Debug, Clone)]
pub struct Block {
    pub id: usize,
    pub data: Bytes,
}

impl Block {
    /// Creates a new block
    ///
    /// # Arguments
    /// * `id` - Original index of the block in read order
    /// * `data` - The raw bytes read from the input
    pub fn new(id: usize, data: Bytes) -> Self {
        Self { id, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the underlying data as a byte slice.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A compressed block waiting to be packed into the container body.
///
/// `id` is the original index of the source block, not its position in the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub id: usize,
    pub data: Vec<u8>,
    pub original_len: u64,
}

impl CompressedBlock {
    pub fn new(id: usize, data: Vec<u8>, original_len: u64) -> Self {
        Self {
            id,
            data,
            original_len,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub(crate) fn duration_to_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}
