use std::fmt::Write as _;

use crate::{Result, ShardError};

use super::{DecodeStage, MANIFEST_FIELD_SEPARATOR, MANIFEST_RECORD_TERMINATOR};

/// One manifest record: which original block sits at this body position,
/// and how many compressed bytes it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestEntry {
    pub index: usize,
    pub compressed_len: u64,
}

/// Positional index of a container body.
///
/// Entries are kept in body-write order, which is the order workers finished,
/// so entry `k` describes the `k`-th compressed block in the body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Appends a record for the block just written to the body.
    pub fn push(&mut self, index: usize, compressed_len: u64) {
        self.entries.push(ManifestEntry {
            index,
            compressed_len,
        });
    }

    /// Entries in body-write order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total compressed bytes described by the manifest, or `None` on overflow.
    pub fn body_len(&self) -> Option<u64> {
        self.entries
            .iter()
            .try_fold(0u64, |total, entry| total.checked_add(entry.compressed_len))
    }

    /// Serializes the manifest as `"<index> <length>\n"` records.
    pub fn to_text(&self) -> String {
        let mut text = String::with_capacity(self.entries.len() * 16);
        for entry in &self.entries {
            // Writing to a String cannot fail.
            let _ = write!(
                text,
                "{}{}{}{}",
                entry.index, MANIFEST_FIELD_SEPARATOR, entry.compressed_len, MANIFEST_RECORD_TERMINATOR
            );
        }
        text
    }

    /// Parses manifest plaintext.
    ///
    /// Every line must be exactly `<index><space><length>` with both fields
    /// unsigned decimal integers. The indices must cover `0..count` exactly
    /// once each, in any order.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| {
            ShardError::invalid(DecodeStage::ParseManifest, "manifest is not valid UTF-8")
        })?;

        let mut manifest = Self::new();
        for (line_no, line) in text.lines().enumerate() {
            let line_no = line_no + 1;
            let (index, length) = line.split_once(MANIFEST_FIELD_SEPARATOR).ok_or(
                ShardError::MalformedManifest {
                    line: line_no,
                    reason: "missing field separator",
                },
            )?;
            let index = parse_field(index).ok_or(ShardError::MalformedManifest {
                line: line_no,
                reason: "block index is not an unsigned integer",
            })?;
            let compressed_len = parse_field(length).ok_or(ShardError::MalformedManifest {
                line: line_no,
                reason: "block length is not an unsigned integer",
            })?;
            let index = usize::try_from(index).map_err(|_| ShardError::MalformedManifest {
                line: line_no,
                reason: "block index exceeds usize range",
            })?;
            manifest.push(index, compressed_len);
        }

        manifest.validate_indices()?;
        Ok(manifest)
    }

    /// Body offset of every block, indexed by original block index.
    ///
    /// A block's offset is the summed length of the entries that precede it
    /// in body order. Built in one pass over the entries.
    pub fn offsets(&self) -> Result<Vec<u64>> {
        let mut offsets = vec![None; self.entries.len()];
        let mut running = 0u64;
        for entry in &self.entries {
            let slot = offsets.get_mut(entry.index).ok_or(ShardError::invalid(
                DecodeStage::ReconstructOffsets,
                "block index outside manifest range",
            ))?;
            *slot = Some(running);
            running = running.checked_add(entry.compressed_len).ok_or(ShardError::invalid(
                DecodeStage::ReconstructOffsets,
                "block offsets overflow",
            ))?;
        }

        offsets
            .into_iter()
            .map(|offset| {
                offset.ok_or(ShardError::invalid(
                    DecodeStage::ReconstructOffsets,
                    "block index missing from manifest",
                ))
            })
            .collect()
    }

    /// Compressed length of the block with original index `index`.
    pub fn length_of(&self, index: usize) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.index == index)
            .map(|entry| entry.compressed_len)
    }

    fn validate_indices(&self) -> Result<()> {
        let mut seen = vec![false; self.entries.len()];
        for entry in &self.entries {
            match seen.get_mut(entry.index) {
                Some(flag) if *flag => {
                    return Err(ShardError::invalid(
                        DecodeStage::ParseManifest,
                        "duplicate block index in manifest",
                    ));
                }
                Some(flag) => *flag = true,
                None => {
                    return Err(ShardError::invalid(
                        DecodeStage::ParseManifest,
                        "block index outside manifest range",
                    ));
                }
            }
        }
        Ok(())
    }
}

fn parse_field(field: &str) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_matches_body_order() {
        let mut manifest = Manifest::new();
        manifest.push(2, 30);
        manifest.push(0, 10);
        manifest.push(1, 20);
        assert_eq!(manifest.to_text(), "2 30\n0 10\n1 20\n");
    }

    #[test]
    fn offsets_follow_body_order_not_index_order() -> Result<()> {
        let manifest = Manifest::parse(b"2 30\n0 10\n1 20\n")?;
        assert_eq!(manifest.offsets()?, vec![30, 40, 0]);
        assert_eq!(manifest.body_len(), Some(60));
        assert_eq!(manifest.length_of(1), Some(20));
        Ok(())
    }

    #[test]
    fn empty_text_is_empty_manifest() -> Result<()> {
        let manifest = Manifest::parse(b"")?;
        assert!(manifest.is_empty());
        assert!(manifest.offsets()?.is_empty());
        Ok(())
    }

    #[test]
    fn rejects_malformed_lines() {
        for (text, line) in [
            (&b"0 10\n1\n"[..], 2),
            (b"0 ten\n", 1),
            (b"-1 10\n", 1),
            (b"0 10 5\n", 1),
            (b"0  10\n", 1),
            (b"0 10\n\n1 5\n", 2),
        ] {
            match Manifest::parse(text) {
                Err(ShardError::MalformedManifest { line: got, .. }) => assert_eq!(got, line),
                other => panic!("expected malformed line {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn rejects_duplicate_and_missing_indices() {
        assert!(matches!(
            Manifest::parse(b"0 10\n0 10\n"),
            Err(ShardError::InvalidFormat { .. })
        ));
        assert!(matches!(
            Manifest::parse(b"0 10\n2 10\n"),
            Err(ShardError::InvalidFormat { .. })
        ));
    }
}
