//! Container format.
//!
//! ```text
//! [block bytes, body-write order][gzip(manifest text)][u64 BE manifest length]
//! ```

mod consts;
mod footer;
mod manifest;
mod reader;

pub use consts::{MANIFEST_FIELD_SEPARATOR, MANIFEST_RECORD_TERMINATOR, TRAILER_SIZE};
pub use footer::{FooterBuilder, Trailer};
pub use manifest::{Manifest, ManifestEntry};
pub use reader::{BlockIterator, ContainerReader, DecodeStage};
