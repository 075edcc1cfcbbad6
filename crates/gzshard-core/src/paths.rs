use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::{Result, ShardError};

/// Suffix appended to every container file name.
pub const COMPRESSED_SUFFIX: &str = "gz";

/// Output path for compressing `input` to `output_base`.
///
/// Appends the input's extension and then the container suffix, so
/// `data.txt` compressed to `out` becomes `out.txt.gz`.
pub fn compressed_output_path(input: &Path, output_base: &Path) -> PathBuf {
    let mut name = OsString::from(output_base.as_os_str());
    if let Some(extension) = input.extension() {
        name.push(".");
        name.push(extension);
    }
    name.push(".");
    name.push(COMPRESSED_SUFFIX);
    PathBuf::from(name)
}

/// Output path for decompressing `input` to `output_base`.
///
/// Drops the container suffix and re-appends the inner extension, so
/// `out.txt.gz` decompressed to `restored` becomes `restored.txt`.
pub fn decompressed_output_path(input: &Path, output_base: &Path) -> PathBuf {
    let mut name = OsString::from(output_base.as_os_str());
    let inner_extension = input
        .file_stem()
        .map(Path::new)
        .and_then(Path::extension);
    if let Some(extension) = inner_extension {
        name.push(".");
        name.push(extension);
    }
    PathBuf::from(name)
}

pub fn ensure_input_exists(input: &Path) -> Result<()> {
    if input.is_file() {
        Ok(())
    } else {
        Err(ShardError::InputMissing(input.to_path_buf()))
    }
}

/// Creates `path` for writing, refusing to replace an existing file.
pub fn create_output(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|error| match error.kind() {
            ErrorKind::AlreadyExists => ShardError::OutputExists(path.to_path_buf()),
            _ => ShardError::Io(error),
        })
}
