/// Width of the big-endian trailer holding the compressed manifest length.
pub const TRAILER_SIZE: usize = 8;
/// Separator between the index and length fields of a manifest record.
pub const MANIFEST_FIELD_SEPARATOR: char = ' ';
/// Terminator of each manifest record.
pub const MANIFEST_RECORD_TERMINATOR: char = '\n';
