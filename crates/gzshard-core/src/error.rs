use std::path::PathBuf;

use thiserror::Error;

use crate::format::DecodeStage;

#[derive(Debug, Error)]
pub enum ShardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("file \"{}\" does not exist", .0.display())]
    InputMissing(PathBuf),
    #[error("refusing to overwrite existing output file \"{}\"", .0.display())]
    OutputExists(PathBuf),
    #[error("not produced by this encoder: {reason} (stage {stage:?})")]
    InvalidFormat {
        stage: DecodeStage,
        reason: &'static str,
    },
    #[error("not produced by this encoder: malformed manifest line {line}: {reason}")]
    MalformedManifest { line: usize, reason: &'static str },
    #[error("compression error: {0}")]
    CompressionError(String),
    #[error("decompression error: {0}")]
    DecompressionError(String),
    #[error("pipeline aborted: {0}")]
    Aborted(&'static str),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ShardError>,
    },
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ShardError {
    pub(crate) fn invalid(stage: DecodeStage, reason: &'static str) -> Self {
        Self::InvalidFormat { stage, reason }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true when the error means the input is not a gzshard container.
    pub fn is_format_error(&self) -> bool {
        match self {
            Self::InvalidFormat { .. } | Self::MalformedManifest { .. } => true,
            Self::Context { source, .. } => source.is_format_error(),
            _ => false,
        }
    }
}
