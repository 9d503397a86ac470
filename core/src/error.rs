use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, writing, or reading an index.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The input collection could not be decoded into documents.
    #[error("failed to parse input documents: {0}")]
    InputParse(String),

    /// Two input records resolved to the same document reference.
    #[error("duplicate document id `{id}`")]
    DuplicateDocumentId { id: String },

    /// The artifact was written by a format version this build cannot read.
    #[error("unsupported index format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The artifact could not be persisted. Nothing was left at `path`.
    #[error("failed to write index to {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The artifact is truncated or its payload does not decode.
    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl IndexError {
    pub fn input_parse<E: std::fmt::Display>(err: E) -> Self {
        IndexError::InputParse(err.to_string())
    }

    pub fn corrupt<E: std::fmt::Display>(err: E) -> Self {
        IndexError::CorruptIndex(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
