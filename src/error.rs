//! Engine error types

use thiserror::Error;

/// Errors raised while building an engine, loading key records, or scanning.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("key '{}' is duplicated", String::from_utf8_lossy(.0))]
    DuplicateKey(Vec<u8>),

    #[error("invalid key set: {0}")]
    InvalidKey(String),

    #[error("separator not found in line {line}: '{}'", String::from_utf8_lossy(.record))]
    MalformedRecord { line: usize, record: Vec<u8> },

    #[error("got {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },

    #[error("buffer capacity {capacity} is too small, need at least {required} (twice the longest key)")]
    BufferTooSmall { capacity: usize, required: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
