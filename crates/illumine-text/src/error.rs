//! Error types for the chunker.

use thiserror::Error;

/// Errors that can occur while chunking chapter text.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid chunker configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input text was empty (spec §4.1 "Empty input fails with `EmptyInput`").
    #[error("empty input")]
    EmptyInput,

    /// Error from `illumine-core`.
    #[error("core error: {0}")]
    CoreError(#[from] illumine_core::Error),
}

/// Result type for the chunker.
pub type Result<T> = std::result::Result<T, Error>;
