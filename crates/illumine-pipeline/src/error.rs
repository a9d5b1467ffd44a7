//! Error types for the pipeline crate.

use thiserror::Error;

/// Errors produced while running a stage of the chapter pipeline.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The text model's structured reply for scene/entity extraction did
    /// not match the expected schema (§4.2, §9 "Duck-typed model responses").
    #[error("extraction format error: {0}")]
    ExtractionFormatError(String),

    /// An assembled prompt failed validation (§4.9).
    #[error("prompt validation failed: {0:?}")]
    PromptValidationError(Vec<String>),

    /// A modification list conflicted with itself (§4.9).
    #[error("conflicting modifications: {0}")]
    ConflictingModifications(String),

    /// An invariant documented in spec §3/§8 was violated.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// Error from `illumine-core`.
    #[error("core error: {0}")]
    CoreError(#[from] illumine_core::Error),

    /// Error from the chunker.
    #[error("chunker error: {0}")]
    ChunkerError(#[from] illumine_text::Error),
}

/// Result type for the pipeline crate.
pub type Result<T> = std::result::Result<T, Error>;
