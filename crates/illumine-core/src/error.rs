//! Error taxonomy shared across the pipeline (spec §7).

use thiserror::Error;

/// Errors produced by `illumine-core` and re-exported by downstream crates
/// under their own `CoreError`-style `#[from]` variant.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The input to a component was empty when a non-empty value was required.
    #[error("empty input")]
    EmptyInput,

    /// A file extension or declared content type is not one the parsing
    /// collaborator contract supports.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Input exceeded a configured size cap.
    #[error("oversized input: {actual} bytes exceeds cap of {cap} bytes")]
    OversizedInput {
        /// Size of the rejected input, in bytes.
        actual: usize,
        /// Configured cap, in bytes.
        cap: usize,
    },

    /// An assembled prompt failed validation (§4.9).
    #[error("prompt validation failed: {0:?}")]
    PromptValidationError(Vec<String>),

    /// A modification list could not be applied because it conflicted with
    /// itself or a prior modification (§4.9).
    #[error("conflicting modifications: {0}")]
    ConflictingModifications(String),

    /// A referenced record does not exist.
    #[error("not found: {kind} {id}")]
    NotFound {
        /// The kind of record (e.g. "entity", "chapter").
        kind: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// An operation was attempted on a job already in a terminal state that
    /// precludes it (e.g. retrying a job that is not `failed`).
    #[error("already completed: {0}")]
    AlreadyCompleted(String),

    /// A scheduler operation required a prerequisite state that was not met.
    #[error("prerequisite not met: {0}")]
    PrerequisiteNotMet(String),

    /// A call to an external collaborator failed in a way considered
    /// transient; callers may retry subject to their own retry policy.
    #[error("upstream transient error: {0}")]
    UpstreamTransient(String),

    /// A call to an external collaborator failed in a way considered
    /// permanent; retrying is not expected to help.
    #[error("upstream permanent error: {0}")]
    UpstreamPermanent(String),

    /// The text model returned output that did not match the expected
    /// structured schema for its capability.
    #[error("extraction format error: {0}")]
    ExtractionFormatError(String),

    /// A persistence-layer call failed.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// An object-store call failed.
    #[error("storage error: {0}")]
    StorageError(String),

    /// The image model reported that the prompt was blocked by content
    /// policy. Not retried; recorded on the `GeneratedImage`.
    #[error("content policy blocked: {0}")]
    ContentPolicyBlocked(String),

    /// An invariant documented in spec §3/§8 was violated. Always fatal to
    /// the enclosing chapter.
    #[error("invariant violated: {0}")]
    InvariantViolated(String),

    /// Configuration failed to load or did not pass validation.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    /// True for error kinds that are safe for an outer retry loop to act on,
    /// per spec §5 ("A hit deadline is classified retryable if and only if
    /// the call is known-idempotent... and the retry budget is non-zero").
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::UpstreamTransient(_))
    }
}

/// Result alias used throughout `illumine-core`.
pub type Result<T> = std::result::Result<T, Error>;
