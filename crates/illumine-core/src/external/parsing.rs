//! The parsing collaborator contract (§6). File format parsing itself is
//! explicitly out of scope (§1); this crate only depends on the contract.

use async_trait::async_trait;

use crate::error::Error;
use crate::model::{ContentType, DetectionMetadata};

/// One chapter as detected (or not) by the parsing collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedChapter {
    pub ordinal: u32,
    pub title: Option<String>,
    pub content: String,
    pub word_count: u64,
    pub span: (usize, usize),
}

/// The parsing collaborator's output.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub title: String,
    pub full_text: String,
    pub chapters: Vec<DetectedChapter>,
    pub content_type: ContentType,
    pub detection_metadata: DetectionMetadata,
}

/// `parse(bytes, extension) -> { title, full_text, chapters?, content_type, detection_metadata }`.
#[async_trait]
pub trait ParsingCollaborator: Send + Sync {
    /// Parse raw file bytes of the given extension (without the leading dot,
    /// e.g. `"pdf"`) into a `ParseResult`.
    async fn parse(&self, bytes: &[u8], extension: &str) -> Result<ParseResult, Error>;
}
