//! Text Chunker for the Illumine pipeline (spec §4.1).
//!
//! Splits a chapter's plain text into bounded-size chunks along natural
//! boundaries, using one of three strategies: [`ChunkStrategy::Paragraph`],
//! [`ChunkStrategy::Semantic`], or [`ChunkStrategy::Fixed`].
//!
//! ```
//! use illumine_text::{chunk, ChunkStrategy, ChunkerConfig};
//! use uuid::Uuid;
//!
//! let chapter_id = Uuid::new_v4();
//! let text = "The storm broke over the tower.\n\nLyra climbed the stairs.";
//! let chunks = chunk(chapter_id, text, ChunkStrategy::Paragraph, &ChunkerConfig::default()).unwrap();
//! assert_eq!(chunks[0].index, 0);
//! ```

mod chunker;
mod error;

pub use chunker::{chunk, ChunkStrategy, ChunkerConfig};
pub use error::{Error, Result};
