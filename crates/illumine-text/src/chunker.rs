//! Text Chunker (spec §4.1): splits a chapter's plain text into
//! bounded-size chunks along natural boundaries.

use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use illumine_core::model::{BoundaryKind, Chunk};

use crate::error::{Error, Result};

/// Which splitting strategy to apply (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Split on blank-line boundaries, accumulating paragraphs.
    Paragraph,
    /// Like `Paragraph`, but also treats explicit scene breaks as preferred
    /// split points.
    Semantic,
    /// Grow chunks up to `max_size`, preferring sentence/word boundaries.
    Fixed,
}

/// Chunker configuration: `max_size` bounds every emitted chunk; `overlap`
/// is the number of trailing bytes of chunk *k* repeated as the head of
/// chunk *k+1* under the `Fixed` strategy (and for any paragraph re-split
/// under `Paragraph`/`Semantic`).
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_size: 2000,
            overlap: 100,
        }
    }
}

impl ChunkerConfig {
    /// Validate the configuration. `overlap` is capped at half of
    /// `max_size` so that fixed-splitting is always guaranteed to make
    /// forward progress.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::InvalidConfiguration(
                "max_size must be > 0".to_string(),
            ));
        }
        if self.overlap > self.max_size / 2 {
            return Err(Error::InvalidConfiguration(format!(
                "overlap ({}) must not exceed half of max_size ({})",
                self.overlap, self.max_size
            )));
        }
        Ok(())
    }
}

fn scene_break_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?mi)^(\*\*\*+|---+|#{1,6}\s+.+|chapter\s+\d+.*|part\s+\d+.*|\d+\.\s*)$",
        )
        .expect("static scene-break regex is valid")
    })
}

/// `chunk(text, strategy, max_size) -> ordered Chunk sequence` (§4.1).
pub fn chunk(
    chapter_id: Uuid,
    text: &str,
    strategy: ChunkStrategy,
    config: &ChunkerConfig,
) -> Result<Vec<Chunk>> {
    config.validate()?;
    if text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }

    let parts = match strategy {
        ChunkStrategy::Paragraph => paragraph_chunks(text, config, false),
        ChunkStrategy::Semantic => paragraph_chunks(text, config, true),
        ChunkStrategy::Fixed => fixed_split(text, config.max_size, config.overlap),
    };

    Ok(parts
        .into_iter()
        .enumerate()
        .map(|(index, (text, boundary_kind))| Chunk {
            id: Uuid::new_v4(),
            chapter_id,
            index: index as u32,
            text,
            boundary_kind,
        })
        .collect())
}

/// Split `text` into paragraphs on blank-line boundaries, then accumulate
/// paragraphs into chunks while the next paragraph fits within
/// `config.max_size`. When `recognize_scene_breaks` is set, a paragraph that
/// is itself nothing but a scene-break marker (`***`, `---`, a heading, a
/// `Chapter N`/`Part N` line, or a numbered section) forces a flush before
/// it, per the `Semantic` strategy.
fn paragraph_chunks(
    text: &str,
    config: &ChunkerConfig,
    recognize_scene_breaks: bool,
) -> Vec<(String, BoundaryKind)> {
    static BLANK_LINE: OnceLock<Regex> = OnceLock::new();
    let blank_line = BLANK_LINE.get_or_init(|| {
        Regex::new(r"\n[ \t]*\n+").expect("static blank-line regex is valid")
    });

    let paragraphs: Vec<&str> = blank_line
        .split(text)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let mut chunks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, chunks: &mut Vec<(String, BoundaryKind)>| {
        if !current.is_empty() {
            chunks.push((std::mem::take(current), BoundaryKind::Natural));
        }
    };

    for paragraph in paragraphs {
        let is_scene_break = recognize_scene_breaks && scene_break_regex().is_match(paragraph);

        if paragraph.len() > config.max_size {
            flush(&mut current, &mut chunks);
            for (sub_text, _) in fixed_split(paragraph, config.max_size, config.overlap) {
                chunks.push((sub_text, BoundaryKind::Forced));
            }
            continue;
        }

        if is_scene_break {
            flush(&mut current, &mut chunks);
            current.push_str(paragraph);
            continue;
        }

        let candidate_len = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + 2 + paragraph.len()
        };

        if candidate_len > config.max_size {
            flush(&mut current, &mut chunks);
            current.push_str(paragraph);
        } else {
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
    }
    flush(&mut current, &mut chunks);
    chunks
}

/// Grow chunks up to `max_size`; when splitting, prefer the latest
/// sentence-terminator (`.?!`), newline, or space within the last 20% of
/// the window; emit `overlap` bytes from the tail of chunk *k* as the head
/// of chunk *k+1* (§4.1 `Fixed`).
fn fixed_split(text: &str, max_size: usize, overlap: usize) -> Vec<(String, BoundaryKind)> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let remaining = len - start;
        if remaining <= max_size {
            chunks.push((text[start..].to_string(), BoundaryKind::Natural));
            break;
        }

        let window_end = start + max_size;
        let search_start = start + (max_size * 8 / 10).max(1);

        let mut split_at = None;
        let mut hit_sentence_terminator = false;
        for i in (search_start..window_end).rev() {
            if matches!(bytes[i], b'.' | b'?' | b'!') {
                split_at = Some(i + 1);
                hit_sentence_terminator = true;
                break;
            }
        }
        if split_at.is_none() {
            for i in (search_start..window_end).rev() {
                if bytes[i] == b'\n' {
                    split_at = Some(i + 1);
                    break;
                }
            }
        }
        if split_at.is_none() {
            for i in (search_start..window_end).rev() {
                if bytes[i] == b' ' {
                    split_at = Some(i + 1);
                    break;
                }
            }
        }
        let split_at = split_at.unwrap_or(window_end);

        let boundary = if hit_sentence_terminator {
            BoundaryKind::Natural
        } else {
            BoundaryKind::Forced
        };
        chunks.push((text[start..split_at].to_string(), boundary));

        start = split_at.saturating_sub(overlap).max(start + 1);
    }

    chunks
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn plain_text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 .]{20,500}"
    }

    proptest! {
        /// `|chunk.text| <= max_size` for every produced chunk, under any
        /// strategy (spec §8 quantified invariant).
        #[test]
        fn prop_no_chunk_exceeds_max_size(
            text in plain_text(),
            max_size in 50usize..400,
            strategy_index in 0usize..3,
        ) {
            let strategy = match strategy_index {
                0 => ChunkStrategy::Paragraph,
                1 => ChunkStrategy::Semantic,
                _ => ChunkStrategy::Fixed,
            };
            let config = ChunkerConfig { max_size, overlap: 0 };
            if let Ok(chunks) = chunk(Uuid::new_v4(), &text, strategy, &config) {
                for c in &chunks {
                    prop_assert!(c.text.len() <= max_size);
                }
            }
        }

        /// Non-overlapping fixed chunks concatenate back to the cleaned input.
        #[test]
        fn prop_fixed_zero_overlap_round_trips(
            text in plain_text(),
            max_size in 50usize..400,
        ) {
            let config = ChunkerConfig { max_size, overlap: 0 };
            if let Ok(chunks) = chunk(Uuid::new_v4(), &text, ChunkStrategy::Fixed, &config) {
                let reconstructed: String = chunks.iter().map(|c| c.text.as_str()).collect();
                prop_assert_eq!(reconstructed, text);
            }
        }
    }
}
