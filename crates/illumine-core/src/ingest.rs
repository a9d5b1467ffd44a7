//! Ingest (§6 "Ingest API"): turns a parsing collaborator's [`ParseResult`]
//! into a [`Work`] and its [`Chapter`]s, applying the length-based split
//! the core itself is responsible for when the parser found no chapters.

use uuid::Uuid;

use crate::error::Error;
use crate::external::parsing::ParseResult;
use crate::model::{Chapter, ChapterStatus, ContentType, StylePreset, Work, WorkStatus};

/// Below this word count, an undetected-chapters document is kept as a
/// single chapter rather than length-split (§6).
const MIN_WORDS_FOR_SPLIT: u64 = 5000;
/// Target chapter size used by the length-based split, in words (§6:
/// `min(3000, total/3)`).
const TARGET_CHAPTER_WORDS: u64 = 3000;

fn split_target_words(total_words: u64) -> u64 {
    TARGET_CHAPTER_WORDS.min(total_words / 3).max(1)
}

/// Split `full_text` into roughly `target_words`-sized chapters on
/// whitespace boundaries. The last chapter absorbs any remainder.
fn length_based_split(full_text: &str, target_words: u64) -> Vec<(String, u64)> {
    let words: Vec<&str> = full_text.split_whitespace().collect();
    if words.is_empty() {
        return vec![(String::new(), 0)];
    }
    let target = target_words.max(1) as usize;
    words
        .chunks(target)
        .map(|chunk| (chunk.join(" "), chunk.len() as u64))
        .collect()
}

/// `ingest(parse_result, user_id, style_preset) -> { work, chapters }`
/// (§6). `user_id` is accepted for parity with the ingest API's request
/// body but is not part of the durable `Work`/`Chapter` model (§3).
pub fn ingest(parse_result: ParseResult, style_preset: StylePreset) -> Result<(Work, Vec<Chapter>), Error> {
    if parse_result.full_text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }

    let work_id = Uuid::new_v4();
    let total_words = parse_result.detection_metadata.word_count;

    let chapters: Vec<Chapter> = if parse_result.chapters.is_empty() {
        if total_words > MIN_WORDS_FOR_SPLIT {
            let target = split_target_words(total_words);
            length_based_split(&parse_result.full_text, target)
                .into_iter()
                .enumerate()
                .map(|(i, (content, word_count))| Chapter {
                    id: Uuid::new_v4(),
                    work_id,
                    ordinal: i as u32 + 1,
                    title: None,
                    text: content,
                    word_count,
                    status: ChapterStatus::Pending,
                })
                .collect()
        } else {
            vec![Chapter {
                id: Uuid::new_v4(),
                work_id,
                ordinal: 1,
                title: None,
                text: parse_result.full_text.clone(),
                word_count: total_words,
                status: ChapterStatus::Pending,
            }]
        }
    } else {
        parse_result
            .chapters
            .iter()
            .map(|c| Chapter {
                id: Uuid::new_v4(),
                work_id,
                ordinal: c.ordinal,
                title: c.title.clone(),
                text: c.content.clone(),
                word_count: c.word_count,
                status: ChapterStatus::Pending,
            })
            .collect()
    };

    let work = Work {
        id: work_id,
        title: parse_result.title,
        style_preset,
        custom_style_modifier: None,
        content_type: parse_result.content_type,
        detection_metadata: parse_result.detection_metadata,
        total_chapters: chapters.len() as u32,
        status: WorkStatus::InProgress,
    };

    Ok((work, chapters))
}

/// True when `extension` (without leading dot) is accepted by the ingest
/// API's format gate (§6); delegated parsing happens downstream.
pub fn is_supported_extension(extension: &str) -> bool {
    matches!(
        extension.to_lowercase().as_str(),
        "txt" | "pdf" | "docx" | "epub"
    )
}
