//! Development-stub collaborators: a deterministic `TextModel`, `ImageModel`
//! and `ParsingCollaborator` that let the CLI drive the whole chapter
//! pipeline without a real model or image provider wired up.

use std::sync::Arc;

use async_trait::async_trait;
use illumine_core::error::Error;
use illumine_core::external::image_model::{ImageJobStatus, ImageModel, ImagePollResult, ImageRequest};
use illumine_core::external::object_store::ObjectStore;
use illumine_core::external::parsing::{ParseResult, ParsingCollaborator};
use illumine_core::external::text_model::{
    ExtractedEntities, ExtractedEntity, ExtractedLocation, ExtractedScene, QualityAssessment,
    SceneContext, TextModel,
};
use illumine_core::model::{ContentType, DetectionMetadata};

const ACTION_WORDS: &[&str] = &[
    "ran", "fought", "shouted", "struck", "leaped", "grabbed", "charged", "threw", "slashed",
    "chased", "attacked", "fled", "screamed",
];
const LOCATION_WORDS: &[&str] = &[
    "castle", "tower", "forest", "village", "city", "mountain", "river", "valley", "kingdom",
    "temple", "palace", "harbor", "island", "cave", "bridge", "hall",
];
const NIGHT_WORDS: &[&str] = &["night", "midnight", "moon", "stars", "dark"];
const MORNING_WORDS: &[&str] = &["dawn", "morning", "sunrise"];

/// Splits a chunk of text on blank lines, falling back to a single segment,
/// and scores each candidate scene from simple lexical cues rather than a
/// real model call.
pub struct DevTextModel;

impl DevTextModel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DevTextModel {
    fn default() -> Self {
        Self::new()
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn count_hits(text: &str, words: &[&str]) -> usize {
    let lower = text.to_lowercase();
    words.iter().filter(|w| lower.contains(*w)).count()
}

fn guess_time_of_day(text: &str) -> &'static str {
    if count_hits(text, NIGHT_WORDS) > 0 {
        "night"
    } else if count_hits(text, MORNING_WORDS) > 0 {
        "morning"
    } else {
        "unknown"
    }
}

fn guess_tone(action_hits: usize) -> &'static str {
    if action_hits >= 2 {
        "tense"
    } else if action_hits == 0 {
        "peaceful"
    } else {
        "neutral"
    }
}

fn candidate_segments(chunk_text: &str) -> Vec<String> {
    let paragraphs: Vec<String> = chunk_text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    if paragraphs.len() > 1 {
        paragraphs
    } else {
        vec![chunk_text.trim().to_string()]
    }
}

#[async_trait]
impl TextModel for DevTextModel {
    async fn extract_scenes(
        &self,
        chunk_text: &str,
        _context: &SceneContext,
        max: usize,
    ) -> Result<Vec<ExtractedScene>, Error> {
        let scenes = candidate_segments(chunk_text)
            .into_iter()
            .take(max.max(1))
            .map(|text| {
                let action_hits = count_hits(&text, ACTION_WORDS);
                let words = word_count(&text).max(1) as f64;
                ExtractedScene {
                    visual_score: (0.4 + 0.05 * words.min(12.0)).clamp(0.0, 1.0),
                    impact_score: (0.3 + 0.1 * action_hits as f64).clamp(0.0, 1.0),
                    time_of_day: guess_time_of_day(&text).to_string(),
                    emotional_tone: guess_tone(action_hits).to_string(),
                    dialogue_ratio: if text.contains('"') { 0.2 } else { 0.0 },
                    summary: text.chars().take(80).collect(),
                    text,
                }
            })
            .collect();
        Ok(scenes)
    }

    async fn extract_entities(
        &self,
        scene_text: &str,
        known_mentions: &[String],
    ) -> Result<ExtractedEntities, Error> {
        let known_lower: std::collections::HashSet<String> =
            known_mentions.iter().map(|m| m.to_lowercase()).collect();

        let mut characters = Vec::new();
        let mut locations = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for word in scene_text.split_whitespace() {
            let trimmed: String = word.trim_matches(|c: char| !c.is_alphanumeric()).to_string();
            if trimmed.len() < 3 || !trimmed.chars().next().is_some_and(|c| c.is_uppercase()) {
                continue;
            }
            let lower = trimmed.to_lowercase();
            if known_lower.contains(&lower) || !seen.insert(lower.clone()) {
                continue;
            }
            if LOCATION_WORDS.iter().any(|w| lower.contains(w)) {
                locations.push(ExtractedLocation {
                    name: trimmed.clone(),
                    description: format!("a notable place called {trimmed}"),
                    location_type: "unspecified".to_string(),
                });
            } else {
                characters.push(ExtractedEntity {
                    name: trimmed.clone(),
                    description: format!("a figure named {trimmed}, introduced in this scene"),
                    aliases: Vec::new(),
                });
            }
        }

        Ok(ExtractedEntities { characters, locations })
    }

    async fn assess(
        &self,
        _image_pointer: &str,
        prompt_text: &str,
        scene_description: &str,
    ) -> Result<QualityAssessment, Error> {
        let overlap = scene_description
            .split_whitespace()
            .filter(|w| prompt_text.to_lowercase().contains(&w.to_lowercase()))
            .count();
        let quality_score = (0.6 + 0.02 * overlap as f64).clamp(0.0, 0.97);
        Ok(QualityAssessment {
            quality_score,
            issues: Vec::new(),
            suggestions: Vec::new(),
        })
    }
}

/// Simulates the image model as a synchronous submit-then-immediately-ready
/// service: `generate` writes a placeholder blob straight to the object
/// store and hands back its own pointer as the "job id", so the very first
/// `poll` reports success.
pub struct DevImageModel {
    object_store: Arc<dyn ObjectStore>,
}

impl DevImageModel {
    pub fn new(object_store: Arc<dyn ObjectStore>) -> Self {
        Self { object_store }
    }
}

#[async_trait]
impl ImageModel for DevImageModel {
    async fn generate(&self, request: &ImageRequest) -> Result<String, Error> {
        let placeholder = format!("placeholder-image-bytes for: {}", request.prompt).into_bytes();
        let pointer = self.object_store.put("generated", placeholder, "image/png").await?;
        Ok(pointer)
    }

    async fn poll(&self, job_id: &str) -> Result<ImagePollResult, Error> {
        Ok(ImagePollResult {
            status: ImageJobStatus::Succeeded,
            output_pointer: Some(job_id.to_string()),
            error: None,
            cost: Some(0.0),
        })
    }

    fn model_version(&self) -> String {
        "illumine-dev-image-model-v0".to_string()
    }
}

/// Parses plain text only; other formats are explicitly out of scope for
/// file-format parsing (spec §1 Non-goals) and are rejected here rather than
/// faked.
pub struct DevParser;

impl DevParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DevParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ParsingCollaborator for DevParser {
    async fn parse(&self, bytes: &[u8], extension: &str) -> Result<ParseResult, Error> {
        if extension.to_lowercase() != "txt" {
            return Err(Error::UnsupportedFormat(format!(
                "{extension} parsing is not implemented by the development parser"
            )));
        }
        let full_text = String::from_utf8_lossy(bytes).to_string();
        let title = full_text
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(|l| l.trim().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        let word_count = full_text.split_whitespace().count() as u64;

        Ok(ParseResult {
            title,
            full_text,
            chapters: Vec::new(),
            content_type: ContentType::Single,
            detection_metadata: DetectionMetadata {
                patterns: Vec::new(),
                structural_indicators: Vec::new(),
                word_count,
                confidence: 1.0,
            },
        })
    }
}
