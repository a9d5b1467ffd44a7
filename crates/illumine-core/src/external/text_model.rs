//! The text model contract (§6): three capabilities, all structured. An
//! unstructured response from a real provider must be rejected by that
//! provider's adapter before it ever reaches this trait's return type —
//! "all responses required to be structured" per spec §6 and §9's note on
//! duck-typed model responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{EntityKind, TimeOfDay};

/// Ambient context passed alongside a chunk to `extract_scenes` (§4.2).
#[derive(Debug, Clone, Default)]
pub struct SceneContext {
    pub work_title: String,
    pub style_preset: String,
    pub known_character_names: Vec<String>,
    pub known_location_names: Vec<String>,
}

/// One scene as reported by the text model, prior to normalization (§4.2).
/// `time_of_day`/`emotional_tone` are free-form strings here; the Scene
/// Extractor maps them onto the closed enums via its synonym table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedScene {
    pub text: String,
    pub summary: String,
    pub visual_score: f64,
    pub impact_score: f64,
    pub time_of_day: String,
    pub emotional_tone: String,
    #[serde(default)]
    pub dialogue_ratio: f64,
}

/// One character as reported by `extract_entities` (§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedEntity {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// One location as reported by `extract_entities` (§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedLocation {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", default)]
    pub location_type: String,
}

/// `extract_entities` response shape (§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtractedEntities {
    #[serde(default)]
    pub characters: Vec<ExtractedEntity>,
    #[serde(default)]
    pub locations: Vec<ExtractedLocation>,
}

/// `assess` response shape (§6), feeding the prompt-adherence axis of §4.11.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityAssessment {
    pub quality_score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// The three text-model capabilities the pipeline depends on (§6).
#[async_trait]
pub trait TextModel: Send + Sync {
    /// `extract_scenes(chunk_text, context, max) -> [scene]`.
    async fn extract_scenes(
        &self,
        chunk_text: &str,
        context: &SceneContext,
        max: usize,
    ) -> Result<Vec<ExtractedScene>, Error>;

    /// `extract_entities(scene_text, known_mentions) -> { characters, locations }`.
    async fn extract_entities(
        &self,
        scene_text: &str,
        known_mentions: &[String],
    ) -> Result<ExtractedEntities, Error>;

    /// `assess(image_pointer, prompt_text, scene_description) -> { quality_score, issues, suggestions }`.
    async fn assess(
        &self,
        image_pointer: &str,
        prompt_text: &str,
        scene_description: &str,
    ) -> Result<QualityAssessment, Error>;
}

/// A closed mapping table entry used when normalizing free-form
/// `time_of_day` strings onto [`TimeOfDay`] at the model boundary, per the
/// spec §9 instruction to normalize enums immediately at the boundary
/// rather than via ad-hoc string matching deeper in the pipeline.
pub fn normalize_time_of_day(raw: &str) -> TimeOfDay {
    let lower = raw.to_lowercase();
    match lower.as_str() {
        "dawn" | "daybreak" | "sunrise" => TimeOfDay::Dawn,
        "morning" | "forenoon" => TimeOfDay::Morning,
        "midday" | "noon" => TimeOfDay::Midday,
        "afternoon" => TimeOfDay::Afternoon,
        "evening" | "dusk" | "sunset" | "twilight" => TimeOfDay::Evening,
        "night" | "midnight" | "nighttime" => TimeOfDay::Night,
        _ => TimeOfDay::Unknown,
    }
}

/// A closed mapping table used when classifying a mention's kind hint,
/// deferring to the text model's own classification when available
/// (spec §9 Open Questions #1).
pub fn kind_hint_from_label(label: &str) -> Option<EntityKind> {
    match label.to_lowercase().as_str() {
        "character" | "person" | "character-name" => Some(EntityKind::Character),
        "location" | "place" => Some(EntityKind::Location),
        _ => None,
    }
}
