//! Scene Extractor (spec §4.2): asks the text model for visually
//! compelling scenes in a chunk, then filters and normalizes them.

use std::sync::OnceLock;

use illumine_core::config::Thresholds;
use illumine_core::external::text_model::{normalize_time_of_day, ExtractedScene, SceneContext, TextModel};
use illumine_core::model::{Chunk, EmotionalTone, Scene};
use uuid::Uuid;

use crate::error::{Error, Result};

const MIN_CHUNK_CHARS: usize = 100;

const ACTION_WORDS: &[&str] = &[
    "ran", "fought", "shouted", "struck", "leaped", "grabbed", "charged", "threw", "slashed",
    "dodged", "exploded", "crashed", "chased", "attacked", "fled", "screamed", "fired",
    "collided", "stormed", "wrestled", "lunged", "sprinted", "hurled", "smashed",
];

/// `extract(chunk, work_context, max_scenes) -> ordered Scene sequence` (§4.2).
pub async fn extract(
    chunk: &Chunk,
    context: &SceneContext,
    max_scenes: usize,
    model: &dyn TextModel,
    thresholds: &Thresholds,
) -> Result<Vec<Scene>> {
    if chunk.text.trim().len() < MIN_CHUNK_CHARS {
        return Ok(Vec::new());
    }

    let extracted = model
        .extract_scenes(&chunk.text, context, max_scenes)
        .await
        .map_err(|e| match e {
            illumine_core::Error::ExtractionFormatError(detail) => {
                Error::ExtractionFormatError(detail)
            }
            other => Error::CoreError(other),
        })?;

    let mut scenes: Vec<Scene> = extracted
        .into_iter()
        .enumerate()
        .filter_map(|(i, raw)| normalize(chunk, i as u32, raw, thresholds))
        .collect();

    scenes.sort_by(|a, b| {
        b.impact_score
            .partial_cmp(&a.impact_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (i, scene) in scenes.iter_mut().enumerate() {
        scene.scene_index = i as u32;
    }

    Ok(scenes)
}

fn normalize(
    chunk: &Chunk,
    input_order: u32,
    raw: ExtractedScene,
    thresholds: &Thresholds,
) -> Option<Scene> {
    let visual_score = raw.visual_score.clamp(0.0, 1.0);
    let impact_score = raw.impact_score.clamp(0.0, 1.0);
    if visual_score < thresholds.min_visual_score || impact_score < thresholds.min_impact_score {
        return None;
    }

    let time_of_day = normalize_time_of_day(&raw.time_of_day);
    let emotional_tone = normalize_emotional_tone(&raw.emotional_tone);
    let action_level = action_level_for(&raw.text, emotional_tone, raw.dialogue_ratio);

    Some(Scene {
        id: Uuid::new_v4(),
        chapter_id: chunk.chapter_id,
        chunk_index: chunk.index,
        scene_index: input_order,
        text: raw.text,
        summary: raw.summary,
        visual_score,
        impact_score,
        time_of_day,
        emotional_tone,
        action_level,
    })
}

fn normalize_emotional_tone(raw: &str) -> EmotionalTone {
    match raw.to_lowercase().as_str() {
        "joyful" | "happy" | "joyous" | "elated" => EmotionalTone::Joyful,
        "tense" | "anxious" | "suspenseful" => EmotionalTone::Tense,
        "somber" | "sad" | "melancholy" | "grim" => EmotionalTone::Somber,
        "romantic" | "tender" | "intimate" => EmotionalTone::Romantic,
        "ominous" | "foreboding" | "dreadful" => EmotionalTone::Ominous,
        "peaceful" | "calm" | "serene" => EmotionalTone::Peaceful,
        "triumphant" | "victorious" | "exultant" => EmotionalTone::Triumphant,
        _ => EmotionalTone::Neutral,
    }
}

fn tone_bonus(tone: EmotionalTone) -> f64 {
    match tone {
        EmotionalTone::Tense | EmotionalTone::Triumphant | EmotionalTone::Ominous => 0.2,
        EmotionalTone::Peaceful | EmotionalTone::Romantic => -0.1,
        EmotionalTone::Joyful | EmotionalTone::Somber | EmotionalTone::Neutral => 0.0,
    }
}

fn action_words_re() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let words = ACTION_WORDS.join("|");
        regex::Regex::new(&format!(r"(?i)\b(?:{words})\b")).expect("static action-word regex")
    })
}

fn action_level_for(text: &str, tone: EmotionalTone, dialogue_ratio: f64) -> f64 {
    let hits = action_words_re().find_iter(text).count() as f64;
    let dialogue_penalty = if dialogue_ratio > 0.1 { 0.1 } else { 0.0 };
    (0.1 * hits + tone_bonus(tone) - dialogue_penalty).clamp(0.0, 1.0)
}
