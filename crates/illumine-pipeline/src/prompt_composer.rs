//! Prompt Composer (spec §4.9): assembles a scene, its resolved entities
//! and style configuration into a single `Prompt`, and applies ordered
//! modification lists to derive new prompts from existing ones.

use std::sync::OnceLock;

use chrono::Utc;
use illumine_core::config::Thresholds;
use illumine_core::model::{
    EmotionalTone, Entity, EntityKind, ModificationOp, Prompt, PromptModification, PromptReference,
    Scene, TimeOfDay,
};
use regex::Regex;
use uuid::Uuid;

use crate::error::{Error, Result};

const TECHNICAL_MODIFIERS: &str = "high quality, detailed, professional artwork, masterpiece";

const NEGATIVE_BASE: &str = "low quality, blurry, pixelated, distorted, ugly, duplicate, mutated, \
extra limbs, missing limbs, bad anatomy, bad proportions, malformed, watermark, signature, text, logo";

const DISALLOWED_KEYWORDS: &[&str] = &["nsfw", "explicit", "gore", "csam"];

/// One entity resolved for a scene, carrying its selected reference images
/// and whether the mention that resolved it was a pronoun (pronoun
/// mentions are omitted from the character clause per §4.9).
#[derive(Debug, Clone)]
pub struct ResolvedMention {
    pub entity: Entity,
    pub references: Vec<PromptReference>,
    pub is_pronoun: bool,
}

fn time_of_day_label(tod: TimeOfDay) -> &'static str {
    match tod {
        TimeOfDay::Dawn => "dawn",
        TimeOfDay::Morning => "morning",
        TimeOfDay::Midday => "midday",
        TimeOfDay::Afternoon => "afternoon",
        TimeOfDay::Evening => "evening",
        TimeOfDay::Night => "night",
        TimeOfDay::Unknown => "indeterminate",
    }
}

fn tone_label(tone: EmotionalTone) -> &'static str {
    match tone {
        EmotionalTone::Joyful => "joyful",
        EmotionalTone::Tense => "tense",
        EmotionalTone::Somber => "somber",
        EmotionalTone::Romantic => "romantic",
        EmotionalTone::Ominous => "ominous",
        EmotionalTone::Peaceful => "peaceful",
        EmotionalTone::Triumphant => "triumphant",
        EmotionalTone::Neutral => "neutral",
    }
}

fn action_level_hint(action_level: f64) -> Option<&'static str> {
    if action_level > 0.6 {
        Some("high-energy action")
    } else if action_level < 0.2 {
        Some("quiet, still moment")
    } else {
        None
    }
}

fn scene_segment(scene: &Scene) -> String {
    let mut segment = scene.text.clone();
    segment.push_str(&format!(", {} lighting", time_of_day_label(scene.time_of_day)));
    segment.push_str(&format!(", {} atmosphere", tone_label(scene.emotional_tone)));
    if let Some(hint) = action_level_hint(scene.action_level) {
        segment.push_str(&format!(", {hint}"));
    }
    segment
}

fn character_clause(resolved: &[ResolvedMention]) -> Option<String> {
    let names: Vec<&str> = resolved
        .iter()
        .filter(|r| !r.is_pronoun && r.entity.kind == EntityKind::Character)
        .map(|r| r.entity.name.as_str())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(format!("featuring {}", names.join(", ")))
    }
}

fn location_clause(resolved: &[ResolvedMention]) -> Option<String> {
    let names: Vec<&str> = resolved
        .iter()
        .filter(|r| r.entity.kind == EntityKind::Location)
        .map(|r| r.entity.name.as_str())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(format!("set in {}", names.join(", ")))
    }
}

fn style_clause(style_preset: &str, custom_style: Option<&str>) -> String {
    let mut clause = crate::style::base_prompt(style_preset);
    if let Some(custom) = custom_style {
        clause.push_str(", ");
        clause.push_str(custom);
    }
    clause
}

fn negative_prompt(style_preset: &str) -> String {
    match crate::style::negative_extension(style_preset) {
        Some(extension) => format!("{NEGATIVE_BASE}, {extension}"),
        None => NEGATIVE_BASE.to_string(),
    }
}

fn normalize_text(text: &str) -> String {
    let collapsed_commas = text
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    collapsed_commas.split_whitespace().collect::<Vec<_>>().join(" ").replace(" ,", ",")
}

fn unique_word_ratio(text: &str) -> f64 {
    let words: Vec<String> = text.split_whitespace().map(|w| w.to_lowercase()).collect();
    if words.is_empty() {
        return 0.0;
    }
    let unique: std::collections::HashSet<&String> = words.iter().collect();
    unique.len() as f64 / words.len() as f64
}

fn validate(text: &str, thresholds: &Thresholds) -> std::result::Result<(), Vec<String>> {
    let mut issues = Vec::new();
    if text.len() < 10 || text.len() > thresholds.max_prompt_length {
        issues.push(format!(
            "prompt length {} outside [10, {}]",
            text.len(),
            thresholds.max_prompt_length
        ));
    }
    let word_count = text.split_whitespace().count();
    if word_count < 3 {
        issues.push(format!("word count {word_count} below minimum of 3"));
    }
    if unique_word_ratio(text) < 0.5 {
        issues.push("unique-word ratio below 0.5".to_string());
    }
    let lower = text.to_lowercase();
    for keyword in DISALLOWED_KEYWORDS {
        if lower.contains(keyword) {
            issues.push(format!("disallowed content keyword: {keyword}"));
        }
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// `compose(scene, resolved_links, style, custom_style?, artistic_direction?,
/// prior_chapter_context?, chapter_ordinal) -> Prompt` (§4.9).
pub fn compose(
    scene: &Scene,
    resolved: &[ResolvedMention],
    style_preset: &str,
    custom_style: Option<&str>,
    artistic_direction: Option<&str>,
    thresholds: &Thresholds,
) -> Result<Prompt> {
    let mut segments = vec![scene_segment(scene)];
    if let Some(clause) = character_clause(resolved) {
        segments.push(clause);
    }
    if let Some(clause) = location_clause(resolved) {
        segments.push(clause);
    }
    segments.push(style_clause(style_preset, custom_style));
    if let Some(direction) = artistic_direction {
        segments.push(direction.to_string());
    }
    segments.push(TECHNICAL_MODIFIERS.to_string());

    let text = normalize_text(&segments.join(", "));
    validate(&text, thresholds).map_err(Error::PromptValidationError)?;

    let references = resolved.iter().flat_map(|r| r.references.clone()).collect();

    Ok(Prompt {
        id: Uuid::new_v4(),
        scene_id: scene.id,
        text,
        negative_text: negative_prompt(style_preset),
        style_preset: style_preset.to_string(),
        references,
        technical: crate::style::technical_overrides(style_preset),
        parent_prompt_id: None,
        modification_history: Vec::new(),
    })
}

fn check_conflicts(modifications: &[ModificationOp]) -> std::result::Result<(), String> {
    let style_changes = modifications
        .iter()
        .filter(|m| matches!(m, ModificationOp::ChangeStyle { .. }))
        .count();
    if style_changes > 1 {
        return Err("more than one change_style in one request".to_string());
    }
    let mood_changes = modifications
        .iter()
        .filter(|m| matches!(m, ModificationOp::ChangeMood { .. }))
        .count();
    if mood_changes > 1 {
        return Err("more than one change_mood in one request".to_string());
    }

    let mut add_targets = Vec::new();
    let mut remove_targets = Vec::new();
    for modification in modifications {
        match modification {
            ModificationOp::AddElement { text } | ModificationOp::AddDetail { text } => {
                add_targets.push(text.to_lowercase());
            }
            ModificationOp::RemoveElement { text } | ModificationOp::RemoveDetail { text } => {
                remove_targets.push(text.to_lowercase());
            }
            _ => {}
        }
    }
    for add in &add_targets {
        for remove in &remove_targets {
            if add == remove || add.contains(remove.as_str()) || remove.contains(add.as_str()) {
                return Err(format!("add/remove target overlap on \"{add}\""));
            }
        }
    }
    Ok(())
}

fn remove_word_and_variants(text: &str, target: &str) -> String {
    let escaped = regex::escape(target);
    let re = Regex::new(&format!(r"(?i)\b{escaped}s?\b")).unwrap_or_else(|_| Regex::new(&escaped).unwrap());
    re.replace_all(text, "").to_string()
}

fn replace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)replace\s+"(.+?)"\s+with\s+"(.+?)""#).expect("static replace regex")
    })
}

fn apply_single(text: &mut String, style_preset: &mut String, op: &ModificationOp) {
    match op {
        ModificationOp::AddElement { text: addition } | ModificationOp::AddDetail { text: addition } => {
            if !text.to_lowercase().contains(&addition.to_lowercase()) {
                if !text.is_empty() {
                    text.push_str(", ");
                }
                text.push_str(addition);
            }
        }
        ModificationOp::RemoveElement { text: target } | ModificationOp::RemoveDetail { text: target } => {
            *text = remove_word_and_variants(text, target);
        }
        ModificationOp::ChangeStyle { style } => {
            for keyword in crate::style::known_style_keywords() {
                *text = text.replace(&keyword, "");
            }
            *text = format!("{}, {}", crate::style::base_prompt(style), text);
            *style_preset = style.clone();
        }
        ModificationOp::AdjustLighting { description } => {
            text.push_str(&format!(", {description} lighting"));
        }
        ModificationOp::ModifyCharacter { name, detail } => {
            text.push_str(&format!(", {name} {detail}"));
        }
        ModificationOp::ChangeMood { mood } => {
            text.push_str(&format!(", {mood} atmosphere"));
        }
        ModificationOp::AdjustComposition { description } => {
            text.push_str(&format!(", {description}"));
        }
        ModificationOp::Custom { description } => {
            if description.to_lowercase().contains("replace") {
                if let Some(caps) = replace_regex().captures(description) {
                    let target = regex::escape(&caps[1]);
                    if let Ok(re) = Regex::new(&format!("(?i){target}")) {
                        *text = re.replace_all(text, caps[2].to_string()).to_string();
                        return;
                    }
                }
            }
            text.push_str(&format!(", {description}"));
        }
    }
}

/// Apply an ordered modification list to `prompt`, producing a new `Prompt`
/// with `parent_prompt_id` set and the operations appended to the history.
pub fn apply_modifications(
    prompt: &Prompt,
    modifications: Vec<ModificationOp>,
    thresholds: &Thresholds,
) -> Result<Prompt> {
    check_conflicts(&modifications).map_err(Error::ConflictingModifications)?;

    let mut text = prompt.text.clone();
    let mut style_preset = prompt.style_preset.clone();
    let applied_at = Utc::now();
    let mut history = prompt.modification_history.clone();

    for op in &modifications {
        apply_single(&mut text, &mut style_preset, op);
        history.push(PromptModification {
            operation: op.clone(),
            applied_at,
        });
    }

    text = normalize_text(&text);
    validate(&text, thresholds).map_err(Error::PromptValidationError)?;

    Ok(Prompt {
        id: Uuid::new_v4(),
        scene_id: prompt.scene_id,
        text,
        negative_text: negative_prompt(&style_preset),
        style_preset,
        references: prompt.references.clone(),
        technical: prompt.technical,
        parent_prompt_id: Some(prompt.id),
        modification_history: history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> Scene {
        Scene {
            id: Uuid::new_v4(),
            chapter_id: Uuid::new_v4(),
            chunk_index: 0,
            scene_index: 0,
            text: "Lyra stood at the cliff's edge as the storm gathered".to_string(),
            summary: "storm gathers".to_string(),
            visual_score: 0.8,
            impact_score: 0.7,
            time_of_day: TimeOfDay::Night,
            emotional_tone: EmotionalTone::Tense,
            action_level: 0.7,
        }
    }

    fn resolved_character(name: &str, is_pronoun: bool) -> ResolvedMention {
        ResolvedMention {
            entity: Entity {
                id: Uuid::new_v4(),
                work_id: Uuid::new_v4(),
                name: name.to_string(),
                kind: EntityKind::Character,
                description: "a mage".to_string(),
                aliases: vec![],
                first_appearance_chapter: 1,
                active: true,
            },
            references: vec![],
            is_pronoun,
        }
    }

    #[test]
    fn compose_includes_scene_character_and_technical_segments() {
        let resolved = vec![resolved_character("Lyra", false), resolved_character("she", true)];
        let prompt = compose(&scene(), &resolved, "fantasy", None, None, &Thresholds::default()).unwrap();
        assert!(prompt.text.contains("featuring Lyra"));
        assert!(!prompt.text.contains("featuring Lyra, she"));
        assert!(prompt.text.contains("masterpiece"));
        assert!(prompt.negative_text.contains("low quality"));
    }

    #[test]
    fn disallowed_content_keyword_fails_validation() {
        let result = compose(
            &scene(),
            &[],
            "fantasy",
            None,
            Some("explicit nsfw content"),
            &Thresholds::default(),
        );
        assert!(matches!(result, Err(Error::PromptValidationError(_))));
    }

    #[test]
    fn conflicting_style_changes_are_rejected() {
        let prompt = compose(&scene(), &[], "fantasy", None, None, &Thresholds::default()).unwrap();
        let mods = vec![
            ModificationOp::ChangeStyle { style: "noir".into() },
            ModificationOp::ChangeStyle { style: "anime".into() },
        ];
        let result = apply_modifications(&prompt, mods, &Thresholds::default());
        assert!(matches!(result, Err(Error::ConflictingModifications(_))));
    }

    #[test]
    fn add_element_is_idempotent() {
        let prompt = compose(&scene(), &[], "fantasy", None, None, &Thresholds::default()).unwrap();
        let before = prompt.text.clone();
        let mods = vec![ModificationOp::AddElement {
            text: "masterpiece".into(),
        }];
        let after = apply_modifications(&prompt, mods, &Thresholds::default()).unwrap();
        assert_eq!(after.text.matches("masterpiece").count(), before.matches("masterpiece").count());
    }

    #[test]
    fn change_style_updates_style_field_and_text() {
        let prompt = compose(&scene(), &[], "fantasy", None, None, &Thresholds::default()).unwrap();
        let mods = vec![ModificationOp::ChangeStyle { style: "noir".into() }];
        let after = apply_modifications(&prompt, mods, &Thresholds::default()).unwrap();
        assert_eq!(after.style_preset, "noir");
        assert!(after.text.contains("noir art style"));
        assert_eq!(after.parent_prompt_id, Some(prompt.id));
    }
}
