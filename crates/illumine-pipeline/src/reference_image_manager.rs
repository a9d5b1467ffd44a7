//! Reference Image Manager (spec §4.8): keeps each entity's set of visual
//! anchor images, either generated or operator-uploaded.

use illumine_core::external::image_model::{ImageJobStatus, ImageModel, ImageRequest};
use illumine_core::external::object_store::ObjectStore;
use illumine_core::model::{Entity, EntityKind, EntityReference, GenerationMethod, TechnicalParameters};
use illumine_core::retry::{with_retry, RetryPolicy};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::submit_and_poll;

const MIN_UPLOAD_BYTES: usize = 1024;
const MIN_DIMENSION: u32 = 256;
const MAX_DIMENSION: u32 = 4096;
const SELECTION_WEIGHTS: [f64; 3] = [1.0, 0.8, 0.6];

const ROLE_MODIFIERS: &[(&str, &str)] = &[
    ("warrior", "battle-ready stance, weathered armor"),
    ("mage", "arcane robes, glowing sigils"),
    ("royal", "ornate regalia, regal posture"),
    ("young", "youthful features"),
    ("old", "weathered, aged features"),
    ("castle", "stone battlements in the background"),
    ("forest", "surrounded by dense foliage"),
];

fn role_modifiers_for(description: &str) -> Vec<&'static str> {
    let lower = description.to_lowercase();
    ROLE_MODIFIERS
        .iter()
        .filter(|(keyword, _)| lower.contains(keyword))
        .map(|(_, modifier)| *modifier)
        .collect()
}

fn compose_reference_prompt(entity: &Entity, style_preset: &str, age_tag: Option<&str>) -> String {
    let mut parts = vec![entity.description.clone()];
    if let Some(tag) = age_tag {
        parts.push(format!("{tag} appearance"));
    }
    parts.push(
        match entity.kind {
            EntityKind::Character => "full-body portrait, neutral expression, clear facial features",
            EntityKind::Location => "wide establishing shot, architectural detail",
        }
        .to_string(),
    );
    parts.extend(role_modifiers_for(&entity.description).into_iter().map(String::from));
    parts.push(crate::style::base_prompt(style_preset));
    parts.push("clean background, consistent design, multiple angles".to_string());
    parts.join(", ")
}

/// `ensure_reference(entity, style_preset, at_chapter, age_tag?, priority)` (§4.8).
pub async fn ensure_reference(
    entity: &Entity,
    style_preset: &str,
    at_chapter: u32,
    age_tag: Option<&str>,
    priority: i64,
    image_model: &dyn ImageModel,
    object_store: &dyn ObjectStore,
) -> Result<EntityReference> {
    let prompt = compose_reference_prompt(entity, style_preset, age_tag);
    let request = ImageRequest {
        prompt: prompt.clone(),
        negative: String::new(),
        technical: TechnicalParameters::default(),
        seed: None,
    };

    let policy = RetryPolicy::image_generation();
    let result = with_retry(&policy, || async { submit_and_poll(image_model, &request).await }).await?;

    if result.status != ImageJobStatus::Succeeded {
        return Err(Error::CoreError(illumine_core::Error::UpstreamPermanent(
            result.error.unwrap_or_else(|| "reference generation failed".to_string()),
        )));
    }
    let pointer = result
        .output_pointer
        .ok_or_else(|| Error::InvariantViolated("succeeded job carried no output pointer".into()))?;

    let blob = object_store.get(&pointer).await?;
    let path = format!("references/{}", Uuid::new_v4());
    let stored_pointer = object_store.put(&path, blob, "image/png").await?;

    Ok(EntityReference {
        id: Uuid::new_v4(),
        entity_id: entity.id,
        image_pointer: stored_pointer,
        added_at_chapter: at_chapter,
        age_tag: age_tag.map(str::to_string),
        style_preset: style_preset.to_string(),
        description: entity.description.clone(),
        active: true,
        priority,
        generation_method: GenerationMethod::Ai,
        quality_score: None,
        source_prompt: Some(prompt),
    })
}

/// `ingest_upload(blob, entity_id?)` (§4.8).
pub async fn ingest_upload(
    entity_id: Uuid,
    blob: Vec<u8>,
    content_type: &str,
    dimensions: (u32, u32),
    style_preset: &str,
    at_chapter: u32,
    max_bytes: usize,
    object_store: &dyn ObjectStore,
) -> Result<EntityReference> {
    if blob.len() < MIN_UPLOAD_BYTES || blob.len() > max_bytes {
        return Err(Error::InvariantViolated(format!(
            "upload size {} bytes outside [{}, {}]",
            blob.len(),
            MIN_UPLOAD_BYTES,
            max_bytes
        )));
    }
    if !matches!(content_type, "image/jpeg" | "image/png" | "image/webp") {
        return Err(Error::InvariantViolated(format!(
            "unsupported upload content type: {content_type}"
        )));
    }
    let (width, height) = dimensions;
    if width < MIN_DIMENSION || width > MAX_DIMENSION || height < MIN_DIMENSION || height > MAX_DIMENSION
    {
        return Err(Error::InvariantViolated(format!(
            "upload dimensions {width}x{height} outside [{MIN_DIMENSION}, {MAX_DIMENSION}] per side"
        )));
    }

    let path = format!("uploads/{}", Uuid::new_v4());
    let pointer = object_store.put(&path, blob, content_type).await?;

    Ok(EntityReference {
        id: Uuid::new_v4(),
        entity_id,
        image_pointer: pointer,
        added_at_chapter: at_chapter,
        age_tag: None,
        style_preset: style_preset.to_string(),
        description: String::new(),
        active: true,
        priority: 0,
        generation_method: GenerationMethod::Uploaded,
        quality_score: None,
        source_prompt: None,
    })
}

/// Selection for the prompt composer (§4.8 "Selection"): up to the top 3
/// active references for an entity's style preset, by priority desc, ties
/// broken by most recent `added_at_chapter`, weighted `{1.0, 0.8, 0.6}`.
pub fn select_active(references: &[EntityReference], style_preset: &str) -> Vec<(&EntityReference, f64)> {
    let mut candidates: Vec<&EntityReference> = references
        .iter()
        .filter(|r| r.active && r.style_preset == style_preset)
        .collect();

    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.added_at_chapter.cmp(&a.added_at_chapter))
    });

    candidates
        .into_iter()
        .take(SELECTION_WEIGHTS.len())
        .zip(SELECTION_WEIGHTS)
        .collect()
}
