//! Quality Assessor (spec §4.11): a four-axis weighted judge over a
//! generated image, modeled on `dashflow-evals`'s multi-dimensional judge.

use illumine_core::external::text_model::TextModel;
use illumine_core::model::{QualityReport, SafetyVerdict};
use uuid::Uuid;

use crate::error::Result;

const ADHERENCE_WEIGHT: f64 = 0.40;
const TECHNICAL_WEIGHT: f64 = 0.30;
const AESTHETIC_WEIGHT: f64 = 0.20;
const SAFETY_WEIGHT: f64 = 0.10;
const UNSAFE_CAP: f64 = 0.3;

/// Low-level image metrics a vision-analysis collaborator would supply.
/// These estimates are not part of the text-model contract (§6); treat
/// them as a development stub pending a dedicated vision analyzer.
#[derive(Debug, Clone)]
pub struct ImageMetrics {
    pub sharpness: f64,
    pub exposure: f64,
    pub composition: f64,
    pub artefacts: f64,
    pub style_consistency: f64,
    pub aesthetic_score: f64,
    pub safety_verdict: SafetyVerdict,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

fn dedup(mut items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.to_lowercase()));
    items
}

/// `assess(image, prompt, scene_context?) -> QualityReport` (§4.11).
pub async fn assess(
    image_id: Uuid,
    image_pointer: &str,
    prompt_text: &str,
    scene_context: Option<&str>,
    metrics: ImageMetrics,
    text_model: &dyn TextModel,
) -> Result<QualityReport> {
    let adherence = text_model
        .assess(image_pointer, prompt_text, scene_context.unwrap_or_default())
        .await?;
    let adherence_score = adherence.quality_score.clamp(0.0, 1.0);

    let technical_score = ((metrics.sharpness + metrics.exposure + metrics.composition
        + (1.0 - metrics.artefacts))
        / 4.0)
        .clamp(0.0, 1.0);

    let aesthetic_score =
        ((metrics.style_consistency + metrics.aesthetic_score) / 2.0).clamp(0.0, 1.0);

    let safety_numeric = match metrics.safety_verdict {
        SafetyVerdict::Safe => 1.0,
        SafetyVerdict::Unsafe => 0.0,
    };

    let mut overall = ADHERENCE_WEIGHT * adherence_score
        + TECHNICAL_WEIGHT * technical_score
        + AESTHETIC_WEIGHT * aesthetic_score
        + SAFETY_WEIGHT * safety_numeric;
    overall = overall.clamp(0.0, 1.0);
    if metrics.safety_verdict == SafetyVerdict::Unsafe {
        overall = overall.min(UNSAFE_CAP);
    }

    let mut issues = adherence.issues;
    issues.extend(metrics.issues);
    let mut suggestions = adherence.suggestions;
    suggestions.extend(metrics.suggestions);

    Ok(QualityReport {
        image_id,
        overall_score: overall,
        adherence_score,
        technical_score,
        aesthetic_score,
        safety_verdict: metrics.safety_verdict,
        issues: dedup(issues),
        suggestions: dedup(suggestions),
    })
}
