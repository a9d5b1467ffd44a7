//! Data model (spec §3). All identifiers are opaque and globally unique;
//! timestamps are UTC instants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Style preset name, e.g. `"fantasy"`, `"noir"`.
pub type StylePreset = String;

/// A whole ingested piece of prose, possibly multi-chapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Work {
    pub id: Uuid,
    pub title: String,
    pub style_preset: StylePreset,
    pub custom_style_modifier: Option<String>,
    pub content_type: ContentType,
    pub detection_metadata: DetectionMetadata,
    pub total_chapters: u32,
    pub status: WorkStatus,
}

/// Content-type classification produced by the parsing collaborator (§6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Single,
    Multi,
    FullBook,
}

/// Metadata the parsing collaborator reports about how it detected chapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DetectionMetadata {
    pub patterns: Vec<String>,
    pub structural_indicators: Vec<String>,
    pub word_count: u64,
    pub confidence: f64,
}

/// Overall status of a `Work`, mutated only by the scheduler (§4.13).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum WorkStatus {
    InProgress,
    Completed,
    Failed,
}

/// One chapter of a `Work`. Text is immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: Uuid,
    pub work_id: Uuid,
    pub ordinal: u32,
    pub title: Option<String>,
    pub text: String,
    pub word_count: u64,
    pub status: ChapterStatus,
}

/// `pending -> processing -> {completed, failed}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Boundary kind for a produced `Chunk` (§4.1).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    Natural,
    Forced,
}

/// A bounded-size slice of chapter text. Transient — not durable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub index: u32,
    pub text: String,
    pub boundary_kind: BoundaryKind,
}

/// Time-of-day enum a scene is normalized onto (§4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeOfDay {
    Dawn,
    Morning,
    Midday,
    Afternoon,
    Evening,
    Night,
    #[default]
    Unknown,
}

/// Emotional tone enum a scene is normalized onto (§4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmotionalTone {
    Joyful,
    Tense,
    Somber,
    Romantic,
    Ominous,
    Peaceful,
    Triumphant,
    #[default]
    Neutral,
}

/// A contiguous, visually-describable fragment of a chapter. Immutable once
/// scene extraction commits it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scene {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub chunk_index: u32,
    pub scene_index: u32,
    pub text: String,
    pub summary: String,
    pub visual_score: f64,
    pub impact_score: f64,
    pub time_of_day: TimeOfDay,
    pub emotional_tone: EmotionalTone,
    pub action_level: f64,
}

/// What kind of entity a `Mention` or `Entity` denotes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Character,
    Location,
}

/// A textual span hypothesized to refer to an entity, prior to resolution.
/// Transient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Mention {
    pub span_start: usize,
    pub span_end: usize,
    pub raw_text: String,
    pub surrounding_sentence: String,
    pub kind_hint: Option<EntityKind>,
    pub is_pronoun: bool,
}

/// The outcome of resolving one `Mention` against the known entity set
/// (§4.4). Durable as a scene<->entity edge only when resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityLink {
    pub scene_id: Uuid,
    pub mention_span: (usize, usize),
    pub resolved_entity_id: Option<Uuid>,
    pub confidence: f64,
    pub alternative_entity_ids: Vec<Uuid>,
    pub disambiguation_note: Option<String>,
}

/// A character or location tracked across a work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: Uuid,
    pub work_id: Uuid,
    pub name: String,
    pub kind: EntityKind,
    pub description: String,
    pub aliases: Vec<String>,
    pub first_appearance_chapter: u32,
    pub active: bool,
}

/// How a reference image was produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GenerationMethod {
    Ai,
    Uploaded,
    Extracted,
}

/// A stored visual anchor image for an entity. Never mutated, only
/// deactivated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityReference {
    pub id: Uuid,
    pub entity_id: Uuid,
    pub image_pointer: String,
    pub added_at_chapter: u32,
    pub age_tag: Option<String>,
    pub style_preset: StylePreset,
    pub description: String,
    pub active: bool,
    pub priority: i64,
    pub generation_method: GenerationMethod,
    pub quality_score: Option<f64>,
    pub source_prompt: Option<String>,
}

/// A structured diff between an entity's prior and current description.
/// Append-only per entity per chapter where the description changes
/// meaningfully.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvolutionRecord {
    pub entity_id: Uuid,
    pub at_chapter: u32,
    pub previous_description: String,
    pub new_description: String,
    pub updated: bool,
    pub changes: Vec<String>,
}

/// A reference image attached to a `Prompt`, with its blend weight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptReference {
    pub entity_id: Uuid,
    pub image_pointer: String,
    pub weight: f64,
    pub age_tag: Option<String>,
    pub description: String,
}

/// Technical generation parameters (§4.9).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TechnicalParameters {
    pub width: u32,
    pub height: u32,
    pub steps: u32,
    pub cfg_scale: f64,
    pub sampler: SamplerKind,
}

/// A named sampling algorithm for the image model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SamplerKind {
    Euler,
    EulerAncestral,
    Dpmpp2m,
    Ddim,
}

impl Default for TechnicalParameters {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            steps: 30,
            cfg_scale: 7.0,
            sampler: SamplerKind::EulerAncestral,
        }
    }
}

/// A single entry in a `Prompt`'s modification history (§4.9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptModification {
    pub operation: ModificationOp,
    pub applied_at: DateTime<Utc>,
}

/// The composed textual and technical input to the image model for one
/// scene attempt. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: Uuid,
    pub scene_id: Uuid,
    pub text: String,
    pub negative_text: String,
    pub style_preset: StylePreset,
    pub references: Vec<PromptReference>,
    pub technical: TechnicalParameters,
    pub parent_prompt_id: Option<Uuid>,
    pub modification_history: Vec<PromptModification>,
}

/// One operator in the modification list of §4.9's modification operator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ModificationOp {
    AddElement { text: String },
    RemoveElement { text: String },
    ChangeStyle { style: StylePreset },
    AdjustLighting { description: String },
    ModifyCharacter { name: String, detail: String },
    AddDetail { text: String },
    RemoveDetail { text: String },
    ChangeMood { mood: String },
    AdjustComposition { description: String },
    Custom { description: String },
}

/// Terminal/in-flight status of a `GeneratedImage`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum GeneratedImageStatus {
    Success,
    Error,
    InProgress,
}

/// One attempt at generating an image for a scene's prompt. Within a
/// scene, exactly one `GeneratedImage` is marked `selected`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedImage {
    pub id: Uuid,
    pub prompt_id: Uuid,
    pub scene_id: Uuid,
    pub image_pointer: Option<String>,
    pub status: GeneratedImageStatus,
    pub model_version: String,
    pub seed: Option<u64>,
    pub generation_time: DateTime<Utc>,
    pub cost: Option<f64>,
    pub error_detail: Option<String>,
    pub version: u32,
    pub replaced_image_id: Option<Uuid>,
    pub selected: bool,
}

/// A safety verdict attached to a `QualityReport`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SafetyVerdict {
    Safe,
    Unsafe,
}

/// Scores and notes produced once for each successful image (§4.11).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityReport {
    pub image_id: Uuid,
    pub overall_score: f64,
    pub adherence_score: f64,
    pub technical_score: f64,
    pub aesthetic_score: f64,
    pub safety_verdict: SafetyVerdict,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Lifecycle status for a `ChapterJob` (§4.13).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterJobStatus {
    Queued,
    WaitingForPrevious,
    Running,
    Completed,
    Failed,
}

/// Drives the scheduler's state machine for one chapter (§4.13).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterJob {
    pub id: Uuid,
    pub work_id: Uuid,
    pub chapter_ordinal: u32,
    pub status: ChapterJobStatus,
    pub prerequisite_ordinal: Option<u32>,
    pub priority: i64,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl ChapterJob {
    /// Construct the initial job for a chapter ordinal, per §4.13: ordinal 1
    /// starts `queued`; ordinal > 1 starts `waiting-for-previous` with
    /// `prerequisite_ordinal = ordinal - 1`.
    pub fn new(work_id: Uuid, chapter_ordinal: u32, priority: i64, created_at: DateTime<Utc>) -> Self {
        let (status, prerequisite_ordinal) = if chapter_ordinal == 1 {
            (ChapterJobStatus::Queued, None)
        } else {
            (
                ChapterJobStatus::WaitingForPrevious,
                Some(chapter_ordinal - 1),
            )
        };
        Self {
            id: Uuid::new_v4(),
            work_id,
            chapter_ordinal,
            status,
            prerequisite_ordinal,
            priority,
            created_at,
            started_at: None,
            completed_at: None,
            last_error: None,
        }
    }
}

/// An anchor paragraph-index attachment point for a generated image, per
/// the authoritative paragraph-index `EnhancementOrchestrator` variant
/// (spec §9 Open Questions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Anchor {
    pub chapter_id: Uuid,
    pub anchor_paragraph_index: u32,
    pub active_image_id: Option<Uuid>,
}
