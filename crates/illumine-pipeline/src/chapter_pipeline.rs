//! Chapter Pipeline (spec §4.12): the orchestrator that drives one chapter
//! through chunking, scene extraction, entity resolution, prompt
//! composition, image generation and quality assessment, in the teacher's
//! `Arc<dyn Trait>`-collaborator orchestrator idiom.

use std::collections::HashMap;
use std::sync::Arc;

use illumine_core::config::Thresholds;
use illumine_core::external::image_model::ImageModel;
use illumine_core::external::object_store::ObjectStore;
use illumine_core::external::persistence::{
    ChapterJobRepository, ChapterRepository, EntityLinkRepository, EntityReferenceRepository,
    EntityRepository, EvolutionRecordRepository, GeneratedImageRepository, PromptRepository,
    QualityReportRepository, Repository, SceneRepository, WorkRepository, WorkScopedFilter,
};
use illumine_core::external::text_model::{SceneContext, TextModel};
use illumine_core::model::{
    Chapter, ChapterStatus, Entity, EntityReference, GeneratedImage, Prompt, QualityReport,
    SafetyVerdict, Scene,
};
use illumine_text::{ChunkStrategy, ChunkerConfig};
use uuid::Uuid;

use crate::entity_extractor;
use crate::entity_merger;
use crate::entity_resolver;
use crate::error::{Error, Result};
use crate::evolution_tracker;
use crate::mention_finder;
use crate::prompt_composer::{self, ResolvedMention};
use crate::quality_assessor::{self, ImageMetrics};
use crate::reference_image_manager;
use crate::scene_extractor;

/// Continuity carried forward from a chapter's predecessor (§4.12 step 2).
/// Entity descriptions and reference pointers are already folded into the
/// work-scoped known-entity set loaded independently in step 3; this
/// struct carries what is not: the predecessor's own scenes and any
/// cumulative style notes.
#[derive(Debug, Clone, Default)]
pub struct PriorChapterContext {
    pub scenes: Vec<Scene>,
    pub style_notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub style_preset: String,
    pub custom_style: Option<String>,
    pub artistic_direction: Option<String>,
    pub chunk_strategy: ChunkStrategy,
    pub chunker_config: ChunkerConfig,
    pub max_scenes_per_chunk: usize,
    pub replace_existing_images: bool,
    pub prior_context: Option<PriorChapterContext>,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            style_preset: "fantasy".to_string(),
            custom_style: None,
            artistic_direction: None,
            chunk_strategy: ChunkStrategy::Paragraph,
            chunker_config: ChunkerConfig::default(),
            max_scenes_per_chunk: 3,
            replace_existing_images: false,
            prior_context: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChapterOutcome {
    pub chapter: Chapter,
    pub scenes: Vec<Scene>,
    pub entities: Vec<Entity>,
    pub images: Vec<GeneratedImage>,
    pub quality_reports: Vec<QualityReport>,
}

/// Collaborators the Chapter Pipeline drives, held as `Arc<dyn Trait>` the
/// way a `dashflow-chains` sequential chain holds its component steps.
pub struct ChapterPipeline {
    pub text_model: Arc<dyn TextModel>,
    pub image_model: Arc<dyn ImageModel>,
    pub object_store: Arc<dyn ObjectStore>,
    pub works: Arc<dyn WorkRepository>,
    pub chapters: Arc<dyn ChapterRepository>,
    pub scenes: Arc<dyn SceneRepository>,
    pub entities: Arc<dyn EntityRepository>,
    pub entity_links: Arc<dyn EntityLinkRepository>,
    pub entity_references: Arc<dyn EntityReferenceRepository>,
    pub evolution_records: Arc<dyn EvolutionRecordRepository>,
    pub prompts: Arc<dyn PromptRepository>,
    pub images: Arc<dyn GeneratedImageRepository>,
    pub quality_reports: Arc<dyn QualityReportRepository>,
    pub chapter_jobs: Arc<dyn ChapterJobRepository>,
    pub thresholds: Thresholds,
}

impl ChapterPipeline {
    fn work_filter(work_id: Uuid) -> WorkScopedFilter {
        WorkScopedFilter {
            work_id: Some(work_id),
            chapter_id: None,
        }
    }

    /// `process_chapter(chapter_id, options) -> {chapter, scenes, entities,
    /// images, quality reports}` (§4.12).
    pub async fn process_chapter(
        &self,
        chapter_id: Uuid,
        options: ProcessOptions,
    ) -> Result<ChapterOutcome> {
        let mut chapter = self
            .chapters
            .get(&chapter_id)
            .await?
            .ok_or_else(|| Error::CoreError(illumine_core::Error::NotFound {
                kind: "chapter",
                id: chapter_id.to_string(),
            }))?;
        let work = self
            .works
            .get(&chapter.work_id)
            .await?
            .ok_or_else(|| Error::CoreError(illumine_core::Error::NotFound {
                kind: "work",
                id: chapter.work_id.to_string(),
            }))?;

        chapter.status = ChapterStatus::Processing;
        self.chapters.upsert(chapter.clone()).await?;

        match self.run(&chapter, &work, &options).await {
            Ok(outcome) => {
                chapter.status = ChapterStatus::Completed;
                self.chapters.upsert(chapter.clone()).await?;
                Ok(ChapterOutcome { chapter, ..outcome })
            }
            Err(e) => {
                chapter.status = ChapterStatus::Failed;
                self.chapters.upsert(chapter.clone()).await?;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        chapter: &Chapter,
        work: &illumine_core::model::Work,
        options: &ProcessOptions,
    ) -> Result<ChapterOutcome> {
        let mut known_entities: Vec<Entity> = self
            .entities
            .list(&Self::work_filter(work.id))
            .await?
            .into_iter()
            .filter(|e| e.active)
            .collect();

        let chunks = illumine_text::chunk(
            chapter.id,
            &chapter.text,
            options.chunk_strategy,
            &options.chunker_config,
        )?;

        let scene_context = SceneContext {
            work_title: work.title.clone(),
            style_preset: options.style_preset.clone(),
            known_character_names: known_entities
                .iter()
                .filter(|e| e.kind == illumine_core::model::EntityKind::Character)
                .map(|e| e.name.clone())
                .collect(),
            known_location_names: known_entities
                .iter()
                .filter(|e| e.kind == illumine_core::model::EntityKind::Location)
                .map(|e| e.name.clone())
                .collect(),
        };

        let mut all_scenes = Vec::new();
        let mut all_images = Vec::new();
        let mut all_quality_reports = Vec::new();
        let mut existing_images_by_scene: Vec<GeneratedImage> = Vec::new();

        for chunk in &chunks {
            let scenes = scene_extractor::extract(
                chunk,
                &scene_context,
                options.max_scenes_per_chunk,
                self.text_model.as_ref(),
                &self.thresholds,
            )
            .await?;

            for scene in scenes {
                self.scenes.upsert(scene.clone()).await?;

                let mentions = mention_finder::find_mentions(&scene.text);

                // First pass: resolve against the entity set known coming
                // into this scene, to find what the Entity Extractor needs
                // to look at.
                let prelim_links =
                    entity_resolver::resolve(scene.id, &mentions, &known_entities, &self.thresholds);
                let prelim_link_by_span: HashMap<(usize, usize), &illumine_core::model::EntityLink> =
                    prelim_links.iter().map(|l| (l.mention_span, l)).collect();
                let unresolved: Vec<_> = mentions
                    .iter()
                    .filter(|m| {
                        prelim_link_by_span
                            .get(&(m.span_start, m.span_end))
                            .is_some_and(|l| l.resolved_entity_id.is_none())
                    })
                    .cloned()
                    .collect();

                let known_mention_strings: Vec<String> =
                    known_entities.iter().map(|e| e.name.clone()).collect();
                let new_entities = entity_extractor::extract_new(
                    work.id,
                    chapter.ordinal,
                    &scene.text,
                    &unresolved,
                    &known_mention_strings,
                    self.text_model.as_ref(),
                )
                .await?;

                let previous_entities = known_entities.clone();
                known_entities = entity_merger::merge(new_entities, known_entities);
                for entity in &known_entities {
                    self.entities.upsert(entity.clone()).await?;
                    if let Some(previous) = previous_entities.iter().find(|p| p.id == entity.id) {
                        if previous.description != entity.description {
                            if let Some(record) =
                                evolution_tracker::track(previous, &entity.description, chapter.ordinal)
                            {
                                self.evolution_records.upsert(record).await?;
                            }
                        }
                    }
                }

                // Second pass, against the now-merged entity set: per §8's
                // invariant, a scene's resolved entities include those
                // merged during the scene itself. These are the links
                // persisted as the scene's entity edges.
                let links = entity_resolver::resolve(scene.id, &mentions, &known_entities, &self.thresholds);

                // A recurring name produces one Mention per sentence it
                // appears in, each resolving independently to the same
                // entity; collapse those down to the single
                // highest-confidence link per entity so a scene never
                // persists two resolved EntityLinks for the same
                // resolved-entity-id (spec §3) and a prompt never lists the
                // same entity's reference twice.
                let mut best_by_entity: HashMap<Uuid, illumine_core::model::EntityLink> = HashMap::new();
                let mut unresolved_links = Vec::new();
                for link in links {
                    match link.resolved_entity_id {
                        Some(entity_id) => {
                            best_by_entity
                                .entry(entity_id)
                                .and_modify(|kept| {
                                    if link.confidence > kept.confidence {
                                        *kept = link.clone();
                                    }
                                })
                                .or_insert(link);
                        }
                        None => unresolved_links.push(link),
                    }
                }
                let mut deduped_links: Vec<illumine_core::model::EntityLink> =
                    best_by_entity.values().cloned().chain(unresolved_links).collect();
                deduped_links.sort_by_key(|l| l.mention_span);

                for link in &deduped_links {
                    self.entity_links.upsert(link.clone()).await?;
                }

                let mut resolved_links: Vec<&illumine_core::model::EntityLink> =
                    best_by_entity.values().collect();
                resolved_links.sort_by_key(|l| l.mention_span);

                let mut resolved_mentions = Vec::new();
                for link in resolved_links {
                    let Some(entity_id) = link.resolved_entity_id else {
                        continue;
                    };
                    let Some(entity) = known_entities.iter().find(|e| e.id == entity_id) else {
                        continue;
                    };
                    let is_pronoun = mentions
                        .iter()
                        .find(|m| (m.span_start, m.span_end) == link.mention_span)
                        .is_some_and(|m| m.is_pronoun);

                    let existing_refs: Vec<EntityReference> = self
                        .entity_references
                        .list(&Self::work_filter(work.id))
                        .await?
                        .into_iter()
                        .filter(|r| r.entity_id == entity.id)
                        .collect();

                    if !existing_refs
                        .iter()
                        .any(|r| r.active && r.style_preset == options.style_preset)
                    {
                        match reference_image_manager::ensure_reference(
                            entity,
                            &options.style_preset,
                            chapter.ordinal,
                            None,
                            0,
                            self.image_model.as_ref(),
                            self.object_store.as_ref(),
                        )
                        .await
                        {
                            Ok(reference) => {
                                self.entity_references.upsert(reference).await?;
                            }
                            Err(e) => {
                                tracing::warn!(entity = %entity.name, error = %e, "reference generation failed, skipping");
                            }
                        }
                    }

                    let refs_for_style: Vec<EntityReference> = self
                        .entity_references
                        .list(&Self::work_filter(work.id))
                        .await?
                        .into_iter()
                        .filter(|r| r.entity_id == entity.id)
                        .collect();
                    let selected = reference_image_manager::select_active(
                        &refs_for_style,
                        &options.style_preset,
                    );
                    let prompt_refs = selected
                        .into_iter()
                        .map(|(r, weight)| illumine_core::model::PromptReference {
                            entity_id: entity.id,
                            image_pointer: r.image_pointer.clone(),
                            weight,
                            age_tag: r.age_tag.clone(),
                            description: r.description.clone(),
                        })
                        .collect();

                    resolved_mentions.push(ResolvedMention {
                        entity: entity.clone(),
                        references: prompt_refs,
                        is_pronoun: mention.is_pronoun,
                    });
                }

                let prompt = prompt_composer::compose(
                    &scene,
                    &resolved_mentions,
                    &options.style_preset,
                    options.custom_style.as_deref(),
                    options.artistic_direction.as_deref(),
                    &self.thresholds,
                )?;
                self.prompts.upsert(prompt.clone()).await?;

                let image = self.generate_and_assess(&scene, &prompt, options, &mut existing_images_by_scene).await?;
                self.images.upsert(image.clone()).await?;

                if image.status == illumine_core::model::GeneratedImageStatus::Success {
                    if let Some(pointer) = &image.image_pointer {
                        let metrics = default_image_metrics();
                        let report = quality_assessor::assess(
                            image.id,
                            pointer,
                            &prompt.text,
                            Some(&scene.text),
                            metrics,
                            self.text_model.as_ref(),
                        )
                        .await?;
                        self.quality_reports.upsert(report.clone()).await?;
                        all_quality_reports.push(report);
                    }
                }

                all_images.push(image);
                all_scenes.push(scene);
            }
        }

        Ok(ChapterOutcome {
            chapter: chapter.clone(),
            scenes: all_scenes,
            entities: known_entities,
            images: all_images,
            quality_reports: all_quality_reports,
        })
    }

    async fn generate_and_assess(
        &self,
        scene: &Scene,
        prompt: &Prompt,
        options: &ProcessOptions,
        existing_images: &mut Vec<GeneratedImage>,
    ) -> Result<GeneratedImage> {
        let image = crate::image_generator::generate(
            prompt,
            0,
            Some(scene.id),
            options.replace_existing_images,
            existing_images,
            self.image_model.as_ref(),
            self.thresholds.image_max_retries,
        )
        .await?;
        existing_images.push(image.clone());
        Ok(image)
    }
}

/// Development-stub image metrics pending a dedicated vision analyzer;
/// `"mock"` values here are non-contractual per the quality assessor's own
/// weighted-composition contract (§4.11).
fn default_image_metrics() -> ImageMetrics {
    ImageMetrics {
        sharpness: 0.8,
        exposure: 0.8,
        composition: 0.8,
        artefacts: 0.1,
        style_consistency: 0.8,
        aesthetic_score: 0.8,
        safety_verdict: SafetyVerdict::Safe,
        issues: Vec::new(),
        suggestions: Vec::new(),
    }
}
