//! Wires one `InMemoryRepository` per durable record type, the in-process
//! persistence layer the CLI uses in place of a real database backend.

use std::sync::Arc;

use illumine_core::external::persistence::WorkScopedFilter;
use illumine_core::memory::InMemoryRepository;
use illumine_core::model::{
    Chapter, ChapterJob, Entity, EntityLink, EntityReference, EvolutionRecord, GeneratedImage,
    Prompt, QualityReport, Scene, Work,
};
use uuid::Uuid;

/// Every repository the pipeline needs, bundled for convenient construction
/// in `commands::run`.
pub struct Repositories {
    pub works: Arc<InMemoryRepository<Work, Uuid, WorkScopedFilter>>,
    pub chapters: Arc<InMemoryRepository<Chapter, Uuid, WorkScopedFilter>>,
    pub scenes: Arc<InMemoryRepository<Scene, Uuid, WorkScopedFilter>>,
    pub entities: Arc<InMemoryRepository<Entity, Uuid, WorkScopedFilter>>,
    pub entity_links: Arc<InMemoryRepository<EntityLink, (Uuid, (usize, usize)), WorkScopedFilter>>,
    pub entity_references: Arc<InMemoryRepository<EntityReference, Uuid, WorkScopedFilter>>,
    pub evolution_records: Arc<InMemoryRepository<EvolutionRecord, (Uuid, u32), WorkScopedFilter>>,
    pub prompts: Arc<InMemoryRepository<Prompt, Uuid, WorkScopedFilter>>,
    pub images: Arc<InMemoryRepository<GeneratedImage, Uuid, WorkScopedFilter>>,
    pub quality_reports: Arc<InMemoryRepository<QualityReport, Uuid, WorkScopedFilter>>,
    pub chapter_jobs: Arc<InMemoryRepository<ChapterJob, Uuid, WorkScopedFilter>>,
}

fn filter_matches_work(filter: &WorkScopedFilter, work_id: Uuid) -> bool {
    match filter.work_id {
        Some(id) => id == work_id,
        None => true,
    }
}

fn filter_matches_chapter(filter: &WorkScopedFilter, chapter_id: Uuid) -> bool {
    match filter.chapter_id {
        Some(id) => id == chapter_id,
        None => true,
    }
}

impl Repositories {
    /// Build a fresh, empty set of in-memory repositories.
    pub fn new() -> Self {
        Self {
            works: Arc::new(InMemoryRepository::new(
                |w: &Work| w.id,
                |w, f| filter_matches_work(f, w.id),
            )),
            chapters: Arc::new(InMemoryRepository::new(
                |c: &Chapter| c.id,
                |c, f| filter_matches_work(f, c.work_id),
            )),
            scenes: Arc::new(InMemoryRepository::new(
                |s: &Scene| s.id,
                |s, f| filter_matches_chapter(f, s.chapter_id),
            )),
            entities: Arc::new(InMemoryRepository::new(
                |e: &Entity| e.id,
                |e, f| filter_matches_work(f, e.work_id),
            )),
            entity_links: Arc::new(InMemoryRepository::new(
                |l: &EntityLink| (l.scene_id, l.mention_span),
                // EntityLink carries neither a work_id nor a chapter_id;
                // the pipeline never lists these by work scope.
                |_, _| true,
            )),
            entity_references: Arc::new(InMemoryRepository::new(
                |r: &EntityReference| r.id,
                |_, _| true,
            )),
            evolution_records: Arc::new(InMemoryRepository::new(
                |r: &EvolutionRecord| (r.entity_id, r.at_chapter),
                |_, _| true,
            )),
            prompts: Arc::new(InMemoryRepository::new(
                |p: &Prompt| p.id,
                |_, _| true,
            )),
            images: Arc::new(InMemoryRepository::new(
                |i: &GeneratedImage| i.id,
                |_, _| true,
            )),
            quality_reports: Arc::new(InMemoryRepository::new(
                |q: &QualityReport| q.image_id,
                |_, _| true,
            )),
            chapter_jobs: Arc::new(InMemoryRepository::new(
                |j: &ChapterJob| j.id,
                |j, f| filter_matches_work(f, j.work_id),
            )),
        }
    }
}

impl Default for Repositories {
    fn default() -> Self {
        Self::new()
    }
}
