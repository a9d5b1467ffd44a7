//! Ingest a text file and drive it through the full chapter pipeline
//! against development-stub collaborators (spec §4.12, §4.13).

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use illumine_core::external::persistence::Repository;
use illumine_core::memory::InMemoryObjectStore;
use illumine_core::model::ChapterJobStatus;
use illumine_core::scheduler::{Outcome, WorkScheduler};
use illumine_pipeline::{ChapterPipeline, ProcessOptions};
use illumine_text::ChunkerConfig;

use crate::output::{create_table, print_info, print_success, OutputFormat};
use crate::providers::{DevImageModel, DevParser, DevTextModel};
use crate::repositories::Repositories;

/// Ingest a text file and illustrate every chapter end to end
#[derive(Args)]
pub struct RunArgs {
    /// Path to a UTF-8 text file to ingest
    path: String,

    /// Style preset applied to every chapter (e.g. "fantasy", "noir")
    #[arg(long, default_value = "fantasy")]
    style: String,

    /// Maximum scenes extracted per chunk
    #[arg(long, default_value_t = 3)]
    max_scenes_per_chunk: usize,

    /// Output format (table, json)
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let bytes = fs::read(&args.path).with_context(|| format!("reading {}", args.path))?;

    let parser = DevParser::new();
    let parse_result = parser
        .parse(&bytes, "txt")
        .await
        .context("parsing input file")?;

    let (work, chapters) = illumine_core::ingest::ingest(parse_result, args.style.clone())
        .context("ingesting parsed work")?;

    print_info(&format!(
        "ingested \"{}\" into {} chapter(s)",
        work.title,
        chapters.len()
    ));

    let object_store = Arc::new(InMemoryObjectStore::new());
    let repos = Repositories::new();
    repos.works.upsert(work.clone()).await?;
    for chapter in &chapters {
        repos.chapters.upsert(chapter.clone()).await?;
    }

    let scheduler = WorkScheduler::new();
    let ordinals: Vec<u32> = chapters.iter().map(|c| c.ordinal).collect();
    scheduler.ingest(work.id, &ordinals)?;

    let pipeline = ChapterPipeline {
        text_model: Arc::new(DevTextModel::new()),
        image_model: Arc::new(DevImageModel::new(object_store.clone())),
        object_store: object_store.clone(),
        works: repos.works.clone(),
        chapters: repos.chapters.clone(),
        scenes: repos.scenes.clone(),
        entities: repos.entities.clone(),
        entity_links: repos.entity_links.clone(),
        entity_references: repos.entity_references.clone(),
        evolution_records: repos.evolution_records.clone(),
        prompts: repos.prompts.clone(),
        images: repos.images.clone(),
        quality_reports: repos.quality_reports.clone(),
        chapter_jobs: repos.chapter_jobs.clone(),
        thresholds: illumine_core::config::Thresholds::default(),
    };

    let options = ProcessOptions {
        style_preset: args.style.clone(),
        custom_style: None,
        artistic_direction: None,
        chunk_strategy: illumine_text::ChunkStrategy::Paragraph,
        chunker_config: ChunkerConfig::default(),
        max_scenes_per_chunk: args.max_scenes_per_chunk,
        replace_existing_images: false,
        prior_context: None,
    };

    let mut rows = Vec::new();
    while let Some(job) = scheduler.try_start_next(work.id)? {
        let chapter_id = chapters
            .iter()
            .find(|c| c.ordinal == job.chapter_ordinal)
            .map(|c| c.id)
            .context("scheduler returned a job for an unknown chapter ordinal")?;
        let outcome = pipeline.process_chapter(chapter_id, options.clone()).await;
        match outcome {
            Ok(chapter_outcome) => {
                scheduler.advance(work.id, job.chapter_ordinal, Outcome::Completed)?;
                rows.push((
                    job.chapter_ordinal,
                    ChapterJobStatus::Completed,
                    chapter_outcome.scenes.len(),
                    chapter_outcome.entities.len(),
                    chapter_outcome.images.len(),
                ));
            }
            Err(e) => {
                scheduler.advance(work.id, job.chapter_ordinal, Outcome::Failed(e.to_string()))?;
                rows.push((job.chapter_ordinal, ChapterJobStatus::Failed, 0, 0, 0));
            }
        }
    }

    match args.format {
        OutputFormat::Json => {
            let json_rows: Vec<_> = rows
                .iter()
                .map(|(ordinal, status, scenes, entities, images)| {
                    serde_json::json!({
                        "chapter_ordinal": ordinal,
                        "status": format!("{status:?}"),
                        "scenes": scenes,
                        "entities": entities,
                        "images": images,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json_rows)?);
        }
        OutputFormat::Table => {
            let mut table = create_table();
            table.set_header(vec!["chapter", "status", "scenes", "entities", "images"]);
            for (ordinal, status, scenes, entities, images) in &rows {
                table.add_row(vec![
                    ordinal.to_string(),
                    format!("{status:?}"),
                    scenes.to_string(),
                    entities.to_string(),
                    images.to_string(),
                ]);
            }
            println!("{table}");
            print_success(&format!("processed {} chapter(s)", rows.len()));
        }
    }

    Ok(())
}
