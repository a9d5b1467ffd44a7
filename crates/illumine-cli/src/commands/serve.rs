//! `illumine serve`: exposes the ingest API and status query over HTTP
//! (spec §6), returning the `{success, data?, error?, timestamp}` envelope.

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use clap::Args;
use illumine_core::external::persistence::Repository;
use illumine_core::memory::InMemoryObjectStore;
use illumine_core::model::ChapterJobStatus;
use illumine_core::scheduler::{Outcome, WorkScheduler};
use illumine_pipeline::{ChapterPipeline, ProcessOptions};
use serde::Serialize;
use uuid::Uuid;

use crate::output::print_info;
use crate::providers::{DevImageModel, DevParser, DevTextModel};
use crate::repositories::Repositories;

/// Run an HTTP server exposing the ingest and status APIs
#[derive(Args)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Style preset applied to ingested chapters
    #[arg(long, default_value = "fantasy")]
    style: String,
}

#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, timestamp: Utc::now() }
    }

    fn err(message: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(message.into()), timestamp: Utc::now() }
    }
}

#[derive(Serialize)]
struct ChapterSummary {
    ordinal: u32,
    status: String,
    scenes: usize,
    entities: usize,
    images: usize,
}

#[derive(Serialize)]
struct IngestResponse {
    work_id: Uuid,
    title: String,
    total_chapters: u32,
    chapters: Vec<ChapterSummary>,
}

#[derive(Serialize)]
struct JobSummary {
    chapter_ordinal: u32,
    status: String,
    last_error: Option<String>,
}

#[derive(Serialize)]
struct StatusResponse {
    work_id: Uuid,
    overall_status: String,
    jobs: Vec<JobSummary>,
}

#[derive(Clone)]
struct AppState {
    style: String,
    scheduler: Arc<WorkScheduler>,
    repos: Arc<Repositories>,
    object_store: Arc<InMemoryObjectStore>,
}

async fn ingest_handler(
    State(state): State<AppState>,
    body: String,
) -> Json<ApiResponse<IngestResponse>> {
    match ingest_work(&state, body).await {
        Ok(response) => Json(ApiResponse::ok(response)),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

async fn ingest_work(state: &AppState, text: String) -> anyhow::Result<IngestResponse> {
    let parser = DevParser::new();
    let parse_result = parser.parse(text.as_bytes(), "txt").await?;
    let (work, chapters) = illumine_core::ingest::ingest(parse_result, state.style.clone())?;

    state.repos.works.upsert(work.clone()).await?;
    for chapter in &chapters {
        state.repos.chapters.upsert(chapter.clone()).await?;
    }
    let ordinals: Vec<u32> = chapters.iter().map(|c| c.ordinal).collect();
    state.scheduler.ingest(work.id, &ordinals)?;

    let pipeline = ChapterPipeline {
        text_model: Arc::new(DevTextModel::new()),
        image_model: Arc::new(DevImageModel::new(state.object_store.clone())),
        object_store: state.object_store.clone(),
        works: state.repos.works.clone(),
        chapters: state.repos.chapters.clone(),
        scenes: state.repos.scenes.clone(),
        entities: state.repos.entities.clone(),
        entity_links: state.repos.entity_links.clone(),
        entity_references: state.repos.entity_references.clone(),
        evolution_records: state.repos.evolution_records.clone(),
        prompts: state.repos.prompts.clone(),
        images: state.repos.images.clone(),
        quality_reports: state.repos.quality_reports.clone(),
        chapter_jobs: state.repos.chapter_jobs.clone(),
        thresholds: illumine_core::config::Thresholds::default(),
    };
    let options = ProcessOptions { style_preset: state.style.clone(), ..ProcessOptions::default() };

    let mut summaries = Vec::new();
    while let Some(job) = state.scheduler.try_start_next(work.id)? {
        let chapter_id = chapters
            .iter()
            .find(|c| c.ordinal == job.chapter_ordinal)
            .map(|c| c.id)
            .ok_or_else(|| anyhow::anyhow!("scheduler returned an unknown chapter ordinal"))?;

        match pipeline.process_chapter(chapter_id, options.clone()).await {
            Ok(outcome) => {
                state.scheduler.advance(work.id, job.chapter_ordinal, Outcome::Completed)?;
                summaries.push(ChapterSummary {
                    ordinal: job.chapter_ordinal,
                    status: format!("{:?}", ChapterJobStatus::Completed),
                    scenes: outcome.scenes.len(),
                    entities: outcome.entities.len(),
                    images: outcome.images.len(),
                });
            }
            Err(e) => {
                state.scheduler.advance(work.id, job.chapter_ordinal, Outcome::Failed(e.to_string()))?;
                summaries.push(ChapterSummary {
                    ordinal: job.chapter_ordinal,
                    status: format!("{:?}", ChapterJobStatus::Failed),
                    scenes: 0,
                    entities: 0,
                    images: 0,
                });
            }
        }
    }

    Ok(IngestResponse {
        work_id: work.id,
        title: work.title,
        total_chapters: work.total_chapters,
        chapters: summaries,
    })
}

async fn status_handler(
    State(state): State<AppState>,
    Path(work_id): Path<Uuid>,
) -> Json<ApiResponse<StatusResponse>> {
    match state.scheduler.status(work_id) {
        Ok(report) => Json(ApiResponse::ok(StatusResponse {
            work_id: report.work_id,
            overall_status: format!("{:?}", report.overall_status),
            jobs: report
                .jobs
                .into_iter()
                .map(|j| JobSummary {
                    chapter_ordinal: j.chapter_ordinal,
                    status: format!("{:?}", j.status),
                    last_error: j.last_error,
                })
                .collect(),
        })),
        Err(e) => Json(ApiResponse::err(e.to_string())),
    }
}

pub async fn run(args: ServeArgs) -> Result<()> {
    let state = AppState {
        style: args.style,
        scheduler: Arc::new(WorkScheduler::new()),
        repos: Arc::new(Repositories::new()),
        object_store: Arc::new(InMemoryObjectStore::new()),
    };

    let app = Router::new()
        .route("/ingest", post(ingest_handler))
        .route("/status/:work_id", get(status_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    print_info(&format!("listening on {addr}"));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
