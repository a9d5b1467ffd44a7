//! Work Scheduler (§4.13): enforces ordered chapter execution per work,
//! with dependency, retry and failure semantics. Holds no ownership over
//! chapters/entities/scenes — it only observes and mutates `ChapterJob`s
//! (spec §3 "Ownership").
//!
//! Single-writer discipline per work (§5 "Shared resources") is enforced by
//! guarding each work's job table behind its own lock, mirroring the
//! `Arc<RwLock<...>>`-per-shared-state pattern the teacher's memory crate
//! uses for its own concurrent state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::Error;
use crate::model::{ChapterJob, ChapterJobStatus, WorkStatus};

/// The outcome of a finished chapter-pipeline run, reported to
/// [`WorkScheduler::advance`].
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The chapter pipeline completed successfully.
    Completed,
    /// The chapter pipeline failed with the given message.
    Failed(String),
}

struct WorkState {
    /// Keyed by chapter ordinal; ordinals are strictly increasing with no
    /// gaps (spec §3 invariant).
    jobs: BTreeMap<u32, ChapterJob>,
}

impl WorkState {
    fn overall_status(&self) -> WorkStatus {
        if self
            .jobs
            .values()
            .any(|j| j.status == ChapterJobStatus::Running)
        {
            return WorkStatus::InProgress;
        }
        if self
            .jobs
            .values()
            .all(|j| j.status == ChapterJobStatus::Completed)
        {
            return WorkStatus::Completed;
        }
        if self
            .jobs
            .values()
            .any(|j| j.status == ChapterJobStatus::Failed)
        {
            return WorkStatus::Failed;
        }
        WorkStatus::InProgress
    }
}

/// A point-in-time view of a work's scheduler state (§6 "Status query").
#[derive(Debug, Clone)]
pub struct WorkStatusReport {
    pub work_id: Uuid,
    pub overall_status: WorkStatus,
    pub jobs: Vec<ChapterJob>,
}

/// Enforces §4.13's per-`ChapterJob` state machine across all works.
#[derive(Default)]
pub struct WorkScheduler {
    works: DashMap<Uuid, Arc<RwLock<WorkState>>>,
}

impl WorkScheduler {
    /// Construct an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// `ingest(work, chapters)`: register one `ChapterJob` per chapter
    /// ordinal, in the initial state described by §4.13.
    pub fn ingest(&self, work_id: Uuid, chapter_ordinals: &[u32]) -> Result<(), Error> {
        let mut jobs = BTreeMap::new();
        let now = Utc::now();
        for &ordinal in chapter_ordinals {
            jobs.insert(ordinal, ChapterJob::new(work_id, ordinal, 0, now));
        }
        self.works
            .insert(work_id, Arc::new(RwLock::new(WorkState { jobs })));
        Ok(())
    }

    fn state_for(&self, work_id: Uuid) -> Result<Arc<RwLock<WorkState>>, Error> {
        self.works
            .get(&work_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::NotFound {
                kind: "work",
                id: work_id.to_string(),
            })
    }

    /// Attempt to start the next `queued` job for a work, transitioning it
    /// to `running`. Returns `None` if no job is currently startable; the
    /// caller (a bounded worker pool, §5) is responsible for not calling
    /// this more often than its available concurrency.
    pub fn try_start_next(&self, work_id: Uuid) -> Result<Option<ChapterJob>, Error> {
        let state = self.state_for(work_id)?;
        let mut state = state.write();
        let ordinal = state
            .jobs
            .values()
            .find(|j| j.status == ChapterJobStatus::Queued)
            .map(|j| j.chapter_ordinal);
        let Some(ordinal) = ordinal else {
            return Ok(None);
        };
        let job = state.jobs.get_mut(&ordinal).expect("ordinal just found");
        job.status = ChapterJobStatus::Running;
        job.started_at = Some(Utc::now());
        Ok(Some(job.clone()))
    }

    /// `advance(work_id, finished_ordinal, outcome)`: record the outcome of
    /// a finished chapter-pipeline run and unblock its successor, if any
    /// and if the outcome was success.
    pub fn advance(&self, work_id: Uuid, finished_ordinal: u32, outcome: Outcome) -> Result<(), Error> {
        let state = self.state_for(work_id)?;
        let mut state = state.write();
        let now = Utc::now();
        {
            let job = state
                .jobs
                .get_mut(&finished_ordinal)
                .ok_or_else(|| Error::NotFound {
                    kind: "chapter_job",
                    id: finished_ordinal.to_string(),
                })?;
            job.completed_at = Some(now);
            match &outcome {
                Outcome::Completed => {
                    job.status = ChapterJobStatus::Completed;
                    job.last_error = None;
                }
                Outcome::Failed(message) => {
                    job.status = ChapterJobStatus::Failed;
                    job.last_error = Some(message.clone());
                }
            }
        }
        if matches!(outcome, Outcome::Completed) {
            if let Some(successor) = state.jobs.get_mut(&(finished_ordinal + 1)) {
                if successor.status == ChapterJobStatus::WaitingForPrevious {
                    successor.status = ChapterJobStatus::Queued;
                }
            }
        }
        Ok(())
    }

    /// `retry(work_id, ordinal)`: requires the job to be `failed`;
    /// transitions it back to `queued` and clears `started_at`,
    /// `completed_at`, `error`.
    pub fn retry(&self, work_id: Uuid, ordinal: u32) -> Result<(), Error> {
        let state = self.state_for(work_id)?;
        let mut state = state.write();
        let job = state
            .jobs
            .get_mut(&ordinal)
            .ok_or_else(|| Error::NotFound {
                kind: "chapter_job",
                id: ordinal.to_string(),
            })?;
        if job.status != ChapterJobStatus::Failed {
            return Err(Error::PrerequisiteNotMet(format!(
                "chapter {ordinal} is not failed, cannot retry"
            )));
        }
        job.status = ChapterJobStatus::Queued;
        job.started_at = None;
        job.completed_at = None;
        job.last_error = None;
        Ok(())
    }

    /// `status(work_id)`: the scheduler projection exposed by the status
    /// endpoint (§6).
    pub fn status(&self, work_id: Uuid) -> Result<WorkStatusReport, Error> {
        let state = self.state_for(work_id)?;
        let state = state.read();
        Ok(WorkStatusReport {
            work_id,
            overall_status: state.overall_status(),
            jobs: state.jobs.values().cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_sets_initial_states_per_spec() {
        let scheduler = WorkScheduler::new();
        let work_id = Uuid::new_v4();
        scheduler.ingest(work_id, &[1, 2, 3]).unwrap();
        let status = scheduler.status(work_id).unwrap();
        assert_eq!(status.jobs[0].status, ChapterJobStatus::Queued);
        assert_eq!(status.jobs[1].status, ChapterJobStatus::WaitingForPrevious);
        assert_eq!(status.jobs[2].status, ChapterJobStatus::WaitingForPrevious);
    }

    #[test]
    fn chapter_2_blocked_on_chapter_1_failure() {
        // End-to-end scenario 5 (spec §8).
        let scheduler = WorkScheduler::new();
        let work_id = Uuid::new_v4();
        scheduler.ingest(work_id, &[1, 2]).unwrap();
        scheduler.try_start_next(work_id).unwrap();
        scheduler
            .advance(work_id, 1, Outcome::Failed("InvariantViolated".into()))
            .unwrap();

        let status = scheduler.status(work_id).unwrap();
        assert_eq!(status.overall_status, WorkStatus::Failed);
        assert_eq!(status.jobs[0].status, ChapterJobStatus::Failed);
        assert_eq!(status.jobs[1].status, ChapterJobStatus::WaitingForPrevious);

        scheduler.retry(work_id, 1).unwrap();
        let status = scheduler.status(work_id).unwrap();
        assert_eq!(status.jobs[0].status, ChapterJobStatus::Queued);
        assert_eq!(status.jobs[0].last_error, None);
    }

    #[test]
    fn successful_completion_unblocks_successor() {
        let scheduler = WorkScheduler::new();
        let work_id = Uuid::new_v4();
        scheduler.ingest(work_id, &[1, 2]).unwrap();
        scheduler.try_start_next(work_id).unwrap();
        scheduler.advance(work_id, 1, Outcome::Completed).unwrap();

        let status = scheduler.status(work_id).unwrap();
        assert_eq!(status.jobs[0].status, ChapterJobStatus::Completed);
        assert_eq!(status.jobs[1].status, ChapterJobStatus::Queued);
    }

    #[test]
    fn retry_requires_failed_state() {
        let scheduler = WorkScheduler::new();
        let work_id = Uuid::new_v4();
        scheduler.ingest(work_id, &[1]).unwrap();
        let err = scheduler.retry(work_id, 1).unwrap_err();
        assert!(matches!(err, Error::PrerequisiteNotMet(_)));
    }

    #[test]
    fn overall_status_completed_when_all_jobs_completed() {
        let scheduler = WorkScheduler::new();
        let work_id = Uuid::new_v4();
        scheduler.ingest(work_id, &[1, 2]).unwrap();
        scheduler.try_start_next(work_id).unwrap();
        scheduler.advance(work_id, 1, Outcome::Completed).unwrap();
        scheduler.try_start_next(work_id).unwrap();
        scheduler.advance(work_id, 2, Outcome::Completed).unwrap();
        let status = scheduler.status(work_id).unwrap();
        assert_eq!(status.overall_status, WorkStatus::Completed);
    }
}
