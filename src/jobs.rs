//! In-memory registry of ingestion jobs
//!
//! Dataset ingestion runs as a detached background task; this registry is
//! what the triggering caller polls to learn whether the job is still
//! running, what it has written so far, and why it failed if it did.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::ingestion::IngestSummary;

/// How long finished jobs stay pollable before being pruned
const FINISHED_RETENTION_HOURS: i64 = 24;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

/// Progress of one ingestion job
#[derive(Debug, Clone, Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    /// Source identifier (dataset or file name)
    pub source: String,
    /// Target collection
    pub collection: String,
    pub status: JobStatus,
    pub records_written: u64,
    pub records_failed: u64,
    pub batches_flushed: u64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registry of ingestion jobs
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<Uuid, JobProgress>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pending job, returning its id. Stale finished jobs
    /// are pruned here, so the registry stays bounded as jobs arrive.
    pub fn create(&self, source: &str, collection: &str) -> Uuid {
        let now = Utc::now();
        self.prune_finished(now, Duration::hours(FINISHED_RETENTION_HOURS));

        let job_id = Uuid::new_v4();
        self.jobs.insert(
            job_id,
            JobProgress {
                job_id,
                source: source.to_string(),
                collection: collection.to_string(),
                status: JobStatus::Pending,
                records_written: 0,
                records_failed: 0,
                batches_flushed: 0,
                error: None,
                created_at: now,
                updated_at: now,
            },
        );
        job_id
    }

    pub fn mark_running(&self, job_id: Uuid) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = JobStatus::Running;
            progress.updated_at = Utc::now();
        }
    }

    /// Record a finished job with its summary counters
    pub fn complete(&self, job_id: Uuid, summary: &IngestSummary) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = JobStatus::Complete;
            progress.records_written = summary.records_written;
            progress.records_failed = summary.records_failed;
            progress.batches_flushed = summary.batches_flushed;
            progress.updated_at = Utc::now();
        }
    }

    pub fn fail(&self, job_id: Uuid, error: String) {
        if let Some(mut progress) = self.jobs.get_mut(&job_id) {
            progress.status = JobStatus::Failed;
            progress.error = Some(error);
            progress.updated_at = Utc::now();
        }
    }

    pub fn get(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.get(&job_id).map(|p| p.clone())
    }

    pub fn list(&self) -> Vec<JobProgress> {
        let mut jobs: Vec<JobProgress> = self.jobs.iter().map(|e| e.value().clone()).collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Drop complete/failed jobs untouched for longer than `max_age`.
    /// Pending and running jobs are never pruned. Returns the number
    /// removed.
    pub fn prune_finished(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|_, job| {
            !matches!(job.status, JobStatus::Complete | JobStatus::Failed)
                || now - job.updated_at <= max_age
        });
        let pruned = before - self.jobs.len();
        if pruned > 0 {
            tracing::debug!("Pruned {} finished ingestion jobs", pruned);
        }
        pruned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let registry = JobRegistry::new();
        let job_id = registry.create("Sample Set!", "SampleSet");

        assert_eq!(registry.get(job_id).unwrap().status, JobStatus::Pending);

        registry.mark_running(job_id);
        assert_eq!(registry.get(job_id).unwrap().status, JobStatus::Running);

        let summary = IngestSummary {
            collection: "SampleSet".to_string(),
            records_written: 250,
            records_failed: 2,
            batches_flushed: 3,
        };
        registry.complete(job_id, &summary);

        let progress = registry.get(job_id).unwrap();
        assert_eq!(progress.status, JobStatus::Complete);
        assert_eq!(progress.records_written, 250);
        assert_eq!(progress.records_failed, 2);
    }

    #[test]
    fn test_prune_drops_only_stale_finished_jobs() {
        let registry = JobRegistry::new();
        let stale = registry.create("old", "old");
        let running = registry.create("busy", "busy");

        let summary = IngestSummary {
            collection: "old".to_string(),
            records_written: 1,
            records_failed: 0,
            batches_flushed: 1,
        };
        registry.complete(stale, &summary);
        registry.mark_running(running);
        if let Some(mut job) = registry.jobs.get_mut(&stale) {
            job.updated_at = Utc::now() - Duration::hours(48);
        }
        if let Some(mut job) = registry.jobs.get_mut(&running) {
            job.updated_at = Utc::now() - Duration::hours(48);
        }

        let pruned = registry.prune_finished(Utc::now(), Duration::hours(FINISHED_RETENTION_HOURS));
        assert_eq!(pruned, 1);
        assert!(registry.get(stale).is_none());
        // A long-running job is untouchable regardless of age
        assert!(registry.get(running).is_some());
    }

    #[test]
    fn test_create_prunes_stale_finished_jobs() {
        let registry = JobRegistry::new();
        let stale = registry.create("old", "old");
        registry.fail(stale, "gone".to_string());
        if let Some(mut job) = registry.jobs.get_mut(&stale) {
            job.updated_at = Utc::now() - Duration::hours(48);
        }

        let fresh = registry.create("new", "new");
        assert!(registry.get(stale).is_none());
        assert!(registry.get(fresh).is_some());
    }

    #[test]
    fn test_failed_job_keeps_error() {
        let registry = JobRegistry::new();
        let job_id = registry.create("missing", "missing");
        registry.fail(job_id, "Source unavailable: no such dataset".to_string());

        let progress = registry.get(job_id).unwrap();
        assert_eq!(progress.status, JobStatus::Failed);
        assert!(progress.error.unwrap().contains("Source unavailable"));
    }
}
