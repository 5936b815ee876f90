//! Background job registry, polled by id while a simulation runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::wizard::steps::StepId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Ingestion,
    Preprocessing,
    FeatureEngineering,
    Training,
    Tuning,
}

impl JobKind {
    /// Results and monitoring are views, not jobs.
    pub fn for_step(step: StepId) -> Option<Self> {
        match step {
            StepId::Upload => Some(JobKind::Ingestion),
            StepId::Preprocessing => Some(JobKind::Preprocessing),
            StepId::FeatureSelection => Some(JobKind::FeatureEngineering),
            StepId::Training => Some(JobKind::Training),
            StepId::Tuning => Some(JobKind::Tuning),
            StepId::Results | StepId::Monitoring => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub project_id: Option<String>,
    pub kind: JobKind,
    pub status: JobStatus,
    pub progress: f64,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<String, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, project_id: Option<&str>, kind: JobKind) -> String {
        let job = Job {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.map(str::to_string),
            kind,
            status: JobStatus::Pending,
            progress: 0.0,
            label: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        let id = job.id.clone();
        if let Ok(mut jobs) = self.inner.lock() {
            jobs.insert(id.clone(), job);
        }
        id
    }

    /// Progress only moves forward; a finished job ignores late ticks.
    pub fn report(&self, id: &str, label: &str, percent: f64) {
        self.update(id, |job| {
            if matches!(job.status, JobStatus::Completed | JobStatus::Cancelled) {
                return;
            }
            job.status = JobStatus::Running;
            job.progress = job.progress.max(percent.clamp(0.0, 100.0));
            job.label = Some(label.to_string());
        });
    }

    pub fn complete(&self, id: &str) {
        self.finish(id, JobStatus::Completed);
    }

    pub fn cancel(&self, id: &str) {
        self.finish(id, JobStatus::Cancelled);
    }

    fn finish(&self, id: &str, status: JobStatus) {
        self.update(id, |job| {
            if status == JobStatus::Completed {
                job.progress = 100.0;
            }
            job.status = status;
            job.completed_at = Some(Utc::now());
        });
    }

    fn update(&self, id: &str, f: impl FnOnce(&mut Job)) {
        if let Ok(mut jobs) = self.inner.lock() {
            if let Some(job) = jobs.get_mut(id) {
                f(job);
            }
        }
    }

    /// Drop the project's completed and cancelled jobs. Running ones stay so
    /// they can still be resolved. Returns how many were removed.
    pub fn clear_finished(&self, project_id: Option<&str>) -> usize {
        match self.inner.lock() {
            Ok(mut jobs) => {
                let before = jobs.len();
                jobs.retain(|_, j| {
                    j.project_id.as_deref() != project_id
                        || !matches!(j.status, JobStatus::Completed | JobStatus::Cancelled)
                });
                before - jobs.len()
            }
            Err(_) => 0,
        }
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.inner.lock().ok().and_then(|jobs| jobs.get(id).cloned())
    }

    /// Jobs of one project, oldest first.
    pub fn list(&self, project_id: Option<&str>) -> Vec<Job> {
        let mut out: Vec<Job> = self
            .inner
            .lock()
            .map(|jobs| {
                jobs.values()
                    .filter(|j| j.project_id.as_deref() == project_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_lifecycle() {
        let jobs = JobRegistry::new();
        let id = jobs.create(Some("p1"), JobKind::Training);
        assert_eq!(jobs.get(&id).unwrap().status, JobStatus::Pending);

        jobs.report(&id, "XGBoost", 40.0);
        jobs.report(&id, "XGBoost", 20.0);
        let job = jobs.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(job.progress, 40.0);

        jobs.complete(&id);
        jobs.report(&id, "late", 10.0);
        let job = jobs.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100.0);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_list_filters_by_project() {
        let jobs = JobRegistry::new();
        jobs.create(Some("p1"), JobKind::Ingestion);
        jobs.create(Some("p2"), JobKind::Ingestion);
        let cancelled = jobs.create(Some("p1"), JobKind::Tuning);
        jobs.cancel(&cancelled);
        assert_eq!(jobs.list(Some("p1")).len(), 2);
        assert_eq!(jobs.list(None).len(), 0);
        assert_eq!(jobs.get(&cancelled).unwrap().status, JobStatus::Cancelled);
    }

    #[test]
    fn test_clear_finished_keeps_running_jobs() {
        let jobs = JobRegistry::new();
        let done = jobs.create(Some("p1"), JobKind::Ingestion);
        jobs.complete(&done);
        let running = jobs.create(Some("p1"), JobKind::Training);
        jobs.report(&running, "XGBoost", 30.0);
        let other = jobs.create(Some("p2"), JobKind::Ingestion);
        jobs.complete(&other);

        assert_eq!(jobs.clear_finished(Some("p1")), 1);
        assert!(jobs.get(&done).is_none());
        assert_eq!(jobs.get(&running).map(|j| j.status), Some(JobStatus::Running));
        assert!(jobs.get(&other).is_some());
    }

    #[test]
    fn test_step_job_kinds() {
        assert_eq!(JobKind::for_step(StepId::Upload), Some(JobKind::Ingestion));
        assert_eq!(JobKind::for_step(StepId::Results), None);
    }
}
