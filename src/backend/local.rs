//! In-memory execution backend for standalone work mode and tests.
//!
//! Jobs walk the real lifecycle one step per status query
//! (SUBMITTED → RUNNING → terminal), so every intermediate state is
//! observable and deterministic. No computation happens; the "result" of a
//! component is a synthetic summary document.

use crate::backend::{ComputeBackend, ExecutionBackend, WorkMode};
use crate::core::compile::CompiledJob;
use crate::core::error::PipelineError;
use crate::job::{JobStatus, Summary};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

struct JobRecord {
    status: JobStatus,
    tasks: Vec<(String, String)>,
}

/// Deterministic in-memory backend.
pub struct LocalBackend {
    jobs: Mutex<HashMap<String, JobRecord>>,
    fail_with: Option<String>,
    hold_in_running: bool,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            fail_with: None,
            hold_in_running: false,
        }
    }

    /// Every job ends in `Failed` carrying `diagnostic`.
    pub fn fail_jobs(mut self, diagnostic: impl Into<String>) -> Self {
        self.fail_with = Some(diagnostic.into());
        self
    }

    /// Jobs reach `Running` and stay there until canceled.
    pub fn hold_in_running(mut self) -> Self {
        self.hold_in_running = true;
        self
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionBackend for LocalBackend {
    async fn submit(
        &self,
        job: &CompiledJob,
        _backend: ComputeBackend,
        _work_mode: WorkMode,
    ) -> Result<String, PipelineError> {
        if job.dsl.tasks.is_empty() {
            return Err(PipelineError::Submission(
                "job specification contains no tasks".to_string(),
            ));
        }
        let job_id = Uuid::new_v4().to_string();
        let tasks = job
            .dsl
            .tasks
            .iter()
            .map(|task| (task.name.clone(), task.kind.clone()))
            .collect();
        self.jobs.lock().unwrap().insert(
            job_id.clone(),
            JobRecord {
                status: JobStatus::Submitted,
                tasks,
            },
        );
        Ok(job_id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, PipelineError> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::Submission(format!("unknown job '{job_id}'")))?;
        record.status = match &record.status {
            JobStatus::Submitted => JobStatus::Running,
            JobStatus::Running if self.hold_in_running => JobStatus::Running,
            JobStatus::Running => match &self.fail_with {
                Some(diagnostic) => JobStatus::Failed {
                    diagnostic: diagnostic.clone(),
                },
                None => JobStatus::Succeeded,
            },
            terminal => terminal.clone(),
        };
        Ok(record.status.clone())
    }

    async fn cancel(&self, job_id: &str) -> Result<(), PipelineError> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| PipelineError::Submission(format!("unknown job '{job_id}'")))?;
        if !record.status.is_terminal() {
            record.status = JobStatus::Canceled {
                diagnostic: "canceled on operator request".to_string(),
            };
        }
        Ok(())
    }

    async fn summary(&self, job_id: &str, component: &str) -> Result<Summary, PipelineError> {
        let jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get(job_id)
            .ok_or_else(|| PipelineError::Submission(format!("unknown job '{job_id}'")))?;
        if record.status != JobStatus::Succeeded {
            return Err(PipelineError::JobNotComplete {
                job_id: job_id.to_string(),
                status: record.status.clone(),
            });
        }
        let (name, kind) = record
            .tasks
            .iter()
            .find(|(name, _)| name == component)
            .ok_or_else(|| PipelineError::NodeNotFound(component.to_string()))?;
        Ok(Summary::from([
            ("component".to_string(), json!(name)),
            ("kind".to_string(), json!(kind)),
            ("job_id".to_string(), json!(job_id)),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::Component;
    use crate::core::party::Role;
    use crate::core::pipeline::{Inputs, Pipeline};
    use crate::core::stage::StageRegistry;
    use std::collections::BTreeMap;

    fn one_reader_job() -> CompiledJob {
        let mut pipeline = Pipeline::new();
        pipeline.set_initiator(Role::Guest, 9999).unwrap();
        pipeline
            .set_roles(BTreeMap::from([(Role::Guest, vec![9999])]))
            .unwrap();
        pipeline
            .add_component(
                Component::new("reader_0", StageRegistry::builtin().get("reader").unwrap()),
                Inputs::new(),
            )
            .unwrap();
        pipeline.compile().unwrap()
    }

    #[tokio::test]
    async fn lifecycle_advances_one_state_per_query() {
        let backend = LocalBackend::new();
        let job_id = backend
            .submit(&one_reader_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();

        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Running);
        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Succeeded);
        // Terminal states are sticky.
        assert_eq!(backend.status(&job_id).await.unwrap(), JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn summary_requires_success_and_a_known_component() {
        let backend = LocalBackend::new();
        let job_id = backend
            .submit(&one_reader_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();
        assert!(backend.summary(&job_id, "reader_0").await.is_err());

        backend.status(&job_id).await.unwrap();
        backend.status(&job_id).await.unwrap();
        let summary = backend.summary(&job_id, "reader_0").await.unwrap();
        assert_eq!(summary["kind"], json!("reader"));
        assert!(matches!(
            backend.summary(&job_id, "reader_1").await.unwrap_err(),
            PipelineError::NodeNotFound(_)
        ));
    }

    #[tokio::test]
    async fn unknown_job_id_is_a_submission_error() {
        let backend = LocalBackend::new();
        assert!(matches!(
            backend.status("no-such-job").await.unwrap_err(),
            PipelineError::Submission(_)
        ));
    }
}
