//! Client-side tracking of submitted jobs.
//!
//! Submission returns a [`JobHandle`] immediately; the backend runs the
//! possibly multi-hour distributed computation on its own. The handle only
//! ever changes through backend-reported status (the client never infers a
//! transition) and becomes immutable once a terminal state is reached.

use crate::backend::{ComputeBackend, ExecutionBackend, WorkMode};
use crate::core::ParamValue;
use crate::core::compile::CompiledJob;
use crate::core::error::PipelineError;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Stage-kind-specific, opaque result document of one component.
pub type Summary = BTreeMap<String, ParamValue>;

/// Backend-reported lifecycle state of a job.
///
/// `Submitted → Running → {Succeeded | Failed | Canceled}`; the failure
/// states carry the backend's diagnostic verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Submitted,
    Running,
    Succeeded,
    Failed { diagnostic: String },
    Canceled { diagnostic: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed { .. } | JobStatus::Canceled { .. }
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Submitted => f.write_str("SUBMITTED"),
            JobStatus::Running => f.write_str("RUNNING"),
            JobStatus::Succeeded => f.write_str("SUCCEEDED"),
            JobStatus::Failed { diagnostic } => write!(f, "FAILED ({diagnostic})"),
            JobStatus::Canceled { diagnostic } => write!(f, "CANCELED ({diagnostic})"),
        }
    }
}

/// Client-side proxy for one submitted job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    job_id: String,
    status: JobStatus,
    components: Vec<String>,
    summaries: BTreeMap<String, Summary>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    /// Result summary of one component. Only available after the job
    /// succeeded; failed and canceled jobs carry a diagnostic instead of
    /// per-component results.
    pub fn summary(&self, component: &str) -> Result<&Summary, PipelineError> {
        if !self.components.iter().any(|c| c == component) {
            return Err(PipelineError::NodeNotFound(component.to_string()));
        }
        match &self.status {
            JobStatus::Succeeded => Ok(self
                .summaries
                .get(component)
                .expect("summaries fetched on success")),
            status => Err(PipelineError::JobNotComplete {
                job_id: self.job_id.clone(),
                status: status.clone(),
            }),
        }
    }
}

/// Submits compiled jobs and tracks them to completion.
///
/// No call here retries on its own: re-submitting a rejected job could
/// double-run a non-idempotent distributed computation, so the caller must
/// re-invoke explicitly.
#[derive(Clone)]
pub struct JobSubmitter {
    backend: Arc<dyn ExecutionBackend>,
}

impl JobSubmitter {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self { backend }
    }

    /// Sends the compiled specification to the backend. Returns immediately
    /// with a handle in `Submitted` state.
    pub async fn submit(
        &self,
        job: &CompiledJob,
        backend: ComputeBackend,
        work_mode: WorkMode,
    ) -> Result<JobHandle, PipelineError> {
        let job_id = self.backend.submit(job, backend, work_mode).await?;
        log::info!("job '{job_id}' submitted ({backend}, {work_mode})");
        Ok(JobHandle {
            job_id,
            status: JobStatus::Submitted,
            components: job.component_names().map(str::to_string).collect(),
            summaries: BTreeMap::new(),
        })
    }

    /// One status query. A handle in a terminal state is never touched
    /// again; on the transition to `Succeeded` the per-component summaries
    /// are fetched and cached on the handle.
    pub async fn poll(&self, handle: &mut JobHandle) -> Result<JobStatus, PipelineError> {
        if handle.status.is_terminal() {
            return Ok(handle.status.clone());
        }
        let status = self.backend.status(&handle.job_id).await?;
        if status != handle.status {
            log::info!("job '{}': {} -> {status}", handle.job_id, handle.status);
        }
        if status == JobStatus::Succeeded {
            for component in &handle.components {
                let summary = self.backend.summary(&handle.job_id, component).await?;
                handle.summaries.insert(component.clone(), summary);
            }
        }
        handle.status = status.clone();
        Ok(status)
    }

    /// Polls cooperatively until the job is terminal or `timeout` elapses.
    /// On timeout the last known (non-terminal) status is returned and the
    /// caller decides what to do next.
    pub async fn wait(
        &self,
        handle: &mut JobHandle,
        poll_interval: Duration,
        timeout: Option<Duration>,
    ) -> Result<JobStatus, PipelineError> {
        let started = tokio::time::Instant::now();
        loop {
            let status = self.poll(handle).await?;
            if status.is_terminal() {
                return Ok(status);
            }
            if let Some(limit) = timeout
                && started.elapsed() >= limit
            {
                log::warn!(
                    "job '{}' still {status} after {limit:?}",
                    handle.job_id
                );
                return Ok(status);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Best-effort cancellation request. The backend may already be
    /// terminal; the actual state change arrives through polling.
    pub async fn cancel(&self, handle: &JobHandle) -> Result<(), PipelineError> {
        if handle.status.is_terminal() {
            log::warn!(
                "job '{}' already terminal ({}); cancel request skipped",
                handle.job_id,
                handle.status
            );
            return Ok(());
        }
        self.backend.cancel(&handle.job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::local::LocalBackend;
    use crate::core::component::Component;
    use crate::core::party::Role;
    use crate::core::pipeline::{Inputs, Pipeline};
    use crate::core::stage::StageRegistry;

    fn compiled_job() -> CompiledJob {
        let registry = StageRegistry::builtin();
        let mut pipeline = Pipeline::new();
        pipeline.set_initiator(Role::Guest, 9999).unwrap();
        pipeline
            .set_roles(BTreeMap::from([
                (Role::Guest, vec![9999]),
                (Role::Host, vec![10000]),
            ]))
            .unwrap();
        let reader = Component::new("reader_0", registry.get("reader").unwrap());
        let out = reader.output("data").unwrap();
        pipeline.add_component(reader, Inputs::new()).unwrap();
        pipeline
            .add_component(
                Component::new("dataio_0", registry.get("data_io").unwrap()),
                Inputs::new().data(out),
            )
            .unwrap();
        pipeline.compile().unwrap()
    }

    #[tokio::test]
    async fn submit_wait_and_read_summary() {
        let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();
        assert_eq!(*handle.status(), JobStatus::Submitted);

        let status = submitter
            .wait(&mut handle, Duration::from_millis(1), None)
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Succeeded);

        let summary = handle.summary("dataio_0").unwrap();
        assert!(summary.contains_key("component"));
    }

    #[tokio::test]
    async fn summary_before_terminal_state_fails() {
        let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();

        // One poll moves the local backend from SUBMITTED to RUNNING.
        let status = submitter.poll(&mut handle).await.unwrap();
        assert_eq!(status, JobStatus::Running);

        let err = handle.summary("dataio_0").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::JobNotComplete { status: JobStatus::Running, .. }
        ));
    }

    #[tokio::test]
    async fn summary_of_uncompiled_component_fails() {
        let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();
        submitter
            .wait(&mut handle, Duration::from_millis(1), None)
            .await
            .unwrap();

        let err = handle.summary("hetero_lr_0").unwrap_err();
        assert!(matches!(err, PipelineError::NodeNotFound(_)));
    }

    #[tokio::test]
    async fn failed_job_surfaces_the_backend_diagnostic() {
        let backend = LocalBackend::new().fail_jobs("guest dataset missing");
        let submitter = JobSubmitter::new(Arc::new(backend));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();

        let status = submitter
            .wait(&mut handle, Duration::from_millis(1), None)
            .await
            .unwrap();
        assert_eq!(
            status,
            JobStatus::Failed { diagnostic: "guest dataset missing".to_string() }
        );
        assert!(handle.summary("dataio_0").is_err());
    }

    #[tokio::test]
    async fn cancel_then_poll_reports_canceled() {
        let submitter = JobSubmitter::new(Arc::new(LocalBackend::new()));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();

        submitter.cancel(&handle).await.unwrap();
        let status = submitter.poll(&mut handle).await.unwrap();
        assert!(matches!(status, JobStatus::Canceled { .. }));

        // Terminal handles are immutable; polling again is a no-op.
        let again = submitter.poll(&mut handle).await.unwrap();
        assert_eq!(again, status);
    }

    #[tokio::test]
    async fn wait_with_timeout_returns_last_known_status() {
        let backend = LocalBackend::new().hold_in_running();
        let submitter = JobSubmitter::new(Arc::new(backend));
        let mut handle = submitter
            .submit(&compiled_job(), ComputeBackend::Eggroll, WorkMode::Standalone)
            .await
            .unwrap();

        let status = submitter
            .wait(
                &mut handle,
                Duration::from_millis(1),
                Some(Duration::from_millis(5)),
            )
            .await
            .unwrap();
        assert_eq!(status, JobStatus::Running);
    }
}
