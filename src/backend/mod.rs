//! The execution backend boundary.
//!
//! The core never runs computation itself; it hands a [`CompiledJob`] to an
//! [`ExecutionBackend`] and tracks the backend-reported status. The
//! [`local::LocalBackend`] covers standalone deployments and tests; an HTTP
//! client for a remote coordinator lives behind the `http` feature.

pub mod local;

#[cfg(feature = "http")]
pub mod http;

use crate::core::compile::CompiledJob;
use crate::core::error::PipelineError;
use crate::core::party::{PartyId, Role};
use crate::job::{JobStatus, Summary};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// The compute engine a job runs on. Closed enumeration of the raw integer
/// codes accepted at the configuration boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeBackend {
    Eggroll,
    Spark,
}

impl TryFrom<i64> for ComputeBackend {
    type Error = PipelineError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ComputeBackend::Eggroll),
            1 => Ok(ComputeBackend::Spark),
            other => Err(PipelineError::Submission(format!(
                "unknown compute backend code {other}"
            ))),
        }
    }
}

impl fmt::Display for ComputeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComputeBackend::Eggroll => "eggroll",
            ComputeBackend::Spark => "spark",
        })
    }
}

/// Whether the job runs on a single machine or across a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkMode {
    Standalone,
    Cluster,
}

impl TryFrom<i64> for WorkMode {
    type Error = PipelineError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(WorkMode::Standalone),
            1 => Ok(WorkMode::Cluster),
            other => Err(PipelineError::Submission(format!(
                "unknown work mode code {other}"
            ))),
        }
    }
}

impl fmt::Display for WorkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkMode::Standalone => "standalone",
            WorkMode::Cluster => "cluster",
        })
    }
}

/// The collaborator that actually schedules and runs a compiled job.
///
/// Implementations report status transitions; the client never infers them.
/// `cancel` is best-effort; the job may already be terminal by the time the
/// request lands.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Submits the compiled specification; returns the backend job id.
    async fn submit(
        &self,
        job: &CompiledJob,
        backend: ComputeBackend,
        work_mode: WorkMode,
    ) -> Result<String, PipelineError>;

    /// Queries the current status of a submitted job.
    async fn status(&self, job_id: &str) -> Result<JobStatus, PipelineError>;

    /// Requests cancellation of a submitted job.
    async fn cancel(&self, job_id: &str) -> Result<(), PipelineError>;

    /// Fetches the result summary of one component of a succeeded job.
    async fn summary(&self, job_id: &str, component: &str) -> Result<Summary, PipelineError>;
}

/// The deserializable shape of the external runtime configuration file.
///
/// Loading and parsing the file is the caller's concern; this type only
/// fixes the shape (`parties`, raw `backend` and `work_mode` codes) and
/// converts the codes into their closed enumerations.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConf {
    pub parties: BTreeMap<Role, Vec<PartyId>>,
    #[serde(default)]
    pub backend: i64,
    #[serde(default)]
    pub work_mode: i64,
}

impl RuntimeConf {
    pub fn backend(&self) -> Result<ComputeBackend, PipelineError> {
        ComputeBackend::try_from(self.backend)
    }

    pub fn work_mode(&self) -> Result<WorkMode, PipelineError> {
        WorkMode::try_from(self.work_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backend_codes_round_trip() {
        assert_eq!(ComputeBackend::try_from(0).unwrap(), ComputeBackend::Eggroll);
        assert_eq!(ComputeBackend::try_from(1).unwrap(), ComputeBackend::Spark);
        assert!(ComputeBackend::try_from(7).is_err());
        assert_eq!(WorkMode::try_from(1).unwrap(), WorkMode::Cluster);
        assert!(WorkMode::try_from(-1).is_err());
    }

    #[test]
    fn runtime_conf_deserializes_parties_and_codes() {
        let conf: RuntimeConf = serde_json::from_value(json!({
            "parties": {
                "guest": [9999],
                "host": [10000, 10001],
                "arbiter": [10002],
            },
            "backend": 0,
            "work_mode": 1,
        }))
        .unwrap();

        assert_eq!(conf.parties[&Role::Host], vec![10000, 10001]);
        assert_eq!(conf.backend().unwrap(), ComputeBackend::Eggroll);
        assert_eq!(conf.work_mode().unwrap(), WorkMode::Cluster);
    }

    #[test]
    fn missing_codes_default_to_zero() {
        let conf: RuntimeConf = serde_json::from_value(json!({
            "parties": { "guest": [9999] },
        }))
        .unwrap();
        assert_eq!(conf.backend().unwrap(), ComputeBackend::Eggroll);
        assert_eq!(conf.work_mode().unwrap(), WorkMode::Standalone);
    }
}
