use crate::core::party::{PartyId, Role};
use crate::job::JobStatus;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid role configuration: {0}")]
    InvalidRoleConfiguration(String),

    #[error("component name already in use: '{0}'")]
    DuplicateName(String),

    #[error("party ({role}, {party_id}) is not registered for this job")]
    UnknownParty { role: Role, party_id: PartyId },

    #[error("component '{component}' declares no output handle '{handle}'")]
    UnknownHandle { component: String, handle: String },

    #[error("input of '{component}' references unregistered component '{source_component}'")]
    UnknownSource {
        component: String,
        source_component: String,
    },

    #[error("unknown stage kind: '{0}'")]
    UnknownStageKind(String),

    #[error("graph validation failed: {0}")]
    GraphValidation(String),

    #[error("job submission rejected by backend: {0}")]
    Submission(String),

    #[error("job '{job_id}' has no summaries in state {status}")]
    JobNotComplete { job_id: String, status: JobStatus },

    #[error("component '{0}' is not part of the compiled job")]
    NodeNotFound(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}
