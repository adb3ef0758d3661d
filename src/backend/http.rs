//! HTTP client for a remote job coordinator.
//!
//! Speaks the coordinator's JSON envelope (`{retcode, retmsg, data}`) over
//! its v1 endpoints. A non-zero `retcode` on submission means the backend
//! rejected the specification before starting execution; the server's
//! message is surfaced verbatim.

use crate::backend::{ComputeBackend, ExecutionBackend, WorkMode};
use crate::core::compile::CompiledJob;
use crate::core::error::PipelineError;
use crate::job::{JobStatus, Summary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Configuration for the coordinator connection.
#[derive(Clone, Debug)]
pub struct HttpBackendConfig {
    /// Coordinator URL (default: http://127.0.0.1:9380)
    pub base_url: String,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9380".to_string(),
        }
    }
}

/// Execution backend reached over HTTP.
pub struct HttpBackend {
    config: HttpBackendConfig,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self::with_config(HttpBackendConfig::default())
    }

    pub fn at(base_url: impl Into<String>) -> Self {
        Self::with_config(HttpBackendConfig {
            base_url: base_url.into(),
        })
    }

    pub fn with_config(config: HttpBackendConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, PipelineError> {
        let url = format!("{}{path}", self.config.base_url);
        let envelope: FlowResponse<T> = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        if envelope.retcode != 0 {
            return Err(PipelineError::Submission(envelope.retmsg));
        }
        envelope.data.ok_or_else(|| {
            PipelineError::Submission(format!("coordinator returned no data for {path}"))
        })
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// The coordinator's uniform response envelope.
#[derive(Debug, Deserialize)]
struct FlowResponse<T> {
    retcode: i64,
    #[serde(default)]
    retmsg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    job_id: String,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    status: String,
    #[serde(default)]
    retmsg: String,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct JobRef<'a> {
    job_id: &'a str,
}

fn parse_status(data: QueryData) -> Result<JobStatus, PipelineError> {
    match data.status.as_str() {
        "waiting" => Ok(JobStatus::Submitted),
        "running" => Ok(JobStatus::Running),
        "success" => Ok(JobStatus::Succeeded),
        "failed" => Ok(JobStatus::Failed {
            diagnostic: data.retmsg,
        }),
        "canceled" => Ok(JobStatus::Canceled {
            diagnostic: data.retmsg,
        }),
        other => Err(PipelineError::Submission(format!(
            "coordinator reported unknown job status '{other}'"
        ))),
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn submit(
        &self,
        job: &CompiledJob,
        backend: ComputeBackend,
        work_mode: WorkMode,
    ) -> Result<String, PipelineError> {
        let body = json!({
            "job_dsl": job.dsl,
            "job_runtime_conf": job.conf,
            "backend": backend.to_string(),
            "work_mode": work_mode.to_string(),
        });
        let data: SubmitData = self.post("/v1/job/submit", &body).await?;
        Ok(data.job_id)
    }

    async fn status(&self, job_id: &str) -> Result<JobStatus, PipelineError> {
        let data: QueryData = self
            .post("/v1/job/query", &serde_json::to_value(JobRef { job_id })?)
            .await?;
        if let Some(created) = data.create_time {
            log::debug!("job '{job_id}' created at {created}, status '{}'", data.status);
        }
        parse_status(data)
    }

    async fn cancel(&self, job_id: &str) -> Result<(), PipelineError> {
        let _: serde_json::Value = self
            .post("/v1/job/stop", &serde_json::to_value(JobRef { job_id })?)
            .await?;
        Ok(())
    }

    async fn summary(&self, job_id: &str, component: &str) -> Result<Summary, PipelineError> {
        let body = json!({ "job_id": job_id, "component_name": component });
        self.post("/v1/tracking/component/summary", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_map_onto_the_state_machine() {
        let running = QueryData {
            status: "running".to_string(),
            retmsg: String::new(),
            create_time: None,
        };
        assert_eq!(parse_status(running).unwrap(), JobStatus::Running);

        let failed = QueryData {
            status: "failed".to_string(),
            retmsg: "host 10000 lost".to_string(),
            create_time: None,
        };
        assert_eq!(
            parse_status(failed).unwrap(),
            JobStatus::Failed { diagnostic: "host 10000 lost".to_string() }
        );

        let odd = QueryData {
            status: "paused".to_string(),
            retmsg: String::new(),
            create_time: None,
        };
        assert!(parse_status(odd).is_err());
    }

    #[test]
    fn default_config_points_at_localhost() {
        let backend = HttpBackend::new();
        assert_eq!(backend.config.base_url, "http://127.0.0.1:9380");
        assert_eq!(HttpBackend::at("http://10.0.0.2:9380").config.base_url, "http://10.0.0.2:9380");
    }
}
