//! Document extraction client (Chunkr task API)
//!
//! A staged file is uploaded as a task, then the task is polled with
//! exponential backoff until it succeeds, fails, or the poll budget runs out.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ExtractionSettings;
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Staged file to upload
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ExtractionOutput {
    pub task_id: String,
    /// Segment contents joined in document order
    pub content: String,
    /// Final task payload as returned by the service
    pub raw: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TaskStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    task_id: String,
    status: TaskStatus,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    output: Option<TaskOutput>,
}

/// Newer API versions wrap chunks in an object, older ones return the list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TaskOutput {
    Wrapped { chunks: Vec<Chunk> },
    Bare(Vec<Chunk>),
}

#[derive(Debug, Deserialize)]
struct Chunk {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    markdown: Option<String>,
}

impl TaskOutput {
    fn chunks(&self) -> &[Chunk] {
        match self {
            TaskOutput::Wrapped { chunks } => chunks,
            TaskOutput::Bare(chunks) => chunks,
        }
    }

    /// Join every non-empty segment: chunks → segments → content
    fn joined_content(&self) -> String {
        self.chunks()
            .iter()
            .flat_map(|chunk| chunk.segments.iter())
            .filter_map(|segment| {
                segment
                    .content
                    .as_deref()
                    .filter(|c| !c.trim().is_empty())
                    .or(segment.markdown.as_deref())
            })
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub struct ChunkrClient {
    endpoint: HttpEndpoint,
    max_poll_attempts: u32,
    poll_initial_interval: Duration,
    poll_max_interval: Duration,
}

impl ChunkrClient {
    pub fn new(settings: &ExtractionSettings, api_key: &Secret) -> Result<Self> {
        let endpoint = HttpEndpoint::new(
            CapabilityKind::DocumentExtraction,
            &settings.base_url,
            settings.timeout_secs,
            Auth::Bearer(api_key.clone()),
        )?;

        Ok(Self {
            endpoint,
            max_poll_attempts: settings.max_poll_attempts.max(1),
            poll_initial_interval: Duration::from_millis(settings.poll_initial_interval_ms),
            poll_max_interval: Duration::from_millis(settings.poll_max_interval_ms),
        })
    }

    async fn submit(&self, request: &ExtractionRequest) -> Result<String> {
        let bytes = tokio::fs::read(&request.path)
            .await
            .map_err(|source| Error::IoRead {
                path: request.path.clone(),
                source,
            })?;

        let file_name = request
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document")
            .to_string();

        let part = Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(mime_for(&file_name))
            .map_err(|e| Error::Internal(format!("Invalid upload MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let url = self.endpoint.url("api/v1/task");
        let task: TaskResponse = self
            .endpoint
            .send_json(self.endpoint.request(Method::POST, &url).multipart(form))
            .await?;

        info!(task_id = %task.task_id, status = ?task.status, file = %file_name, "Extraction task submitted");
        Ok(task.task_id)
    }

    /// Poll one task until it settles
    ///
    /// A transient failure on a single status request counts as one spent
    /// attempt. The task is never resubmitted from here.
    async fn poll(&self, task_id: &str) -> Result<ExtractionOutput> {
        let url = self.endpoint.url(&format!("api/v1/task/{}", task_id));
        let mut backoff = ExponentialBackoff {
            initial_interval: self.poll_initial_interval,
            max_interval: self.poll_max_interval,
            max_elapsed_time: None,
            ..Default::default()
        };

        for attempt in 1..=self.max_poll_attempts {
            match self.status(&url).await {
                Ok((task, raw)) => {
                    debug!(task_id, attempt, status = ?task.status, "Extraction task polled");
                    match task.status {
                        TaskStatus::Succeeded => {
                            let content = task
                                .output
                                .as_ref()
                                .map(TaskOutput::joined_content)
                                .unwrap_or_default();
                            return Ok(ExtractionOutput {
                                task_id: task.task_id,
                                content,
                                raw,
                            });
                        }
                        TaskStatus::Failed | TaskStatus::Cancelled => {
                            return Err(Error::rejected(
                                CapabilityKind::DocumentExtraction,
                                format!(
                                    "task {} ended as {:?}: {}",
                                    task_id,
                                    task.status,
                                    task.message.unwrap_or_else(|| "no message".to_string())
                                ),
                            ));
                        }
                        TaskStatus::Starting | TaskStatus::Processing | TaskStatus::Unknown => {}
                    }
                }
                Err(e) if e.is_retryable() => {
                    warn!(task_id, attempt, error = %e, "Extraction status request failed");
                }
                Err(e) => return Err(e),
            }

            if attempt < self.max_poll_attempts {
                let delay = backoff.next_backoff().unwrap_or(self.poll_max_interval);
                tokio::time::sleep(delay).await;
            }
        }

        Err(Error::PollExhausted {
            capability: CapabilityKind::DocumentExtraction.to_string(),
            job: task_id.to_string(),
            attempts: self.max_poll_attempts,
        })
    }

    async fn status(&self, url: &str) -> Result<(TaskResponse, serde_json::Value)> {
        let raw: serde_json::Value = self
            .endpoint
            .send_json(self.endpoint.request(Method::GET, url))
            .await?;
        let task = serde_json::from_value(raw.clone())
            .map_err(|e| Error::malformed(CapabilityKind::DocumentExtraction, e.to_string()))?;
        Ok((task, raw))
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next().map(str::to_lowercase).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Capability for ChunkrClient {
    type Request = ExtractionRequest;
    type Response = ExtractionOutput;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::DocumentExtraction
    }

    fn describe(&self) -> String {
        self.endpoint.base_url().to_string()
    }

    async fn invoke(&self, request: ExtractionRequest) -> Result<ExtractionOutput> {
        let task_id = self.submit(&request).await?;
        self.poll(&task_id).await
    }
}
