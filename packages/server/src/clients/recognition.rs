use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::config::{RecognitionConfig, TaskKind};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("recognition request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("recognition service answered {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// One image submitted for recognition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DispatchJob {
    /// Task identifier echoed back in the callback.
    pub task_id: String,
    /// Object key of the image in the blob store.
    pub image_path: String,
    pub height: Option<f64>,
    pub angle: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SubmitRequest<'a> {
    task_type: TaskKind,
    callback_url: &'a str,
    tasks: &'a [DispatchJob],
}

/// Submits jobs to the external recognition service.
#[async_trait]
pub trait RecognitionDispatcher: Send + Sync {
    async fn submit(&self, jobs: &[DispatchJob]) -> Result<(), DispatchError>;
}

/// Hands `jobs` to `dispatcher` on a background task.
///
/// Failures are logged; the affected tasks stay `processing`.
pub fn spawn_dispatch(dispatcher: Arc<dyn RecognitionDispatcher>, jobs: Vec<DispatchJob>) {
    if jobs.is_empty() {
        return;
    }
    tokio::spawn(async move {
        match dispatcher.submit(&jobs).await {
            Ok(()) => info!(count = jobs.len(), "Dispatched recognition jobs"),
            Err(e) => error!(
                count = jobs.len(),
                task_ids = ?jobs.iter().map(|j| j.task_id.as_str()).collect::<Vec<_>>(),
                error = %e,
                "Failed to dispatch recognition jobs"
            ),
        }
    });
}

/// HTTP client for the recognition service.
pub struct HttpRecognitionClient {
    client: Client,
    submit_url: String,
    callback_url: String,
    task_kind: TaskKind,
    accepted_status: u16,
}

impl HttpRecognitionClient {
    /// `public_url` is this server's externally reachable base URL.
    pub fn new(config: &RecognitionConfig, public_url: &str) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            submit_url: format!(
                "{}{}",
                config.base_url.trim_end_matches('/'),
                config.submit_path
            ),
            callback_url: callback_url(public_url, config.task_kind),
            task_kind: config.task_kind,
            accepted_status: config.accepted_status,
        })
    }
}

/// Callback endpoint the service must answer on for `kind`.
pub fn callback_url(public_url: &str, kind: TaskKind) -> String {
    let path = match kind {
        TaskKind::Location => "/api/update-image-result",
        TaskKind::Detection => "/api/update-image-trash-result",
    };
    format!("{}{}", public_url.trim_end_matches('/'), path)
}

#[async_trait]
impl RecognitionDispatcher for HttpRecognitionClient {
    #[instrument(skip_all, fields(count = jobs.len()))]
    async fn submit(&self, jobs: &[DispatchJob]) -> Result<(), DispatchError> {
        if jobs.is_empty() {
            return Ok(());
        }

        let res = self
            .client
            .post(&self.submit_url)
            .json(&SubmitRequest {
                task_type: self.task_kind,
                callback_url: &self.callback_url,
                tasks: jobs,
            })
            .send()
            .await?;

        let status = res.status();
        if status.as_u16() != self.accepted_status {
            let body = res.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status, body });
        }
        Ok(())
    }
}
