//! Generative-model client for document extraction.
//!
//! Runs the full round trip for one scan: upload the bytes to the model's
//! file store, wait for the store to finish processing, ask the model for
//! structured receipt data, and release the remote file afterwards whatever
//! the outcome.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};

use super::types::{
    AnalysisConfig, Content, FileData, FileState, GenerateContentRequest,
    GenerateContentResponse, GenerationConfig, Part, RemoteFile, UploadResponse,
};
use crate::error::PipelineError;

/// Per-request timeout on every call to the backend.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Interval between remote state polls.
const STATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on waiting for the remote store to process an upload.
const REMOTE_PROCESSING_WAIT: Duration = Duration::from_secs(120);

/// Instruction prompt sent with every scan.
const EXTRACTION_PROMPT: &str = r#"Analyze this scanned document. Extract JSON with these keys:
"date" (YYYY-MM-DD),
"vendor" (business or clinic name as printed),
"category" (Medical, Grocery, Tax, Utilities, Septic, Other),
"total_amount" (integer, whole currency units).
If the page holds more than one receipt, return a JSON array with one object per receipt."#;

/// Client for the generative language file + generation API.
pub struct GeminiClient {
    http: Client,
    config: AnalysisConfig,
    limiter: Arc<Semaphore>,
}

impl GeminiClient {
    pub fn new(config: AnalysisConfig) -> Result<Self, PipelineError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        let limiter = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));

        Ok(Self {
            http,
            config,
            limiter,
        })
    }

    /// Run upload -> poll -> generate for one stable file.
    ///
    /// Returns the raw JSON text from the model's first content part. Once
    /// the upload has succeeded, the remote file is deleted on every exit
    /// path; a failed delete is logged and never escalated.
    pub async fn extract(&self, path: &Path) -> Result<String, PipelineError> {
        let _permit = self.limiter.acquire().await.expect("Semaphore closed");

        let bytes = tokio::fs::read(path).await?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();

        let uploaded = self.upload(bytes, mime.as_ref()).await?;
        tracing::debug!(
            "[Analysis] Uploaded {} as {}",
            path.display(),
            uploaded.name
        );

        let outcome = self.generate_for(&uploaded, mime.as_ref()).await;

        if let Err(e) = self.delete(&uploaded.name).await {
            tracing::warn!(
                "[Analysis] Failed to delete remote file {}: {}",
                uploaded.name,
                e
            );
        }

        outcome
    }

    async fn generate_for(
        &self,
        uploaded: &RemoteFile,
        mime: &str,
    ) -> Result<String, PipelineError> {
        let ready = self.await_processed(uploaded).await?;
        if ready.state != FileState::Active {
            return Err(PipelineError::RemoteProcessingFailed { state: ready.state });
        }

        self.generate(&ready.uri, mime).await
    }

    /// Push raw bytes into the remote blob store.
    async fn upload(&self, bytes: Vec<u8>, mime: &str) -> Result<RemoteFile, PipelineError> {
        let url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );

        let resp = self
            .http
            .post(url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await?;

        let resp = Self::check_status(resp).await?;
        let upload: UploadResponse = resp.json().await?;
        Ok(upload.file)
    }

    /// Poll the remote file until it leaves the processing state.
    async fn await_processed(&self, file: &RemoteFile) -> Result<RemoteFile, PipelineError> {
        let started = Instant::now();
        let mut current = file.clone();

        while current.state == FileState::Processing {
            if started.elapsed() >= REMOTE_PROCESSING_WAIT {
                return Err(PipelineError::RemoteProcessingTimeout {
                    max_wait: REMOTE_PROCESSING_WAIT,
                });
            }
            sleep(STATE_POLL_INTERVAL).await;
            current = self.get_file(&current.name).await?;
        }

        Ok(current)
    }

    async fn get_file(&self, name: &str) -> Result<RemoteFile, PipelineError> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );

        let resp = self.http.get(url).send().await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    async fn delete(&self, name: &str) -> Result<(), PipelineError> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );

        let resp = self.http.delete(url).send().await?;
        Self::check_status(resp).await?;
        Ok(())
    }

    /// Ask the model for structured data about the uploaded scan.
    async fn generate(&self, file_uri: &str, mime: &str) -> Result<String, PipelineError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part {
                        file_data: Some(FileData {
                            file_uri: file_uri.to_string(),
                            mime_type: mime.to_string(),
                        }),
                        text: None,
                    },
                    Part {
                        text: Some(EXTRACTION_PROMPT.to_string()),
                        file_data: None,
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let resp = self.http.post(url).json(&request).send().await?;
        let resp = Self::check_status(resp).await?;
        let body: GenerateContentResponse = resp.json().await?;

        body.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .filter(|t| !t.trim().is_empty())
            .ok_or(PipelineError::EmptyResponse)
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, PipelineError> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(PipelineError::Api { status, body })
    }
}
