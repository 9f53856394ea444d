//! Ollama HTTP API client
//!
//! `POST /api/generate` streams newline-delimited JSON records;
//! `GET /api/tags` lists the installed models.

use super::ndjson::LineDecoder;
use super::types::{GenerateRequest, Generation, StreamLine, TagsResponse};
use super::{GenerationClient, LlmError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// How many parsed increments may wait for a slow consumer
const INCREMENT_BUFFER: usize = 16;

/// Client for a single Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// An empty `base_url` selects [`DEFAULT_BASE_URL`]. A bare `host:port`
    /// (the usual `OLLAMA_HOST` form) gets an `http://` scheme.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim();
        let base_url = if base_url.is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else if base_url.contains("://") {
            base_url.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", base_url.trim_end_matches('/'))
        };

        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl GenerationClient for OllamaClient {
    fn generate(&self, cancel: CancellationToken, model: &str, prompt: &str) -> Generation {
        let (sink, generation) = Generation::channel(INCREMENT_BUFFER);
        let request = self
            .client
            .post(self.url("/api/generate"))
            .header("Content-Type", "application/json")
            .json(&GenerateRequest {
                model: model.to_string(),
                prompt: prompt.to_string(),
                stream: true,
            });
        let model = model.to_string();

        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let result = stream_generation(request, &cancel, &sink.increments).await;

            match &result {
                Ok(text) => tracing::info!(
                    model = %model,
                    duration_ms = %started.elapsed().as_millis(),
                    chars = text.len(),
                    "Generation completed"
                ),
                Err(e) if e.is_canceled() => {
                    tracing::info!(model = %model, "Generation canceled");
                }
                Err(e) => tracing::warn!(
                    model = %model,
                    duration_ms = %started.elapsed().as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Generation failed"
                ),
            }

            sink.finish(result);
        });

        generation
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let response = self
            .client
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| LlmError::from_send(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| LlmError::disconnected(format!("failed to read model list: {e}")))?;
        let tags: TagsResponse = serde_json::from_slice(&body)
            .map_err(|e| LlmError::malformed(format!("failed to parse Ollama response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}

/// Drive one streamed generation to its terminal outcome.
///
/// Cancellation is observed before the response arrives, while waiting for
/// body bytes, at every record boundary, and while blocked on a full
/// increment channel.
async fn stream_generation(
    request: reqwest::RequestBuilder,
    cancel: &CancellationToken,
    increments: &mpsc::Sender<String>,
) -> Result<String, LlmError> {
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(LlmError::canceled()),
        response = request.send() => response.map_err(|e| LlmError::from_send(&e))?,
    };

    let status = response.status();
    if !status.is_success() {
        return Err(LlmError::status(status.as_u16()));
    }

    let mut body = response.bytes_stream();
    let mut decoder = LineDecoder::default();
    let mut full_text = String::new();

    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::canceled()),
            chunk = body.next() => chunk,
        };
        let Some(chunk) = chunk else { break };
        let chunk = chunk.map_err(|e| LlmError::disconnected(format!("error reading response: {e}")))?;

        for line in decoder.push(&chunk) {
            if deliver(&line, &mut full_text, cancel, increments).await? {
                return Ok(full_text);
            }
        }
    }

    if let Some(line) = decoder.finish() {
        if deliver(&line, &mut full_text, cancel, increments).await? {
            return Ok(full_text);
        }
    }

    Err(LlmError::disconnected(
        "response ended before the final record",
    ))
}

/// Parse one record and hand its increment over. Returns `true` on the final record.
async fn deliver(
    line: &[u8],
    full_text: &mut String,
    cancel: &CancellationToken,
    increments: &mpsc::Sender<String>,
) -> Result<bool, LlmError> {
    if cancel.is_cancelled() {
        return Err(LlmError::canceled());
    }

    let line: StreamLine = serde_json::from_slice(line)
        .map_err(|e| LlmError::malformed(format!("failed to parse response: {e}")))?;
    let record = match line {
        StreamLine::Record(record) => record,
        StreamLine::Error { error } => return Err(LlmError::backend(&error)),
    };
    if record.done {
        tracing::debug!(model = %record.model, "Final record received");
    }

    if !record.response.is_empty() {
        full_text.push_str(&record.response);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::canceled()),
            sent = increments.send(record.response) => {
                // Consumer dropped its handle
                if sent.is_err() {
                    return Err(LlmError::canceled());
                }
            }
        }
    }

    Ok(record.done)
}
