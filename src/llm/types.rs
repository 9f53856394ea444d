//! Common types for generation requests and their streamed outcome

use super::LlmError;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Request body for `POST /api/generate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

/// One newline-delimited record of a streamed generation
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GenerateRecord {
    #[serde(default)]
    pub model: String,
    pub response: String,
    pub done: bool,
}

/// One line of the generate stream. Ollama reports failures that happen
/// after the status line as `{"error": "..."}` records.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StreamLine {
    Record(GenerateRecord),
    Error { error: String },
}

/// Body of `GET /api/tags`
#[derive(Debug, Deserialize)]
pub(crate) struct TagsResponse {
    pub models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TagEntry {
    pub name: String,
}

/// What a [`Generation`] yields, in order: increments, then one terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Increment(String),
    Complete(String),
    Failed(LlmError),
}

/// Consumer side of one in-flight generation.
///
/// Increments are drained before the terminal outcome is read, so the
/// outcome is always the last event observed. After the terminal event
/// `next_event` returns `None`.
#[derive(Debug)]
pub struct Generation {
    increments: mpsc::Receiver<String>,
    outcome: Option<oneshot::Receiver<Result<String, LlmError>>>,
}

impl Generation {
    pub fn new(
        increments: mpsc::Receiver<String>,
        outcome: oneshot::Receiver<Result<String, LlmError>>,
    ) -> Self {
        Self {
            increments,
            outcome: Some(outcome),
        }
    }

    /// Producer half for a new generation.
    ///
    /// `buffer` bounds how many increments may wait for the consumer.
    pub fn channel(buffer: usize) -> (GenerationSink, Generation) {
        let (increments_tx, increments_rx) = mpsc::channel(buffer);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        (
            GenerationSink {
                increments: increments_tx,
                outcome: outcome_tx,
            },
            Generation::new(increments_rx, outcome_rx),
        )
    }

    /// Wait for the next event. Cancel-safe.
    pub async fn next_event(&mut self) -> Option<GenerationEvent> {
        let outcome = self.outcome.as_mut()?;
        if let Some(text) = self.increments.recv().await {
            return Some(GenerationEvent::Increment(text));
        }
        let result = outcome.await;
        self.outcome = None;
        Some(match result {
            Ok(Ok(full_text)) => GenerationEvent::Complete(full_text),
            Ok(Err(error)) => GenerationEvent::Failed(error),
            Err(_) => GenerationEvent::Failed(LlmError::unknown(
                "generation task ended without reporting an outcome",
            )),
        })
    }
}

/// Producer side of a generation, owned by the background task
#[derive(Debug)]
pub struct GenerationSink {
    pub increments: mpsc::Sender<String>,
    pub outcome: oneshot::Sender<Result<String, LlmError>>,
}

impl GenerationSink {
    /// Close the increment stream, then report the terminal outcome.
    pub fn finish(self, result: Result<String, LlmError>) {
        let GenerationSink {
            increments,
            outcome,
        } = self;
        drop(increments);
        let _ = outcome.send(result);
    }
}
