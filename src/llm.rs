//! Generation backend abstraction
//!
//! A backend turns a prompt into a cancellable stream of text increments
//! followed by one terminal outcome.

mod error;
mod ndjson;
mod ollama;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use ollama::{OllamaClient, DEFAULT_BASE_URL};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Common interface for generation backends
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start a streamed generation on a background task.
    ///
    /// Never blocks; every failure (including cancellation) arrives as the
    /// terminal event of the returned [`Generation`].
    fn generate(&self, cancel: CancellationToken, model: &str, prompt: &str) -> Generation;

    /// Names of the models the backend can serve
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;

    /// Check that `model` is installed
    async fn validate_model(&self, model: &str) -> Result<(), LlmError> {
        let models = self.list_models().await?;
        if models.iter().any(|m| m == model) {
            Ok(())
        } else {
            Err(LlmError::model_not_found(model))
        }
    }
}

#[async_trait]
impl<T: GenerationClient + ?Sized> GenerationClient for Arc<T> {
    fn generate(&self, cancel: CancellationToken, model: &str, prompt: &str) -> Generation {
        (**self).generate(cancel, model, prompt)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        (**self).list_models().await
    }

    async fn validate_model(&self, model: &str) -> Result<(), LlmError> {
        (**self).validate_model(model).await
    }
}
