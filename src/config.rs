//! Command line configuration and startup checks

use crate::llm::{GenerationClient, LlmError, LlmErrorKind, OllamaClient, DEFAULT_BASE_URL};
use crate::state_machine::{DebateContext, Participants};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL1: &str = "gemma3n:e4b";
pub const DEFAULT_MODEL2: &str = "gemma3:4b";

/// CLI arguments for ai-debate
#[derive(Parser, Debug, Clone)]
#[command(name = "ai-debate")]
#[command(author, version, about = "Two local Ollama models debate a topic of your choice")]
#[command(long_about = r#"
Two models served by Ollama take turns arguing a topic you enter. The first
model opens, the second takes the opposing side, and they keep responding
to each other until you stop the debate.

Both models must already be installed:
  ollama pull gemma3n:e4b
  ollama pull gemma3:4b

Example:
  ai-debate --model1 llama3.2:3b --model2 mistral:7b
"#)]
pub struct Cli {
    /// Model that opens the debate
    #[arg(long, env = "DEBATE_MODEL1", default_value = DEFAULT_MODEL1, value_name = "MODEL")]
    pub model1: String,

    /// Model that answers the opening argument
    #[arg(long, env = "DEBATE_MODEL2", default_value = DEFAULT_MODEL2, value_name = "MODEL")]
    pub model2: String,

    /// Ollama server address
    #[arg(long, env = "OLLAMA_HOST", default_value = DEFAULT_BASE_URL, value_name = "URL")]
    pub base_url: String,

    /// Stop after this many generations fail in a row (0 = never)
    #[arg(long, default_value_t = 5, value_name = "N")]
    pub max_consecutive_failures: u32,

    /// Base delay before retrying after a failure, doubled per failure (0 = immediate)
    #[arg(long, default_value_t = 1000, value_name = "MS")]
    pub retry_delay_ms: u64,

    /// Log file (defaults to ~/.ai-debate/debate.log)
    #[arg(long, env = "DEBATE_LOG_PATH", value_name = "PATH")]
    pub log_path: Option<PathBuf>,
}

impl Cli {
    pub fn models(&self) -> [&str; 2] {
        [self.model1.as_str(), self.model2.as_str()]
    }

    pub fn debate_context(&self) -> DebateContext {
        DebateContext::new(Participants::new(&self.model1, &self.model2))
            .with_max_consecutive_failures(self.max_consecutive_failures)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
    }

    pub fn client(&self) -> OllamaClient {
        OllamaClient::new(&self.base_url)
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(format!("{home}/.ai-debate/debate.log"))
        })
    }
}

/// Reasons the debate cannot start
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot reach Ollama at {base_url}: {source}\nIs Ollama running? Start it with `ollama serve`.")]
    Unreachable { base_url: String, source: LlmError },

    #[error("model '{model}' is not available in Ollama.\nInstall it with: ollama pull {model}")]
    ModelMissing { model: String },

    #[error("failed to list Ollama models: {0}")]
    Catalog(LlmError),
}

/// Check that every model is installed before the debate starts.
pub async fn validate_models<C>(client: &C, base_url: &str, models: &[&str]) -> Result<(), StartupError>
where
    C: GenerationClient + ?Sized,
{
    for model in models {
        match client.validate_model(model).await {
            Ok(()) => tracing::info!(model = %model, "Model available"),
            Err(e) if e.kind == LlmErrorKind::ModelNotFound => {
                return Err(StartupError::ModelMissing {
                    model: (*model).to_string(),
                });
            }
            Err(e) if e.kind == LlmErrorKind::Connect => {
                return Err(StartupError::Unreachable {
                    base_url: base_url.to_string(),
                    source: e,
                });
            }
            Err(e) => return Err(StartupError::Catalog(e)),
        }
    }
    Ok(())
}
