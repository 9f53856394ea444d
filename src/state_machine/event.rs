//! Events that can occur in a debate

use crate::llm::LlmError;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User events
    TopicSubmitted { topic: String },
    StopRequested,

    // Generation events
    Increment { text: String },
    GenerationComplete { full_text: String },
    GenerationFailed { error: LlmError },

    // Timer events
    RetryElapsed,
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::TopicSubmitted { .. } => "topic_submitted",
            Event::StopRequested => "stop_requested",
            Event::Increment { .. } => "increment",
            Event::GenerationComplete { .. } => "generation_complete",
            Event::GenerationFailed { .. } => "generation_failed",
            Event::RetryElapsed => "retry_elapsed",
        }
    }
}
