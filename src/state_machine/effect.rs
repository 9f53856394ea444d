//! Effects produced by state transitions

use crate::state_machine::state::Seat;
use std::time::Duration;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Start a streamed generation for the participant in `seat`
    RequestGeneration {
        seat: Seat,
        model: String,
        prompt: String,
    },

    /// Cancel the in-flight generation, if any, and drop its handle
    AbortGeneration,

    /// Deliver `RetryElapsed` after `delay`
    ScheduleRetry { delay: Duration },
}

impl Effect {
    pub fn request_generation(seat: Seat, model: impl Into<String>, prompt: String) -> Self {
        Effect::RequestGeneration {
            seat,
            model: model.into(),
            prompt,
        }
    }
}
