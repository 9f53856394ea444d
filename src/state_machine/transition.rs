//! State transition function

use super::state::{CloseOutcome, DebateContext, DebatePhase, DebateSession, Seat};
use super::{Effect, Event};
use crate::llm::LlmErrorKind;
use crate::prompt;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionResult {
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Topic cannot be empty")]
    EmptyTopic,
    #[error("A topic has already been submitted for this debate")]
    TopicAlreadyBound,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Apply `event` to `session`.
///
/// All state changes happen here; I/O is described by the returned effects
/// and carried out by the runtime. On error the session is left untouched.
pub fn transition(
    session: &mut DebateSession,
    context: &DebateContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (session.phase, event) {
        // Frozen: a late topic is refused, every other event is a no-op
        (DebatePhase::Stopped, Event::TopicSubmitted { .. }) => Err(
            TransitionError::InvalidTransition("the debate has stopped".to_string()),
        ),
        (DebatePhase::Stopped, _) => Ok(TransitionResult::new()),

        // ============================================================
        // Topic submission
        // ============================================================
        (DebatePhase::AwaitingTopic, Event::TopicSubmitted { topic }) => {
            let topic = topic.trim();
            if topic.is_empty() {
                return Err(TransitionError::EmptyTopic);
            }
            session.phase = DebatePhase::Running;
            session.topic = Some(topic.to_string());
            session.active = Seat::First;
            session.last_error = None;
            session.consecutive_failures = 0;
            session.retry_pending = false;
            Ok(TransitionResult::new().with_effect(request_next(session, context)))
        }

        (DebatePhase::Running, Event::TopicSubmitted { .. }) => {
            Err(TransitionError::TopicAlreadyBound)
        }

        // ============================================================
        // Stop
        // ============================================================
        (DebatePhase::AwaitingTopic, Event::StopRequested) => {
            session.phase = DebatePhase::Stopped;
            Ok(TransitionResult::new())
        }

        (DebatePhase::Running, Event::StopRequested) => {
            session.phase = DebatePhase::Stopped;
            session.generating = false;
            session.retry_pending = false;
            Ok(TransitionResult::new().with_effect(Effect::AbortGeneration))
        }

        // ============================================================
        // Generation events
        // ============================================================
        (DebatePhase::Running, Event::Increment { text }) => {
            let seat = session.active;
            session
                .transcript
                .append(seat, context.participant(seat), &text);
            Ok(TransitionResult::new())
        }

        (DebatePhase::Running, Event::GenerationComplete { full_text }) => {
            let seat = session.active;
            let outcome = session
                .transcript
                .close(seat, context.participant(seat), &full_text);
            if outcome == CloseOutcome::Continued {
                tracing::info!(
                    participant = %context.participant(seat),
                    "Turn completed after own previous turn, appended as continuation"
                );
            }
            session.generating = false;
            session.retry_pending = false;
            session.last_error = None;
            session.consecutive_failures = 0;
            session.active = seat.other();
            Ok(TransitionResult::new().with_effect(request_next(session, context)))
        }

        (DebatePhase::Running, Event::GenerationFailed { error }) => {
            let seat = session.active;
            if let Some(partial) = session.transcript.discard_open() {
                tracing::debug!(
                    participant = %partial.participant,
                    discarded = partial.content.len(),
                    "Dropped partial turn of failed generation"
                );
            }
            session.generating = false;
            session.consecutive_failures = session.consecutive_failures.saturating_add(1);
            if error.kind != LlmErrorKind::Canceled {
                session.last_error = Some(error);
            }
            session.active = seat.other();

            let cap = context.max_consecutive_failures;
            if cap > 0 && session.consecutive_failures >= cap {
                tracing::warn!(
                    failures = session.consecutive_failures,
                    "Too many consecutive generation failures, stopping debate"
                );
                session.phase = DebatePhase::Stopped;
                session.retry_pending = false;
                return Ok(TransitionResult::new());
            }

            let delay = context.retry_delay_after(session.consecutive_failures);
            if delay.is_zero() {
                session.retry_pending = false;
                Ok(TransitionResult::new().with_effect(request_next(session, context)))
            } else {
                session.retry_pending = true;
                Ok(TransitionResult::new().with_effect(Effect::ScheduleRetry { delay }))
            }
        }

        (DebatePhase::Running, Event::RetryElapsed) => {
            if !session.retry_pending || session.generating {
                return Ok(TransitionResult::new());
            }
            session.retry_pending = false;
            Ok(TransitionResult::new().with_effect(request_next(session, context)))
        }

        // ============================================================
        // Nothing is running before a topic exists
        // ============================================================
        (DebatePhase::AwaitingTopic, event) => Err(TransitionError::InvalidTransition(format!(
            "{} before a topic was submitted",
            event.name()
        ))),
    }
}

/// Mark a generation in flight and describe the request for the active seat.
fn request_next(session: &mut DebateSession, context: &DebateContext) -> Effect {
    let seat = session.active;
    let participant = context.participant(seat);
    let topic = session.topic.as_deref().unwrap_or_default();
    let closed = session.transcript.closed();
    let prompt = prompt::compose(topic, closed, participant, !session.transcript.has_spoken(seat));
    session.generating = true;
    Effect::request_generation(seat, participant, prompt)
}
