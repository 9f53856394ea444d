//! Debate session state types

use crate::llm::LlmError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Participants
// ============================================================================

/// Which of the two configured participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    #[default]
    First,
    Second,
}

impl Seat {
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Seat::First => 0,
            Seat::Second => 1,
        }
    }
}

/// The two configured model names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participants {
    first: String,
    second: String,
}

impl Participants {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn name(&self, seat: Seat) -> &str {
        match seat {
            Seat::First => &self.first,
            Seat::Second => &self.second,
        }
    }
}

// ============================================================================
// Turns and Transcript
// ============================================================================

/// One participant's contribution. Open while streaming, closed once
/// `completed_at` is stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub seat: Seat,
    pub participant: String,
    pub content: String,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Turn {
    pub fn open(seat: Seat, participant: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            seat,
            participant: participant.into(),
            content: content.into(),
            completed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    /// Stamp the completion time. Only the first call has an effect.
    pub fn close(&mut self) {
        if self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }
}

/// How a completed generation landed in the transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Appended as a new closed turn
    Appended,
    /// Same seat spoke last (the other side's attempt failed in between);
    /// folded into that turn as a continuation paragraph
    Continued,
}

/// Closed turns in order, plus at most one open turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    closed: Vec<Turn>,
    open: Option<Turn>,
}

impl Transcript {
    pub fn closed(&self) -> &[Turn] {
        &self.closed
    }

    pub fn open_turn(&self) -> Option<&Turn> {
        self.open.as_ref()
    }

    /// Closed turns followed by the open one, if any
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.closed.iter().chain(self.open.iter())
    }

    /// Whether `seat` has at least one closed turn
    pub fn has_spoken(&self, seat: Seat) -> bool {
        self.closed.iter().any(|t| t.seat == seat)
    }

    /// Append streamed text for `seat`, opening a turn if needed.
    ///
    /// An open turn belonging to the other seat cannot be extended; it is
    /// replaced so that a single turn stays open.
    pub fn append(&mut self, seat: Seat, participant: &str, text: &str) {
        match &mut self.open {
            Some(turn) if turn.seat == seat => turn.content.push_str(text),
            slot => {
                if let Some(stale) = slot.as_ref() {
                    tracing::warn!(
                        participant = %stale.participant,
                        "Replacing open turn that belongs to the other participant"
                    );
                }
                *slot = Some(Turn::open(seat, participant, text));
            }
        }
    }

    /// Close the open turn for `seat` with the authoritative `final_text`.
    ///
    /// Streamed content that disagrees with `final_text` is overwritten. With
    /// no open turn, one is created from `final_text`.
    ///
    /// If `seat` also owns the last closed turn, the text is appended to that
    /// turn as a new paragraph. This is the only place a closed turn changes;
    /// its `completed_at` keeps the original stamp.
    pub fn close(&mut self, seat: Seat, participant: &str, final_text: &str) -> CloseOutcome {
        let mut turn = match self.open.take() {
            Some(turn) if turn.seat == seat => turn,
            _ => Turn::open(seat, participant, ""),
        };
        if turn.content != final_text {
            if !turn.content.is_empty() {
                tracing::debug!(
                    streamed = turn.content.len(),
                    final_len = final_text.len(),
                    "Streamed text disagrees with final text, keeping final text"
                );
            }
            turn.content = final_text.to_string();
        }

        match self.closed.last_mut() {
            Some(last) if last.seat == seat => {
                if !turn.content.is_empty() {
                    if !last.content.is_empty() {
                        last.content.push_str("\n\n");
                    }
                    last.content.push_str(&turn.content);
                }
                CloseOutcome::Continued
            }
            _ => {
                turn.close();
                self.closed.push(turn);
                CloseOutcome::Appended
            }
        }
    }

    /// Drop the open turn (a failed attempt is attributed to no turn).
    pub fn discard_open(&mut self) -> Option<Turn> {
        self.open.take()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Lifecycle phase of a debate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Waiting for the user to submit a topic
    #[default]
    AwaitingTopic,
    /// Participants are taking turns
    Running,
    /// Frozen; read-only from here on
    Stopped,
}

impl DebatePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            DebatePhase::AwaitingTopic => "awaiting_topic",
            DebatePhase::Running => "running",
            DebatePhase::Stopped => "stopped",
        }
    }
}

/// Mutable state of one debate, owned by the runtime's control loop
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DebateSession {
    pub phase: DebatePhase,
    pub topic: Option<String>,
    pub transcript: Transcript,
    pub active: Seat,
    /// A generation is in flight
    pub generating: bool,
    /// A failure armed the retry timer and no generation has started since
    pub retry_pending: bool,
    /// Shown next to the transcript; cleared by the next completed turn
    pub last_error: Option<LlmError>,
    pub consecutive_failures: u32,
}

impl DebateSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == DebatePhase::Stopped
    }
}

/// Static configuration consulted by transitions
#[derive(Debug, Clone)]
pub struct DebateContext {
    pub participants: Participants,
    /// Stop after this many failures in a row; 0 never stops
    pub max_consecutive_failures: u32,
    /// Base delay before retrying after a failure; zero retries immediately
    pub retry_delay: Duration,
}

/// Upper bound for the failure backoff
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

impl DebateContext {
    pub fn new(participants: Participants) -> Self {
        Self {
            participants,
            max_consecutive_failures: 5,
            retry_delay: Duration::from_secs(1),
        }
    }

    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn participant(&self, seat: Seat) -> &str {
        self.participants.name(seat)
    }

    /// Backoff after the `failures`-th consecutive failure
    pub fn retry_delay_after(&self, failures: u32) -> Duration {
        if self.retry_delay.is_zero() || failures == 0 {
            return Duration::ZERO;
        }
        let factor = 1u32 << (failures - 1).min(16);
        self.retry_delay.saturating_mul(factor).min(MAX_RETRY_DELAY)
    }
}
