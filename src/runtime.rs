//! Runtime for executing debates
//!
//! A single control task owns the [`DebateSession`] and applies every event
//! to completion. The presentation layer talks to it through a
//! [`DebateHandle`] and observes it through [`DebateSnapshot`]s.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::DebateRuntime;

use crate::llm::{GenerationClient, LlmError};
use crate::state_machine::{
    DebateContext, DebatePhase, DebateSession, Seat, TransitionError, Turn,
};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

/// Requests from the presentation layer
#[derive(Debug)]
pub enum Command {
    Submit {
        topic: String,
        reply: oneshot::Sender<Result<(), TransitionError>>,
    },
    Stop,
}

/// Read-only view of a session, published after every processed event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateSnapshot {
    pub phase: DebatePhase,
    pub topic: Option<String>,
    /// Closed turns in order, followed by the open one if any
    pub turns: Vec<Turn>,
    pub participants: [String; 2],
    pub active_seat: Seat,
    pub active_participant: String,
    pub generating: bool,
    pub last_error: Option<LlmError>,
    pub consecutive_failures: u32,
}

impl DebateSnapshot {
    pub fn capture(session: &DebateSession, context: &DebateContext) -> Self {
        Self {
            phase: session.phase,
            topic: session.topic.clone(),
            turns: session.transcript.turns().cloned().collect(),
            participants: [
                context.participant(Seat::First).to_string(),
                context.participant(Seat::Second).to_string(),
            ],
            active_seat: session.active,
            active_participant: context.participant(session.active).to_string(),
            generating: session.generating,
            last_error: session.last_error.clone(),
            consecutive_failures: session.consecutive_failures,
        }
    }

    pub fn participant(&self, seat: Seat) -> &str {
        &self.participants[seat.index()]
    }

    pub fn closed_turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().filter(|t| !t.is_open())
    }

    pub fn open_turn(&self) -> Option<&Turn> {
        self.turns.last().filter(|t| t.is_open())
    }
}

/// Handle to interact with a running debate
#[derive(Debug, Clone)]
pub struct DebateHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<DebateSnapshot>,
}

impl DebateHandle {
    /// Bind the topic and start the debate.
    ///
    /// Validation happens in the control task; its verdict is returned here.
    /// A stopped debate refuses new topics with
    /// [`TransitionError::InvalidTransition`].
    pub async fn submit(&self, topic: impl Into<String>) -> Result<(), TransitionError> {
        let (reply, verdict) = oneshot::channel();
        let command = Command::Submit {
            topic: topic.into(),
            reply,
        };
        if self.commands.send(command).await.is_err() {
            return Err(shut_down());
        }
        verdict.await.unwrap_or_else(|_| Err(shut_down()))
    }

    /// Request a stop. Stopping twice is the same as stopping once.
    pub async fn stop(&self) {
        if self.commands.send(Command::Stop).await.is_err() {
            tracing::debug!("Stop requested after the debate runtime exited");
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> DebateSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the next snapshot. `None` once the runtime has exited.
    pub async fn changed(&mut self) -> Option<DebateSnapshot> {
        self.snapshots.changed().await.ok()?;
        Some(self.snapshots.borrow_and_update().clone())
    }
}

fn shut_down() -> TransitionError {
    TransitionError::InvalidTransition("debate runtime has shut down".to_string())
}

/// Start a debate on a background task.
///
/// The task runs until every [`DebateHandle`] is dropped and returns the
/// final session.
pub fn spawn<C>(client: C, context: DebateContext) -> (DebateHandle, JoinHandle<DebateSession>)
where
    C: GenerationClient + 'static,
{
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
    let session = DebateSession::new();
    let (snapshot_tx, snapshot_rx) = watch::channel(DebateSnapshot::capture(&session, &context));

    let runtime = DebateRuntime::new(context, session, client, command_rx, snapshot_tx);
    let task = tokio::spawn(runtime.run());

    (
        DebateHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        },
        task,
    )
}
