//! Debate runtime executor

use super::{Command, DebateSnapshot};

use crate::llm::{Generation, GenerationClient, GenerationEvent};
use crate::state_machine::{
    transition, DebateContext, DebateSession, Effect, Event, Seat, TransitionError,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

const EVENT_BUFFER: usize = 8;

/// What woke the control loop
enum Wakeup {
    Command(Command),
    Internal(Event),
    Generation(GenerationEvent),
}

/// Control loop for one debate, generic over the generation backend
pub struct DebateRuntime<C>
where
    C: GenerationClient + 'static,
{
    context: DebateContext,
    session: DebateSession,
    client: C,
    command_rx: mpsc::Receiver<Command>,
    /// Timer events sent by spawned tasks
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::Sender<Event>,
    snapshot_tx: watch::Sender<DebateSnapshot>,
    /// The in-flight generation, if any
    generation: Option<Generation>,
    /// Token to cancel the in-flight generation
    generation_cancel: Option<CancellationToken>,
}

impl<C> DebateRuntime<C>
where
    C: GenerationClient + 'static,
{
    pub fn new(
        context: DebateContext,
        session: DebateSession,
        client: C,
        command_rx: mpsc::Receiver<Command>,
        snapshot_tx: watch::Sender<DebateSnapshot>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        Self {
            context,
            session,
            client,
            command_rx,
            event_rx,
            event_tx,
            snapshot_tx,
            generation: None,
            generation_cancel: None,
        }
    }

    pub async fn run(mut self) -> DebateSession {
        tracing::info!(
            first = %self.context.participants.name(Seat::First),
            second = %self.context.participants.name(Seat::Second),
            "Starting debate runtime"
        );

        loop {
            let wakeup = tokio::select! {
                command = self.command_rx.recv() => match command {
                    Some(command) => Wakeup::Command(command),
                    None => break,
                },
                Some(event) = self.event_rx.recv() => Wakeup::Internal(event),
                Some(event) = next_generation_event(self.generation.as_mut()) => {
                    Wakeup::Generation(event)
                }
            };

            match wakeup {
                Wakeup::Command(command) => self.handle_command(command),
                Wakeup::Internal(event) => {
                    let _ = self.apply(event);
                }
                Wakeup::Generation(event) => self.handle_generation_event(event),
            }
        }

        self.abort_generation();
        tracing::info!(
            phase = self.session.phase.as_str(),
            turns = self.session.transcript.closed().len(),
            "Debate runtime stopped"
        );
        self.session
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit { topic, reply } => {
                let result = self.apply(Event::TopicSubmitted { topic });
                if reply.send(result).is_err() {
                    tracing::debug!("Submitter went away before the reply");
                }
            }
            Command::Stop => {
                if self.session.is_stopped() {
                    tracing::debug!("Stop requested, already stopped");
                } else {
                    tracing::info!("Stop requested");
                    if let Some(turn) = self.session.transcript.open_turn() {
                        tracing::info!(
                            participant = %turn.participant,
                            chars = turn.content.len(),
                            "Keeping partial turn"
                        );
                    }
                }
                let _ = self.apply(Event::StopRequested);
            }
        }
    }

    fn handle_generation_event(&mut self, event: GenerationEvent) {
        let event = match event {
            GenerationEvent::Increment(text) => Event::Increment { text },
            GenerationEvent::Complete(full_text) => {
                self.finish_generation();
                tracing::info!(
                    participant = %self.context.participant(self.session.active),
                    chars = full_text.len(),
                    "Turn completed"
                );
                Event::GenerationComplete { full_text }
            }
            GenerationEvent::Failed(error) => {
                self.finish_generation();
                tracing::warn!(
                    participant = %self.context.participant(self.session.active),
                    kind = ?error.kind,
                    error = %error,
                    "Generation failed"
                );
                Event::GenerationFailed { error }
            }
        };
        let _ = self.apply(event);
    }

    /// Run one transition, execute its effects, publish the result.
    fn apply(&mut self, event: Event) -> Result<(), TransitionError> {
        let name = event.name();
        let result = match transition(&mut self.session, &self.context, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(event = name, error = %e, "Rejected event");
                return Err(e);
            }
        };

        for effect in result.effects {
            self.execute_effect(effect);
        }

        let _ = self
            .snapshot_tx
            .send_replace(DebateSnapshot::capture(&self.session, &self.context));
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestGeneration {
                seat,
                model,
                prompt,
            } => {
                if self.generation.is_some() {
                    tracing::warn!("Generation requested while another is in flight, aborting it");
                    self.abort_generation();
                }
                tracing::info!(
                    participant = %model,
                    seat = ?seat,
                    prompt_chars = prompt.len(),
                    "Requesting generation"
                );
                let cancel = CancellationToken::new();
                self.generation = Some(self.client.generate(cancel.clone(), &model, &prompt));
                self.generation_cancel = Some(cancel);
            }

            Effect::AbortGeneration => {
                tracing::info!("Aborting generation");
                self.abort_generation();
            }

            Effect::ScheduleRetry { delay } => {
                tracing::debug!(delay = ?delay, "Scheduling retry");
                let event_tx = self.event_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = event_tx.send(Event::RetryElapsed).await;
                });
            }
        }
    }

    /// Cancel the in-flight generation and drop its handle, so a late
    /// `Canceled` outcome is never observed.
    fn abort_generation(&mut self) {
        if let Some(token) = self.generation_cancel.take() {
            token.cancel();
        }
        self.generation = None;
    }

    /// Forget a generation that reported its terminal outcome.
    fn finish_generation(&mut self) {
        self.generation = None;
        self.generation_cancel = None;
    }
}

async fn next_generation_event(generation: Option<&mut Generation>) -> Option<GenerationEvent> {
    match generation {
        Some(generation) => generation.next_event().await,
        None => std::future::pending().await,
    }
}
