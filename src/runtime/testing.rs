//! Mock implementations for testing
//!
//! These mocks enable runtime integration testing without a live backend.

use crate::llm::{Generation, GenerationClient, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Mock Generation Client
// ============================================================================

/// How one scripted generation plays out
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream the increments, then complete with their concatenation
    Reply(Vec<String>),
    /// Stream the increments, then complete with a different final text
    ReplyWith {
        increments: Vec<String>,
        full_text: String,
    },
    /// Stream the increments, then fail
    Fail {
        increments: Vec<String>,
        error: LlmError,
    },
    /// Stream the increments, then wait until canceled
    Hang(Vec<String>),
}

impl Script {
    pub fn reply(parts: &[&str]) -> Self {
        Script::Reply(parts.iter().map(ToString::to_string).collect())
    }

    pub fn fail(error: LlmError) -> Self {
        Script::Fail {
            increments: vec![],
            error,
        }
    }

    pub fn hang(parts: &[&str]) -> Self {
        Script::Hang(parts.iter().map(ToString::to_string).collect())
    }
}

/// A generation the runtime asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub model: String,
    pub prompt: String,
}

/// Mock client that plays queued scripts in request order.
///
/// Once the queue is empty every generation hangs until canceled.
pub struct MockGenerationClient {
    scripts: Mutex<VecDeque<Script>>,
    models: Vec<String>,
    /// Record of all requests made
    pub requests: Mutex<Vec<RecordedRequest>>,
    cancels: Mutex<Vec<CancellationToken>>,
}

impl MockGenerationClient {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            models: vec![],
            requests: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
        }
    }

    /// Models reported by `list_models`
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.models = models.iter().map(ToString::to_string).collect();
        self
    }

    pub fn queue(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }

    pub fn recorded_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether the `index`-th generation was canceled
    pub fn was_canceled(&self, index: usize) -> bool {
        self.cancels
            .lock()
            .unwrap()
            .get(index)
            .is_some_and(CancellationToken::is_cancelled)
    }
}

impl Default for MockGenerationClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationClient for MockGenerationClient {
    fn generate(&self, cancel: CancellationToken, model: &str, prompt: &str) -> Generation {
        self.requests.lock().unwrap().push(RecordedRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
        });
        self.cancels.lock().unwrap().push(cancel.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Script::Hang(vec![]));

        let (sink, generation) = Generation::channel(4);
        tokio::spawn(async move {
            let result = play(script, &sink.increments, &cancel).await;
            sink.finish(result);
        });
        generation
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        Ok(self.models.clone())
    }
}

async fn play(
    script: Script,
    increments: &mpsc::Sender<String>,
    cancel: &CancellationToken,
) -> Result<String, LlmError> {
    let (parts, terminal) = match script {
        Script::Reply(parts) => {
            let full_text = parts.concat();
            (parts, Ok(full_text))
        }
        Script::ReplyWith {
            increments,
            full_text,
        } => (increments, Ok(full_text)),
        Script::Fail { increments, error } => (increments, Err(error)),
        Script::Hang(parts) => (parts, Err(LlmError::canceled())),
    };
    let hangs = matches!(&terminal, Err(e) if e.is_canceled());

    for part in parts {
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(LlmError::canceled()),
            sent = increments.send(part) => {
                if sent.is_err() {
                    return Err(LlmError::canceled());
                }
            }
        }
    }

    if hangs {
        cancel.cancelled().await;
    }
    terminal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;
    use crate::runtime::{self, DebateHandle, DebateSnapshot};
    use crate::state_machine::{DebateContext, DebatePhase, Participants, Seat, TransitionError};
    use std::sync::Arc;
    use std::time::Duration;

    const TOPIC: &str = "Is remote work better than office work?";

    fn context() -> DebateContext {
        DebateContext::new(Participants::new("A", "B")).with_retry_delay(Duration::ZERO)
    }

    fn start(mock: &Arc<MockGenerationClient>, ctx: DebateContext) -> DebateHandle {
        let (handle, _task) = runtime::spawn(Arc::clone(mock), ctx);
        handle
    }

    async fn wait_until(
        handle: &DebateHandle,
        mut predicate: impl FnMut(&DebateSnapshot) -> bool,
    ) -> DebateSnapshot {
        let mut handle = handle.clone();
        let wait = async move {
            let mut snapshot = handle.snapshot();
            while !predicate(&snapshot) {
                snapshot = handle.changed().await.expect("runtime exited");
            }
            snapshot
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("timed out waiting for snapshot")
    }

    #[tokio::test]
    async fn test_mock_plays_scripts_in_order() {
        let mock = MockGenerationClient::new();
        mock.queue(Script::reply(&["Hel", "lo"]));
        mock.queue(Script::fail(LlmError::status(500)));

        let mut first = mock.generate(CancellationToken::new(), "a", "p1");
        let mut events = vec![];
        while let Some(event) = first.next_event().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);

        let mut second = mock.generate(CancellationToken::new(), "b", "p2");
        match second.next_event().await {
            Some(crate::llm::GenerationEvent::Failed(e)) => assert_eq!(e.kind, LlmErrorKind::Status),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_alternating_turns_carry_context() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::reply(&["Remote", " work", " wins."]));
        mock.queue(Script::reply(&["Offices ", "build trust."]));
        let handle = start(&mock, context());

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.closed_turns().count() == 2).await;

        assert_eq!(snapshot.phase, DebatePhase::Running);
        assert_eq!(snapshot.topic.as_deref(), Some(TOPIC));
        let turns: Vec<_> = snapshot.closed_turns().collect();
        assert_eq!(turns[0].participant, "A");
        assert_eq!(turns[0].content, "Remote work wins.");
        assert_eq!(turns[1].participant, "B");
        assert_eq!(turns[1].content, "Offices build trust.");
        assert_eq!(snapshot.active_seat, Seat::First);
        assert!(snapshot.generating);

        // Third request is hanging on the empty queue
        let requests = mock.recorded_requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(
            requests.iter().map(|r| r.model.as_str()).collect::<Vec<_>>(),
            vec!["A", "B", "A"]
        );
        assert!(requests[0].prompt.contains(TOPIC));
        assert!(requests[1].prompt.contains("[A]: Remote work wins."));
        assert!(requests[1].prompt.contains("opposing or alternative perspective"));
        assert!(requests[2]
            .prompt
            .contains("[A]: Remote work wins.\n\n[B]: Offices build trust."));
    }

    #[tokio::test]
    async fn test_final_text_replaces_streamed_text() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::ReplyWith {
            increments: vec!["Remote".into(), " wor".into()],
            full_text: "Remote work wins.".into(),
        });
        let handle = start(&mock, context());

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.closed_turns().count() == 1).await;
        assert_eq!(snapshot.turns[0].content, "Remote work wins.");
    }

    #[tokio::test]
    async fn test_blank_topic_rejected_at_boundary() {
        let mock = Arc::new(MockGenerationClient::new());
        let handle = start(&mock, context());

        let err = handle.submit("   \t ").await.unwrap_err();
        assert_eq!(err, TransitionError::EmptyTopic);

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.phase, DebatePhase::AwaitingTopic);
        assert!(snapshot.turns.is_empty());
        assert!(mock.recorded_requests().is_empty());

        // A valid topic afterwards still starts the debate
        handle.submit(TOPIC).await.unwrap();
        let err = handle.submit("Another topic").await.unwrap_err();
        assert_eq!(err, TransitionError::TopicAlreadyBound);
    }

    #[tokio::test]
    async fn test_failure_hands_turn_to_other_participant() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::Fail {
            increments: vec!["Half an arg".into()],
            error: LlmError::disconnected("connection reset"),
        });
        let handle = start(&mock, context());

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.last_error.is_some() && s.generating).await;

        assert!(snapshot.turns.is_empty());
        assert_eq!(snapshot.active_seat, Seat::Second);
        assert_eq!(snapshot.active_participant, "B");
        assert_eq!(snapshot.consecutive_failures, 1);
        assert_eq!(
            snapshot.last_error.as_ref().map(|e| e.kind),
            Some(LlmErrorKind::Disconnected)
        );
        assert_eq!(mock.recorded_requests()[1].model, "B");
        // B has not spoken and nobody has: B opens
        assert!(mock.recorded_requests()[1].prompt.contains("opening argument"));
    }

    #[tokio::test]
    async fn test_completion_clears_error() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::fail(LlmError::status(503)));
        mock.queue(Script::reply(&["B opens."]));
        let handle = start(&mock, context());

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.closed_turns().count() == 1).await;
        assert_eq!(snapshot.turns[0].participant, "B");
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_stop_cancels_generation_and_keeps_partial() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::hang(&["Remote"]));
        let handle = start(&mock, context());

        handle.submit(TOPIC).await.unwrap();
        wait_until(&handle, |s| s.open_turn().is_some()).await;

        handle.stop().await;
        let snapshot = wait_until(&handle, |s| s.phase == DebatePhase::Stopped).await;

        assert!(mock.was_canceled(0));
        assert!(!snapshot.generating);
        assert!(snapshot.last_error.is_none());
        assert_eq!(snapshot.open_turn().map(|t| t.content.as_str()), Some("Remote"));

        // Stopping again changes nothing
        handle.stop().await;
        let submit = handle.submit("New topic").await;
        assert!(
            matches!(submit, Err(TransitionError::InvalidTransition(ref m)) if m.contains("stopped"))
        );
        let after = handle.snapshot();
        assert_eq!(after, snapshot);
        assert_eq!(mock.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_before_topic() {
        let mock = Arc::new(MockGenerationClient::new());
        let handle = start(&mock, context());

        handle.stop().await;
        let snapshot = wait_until(&handle, |s| s.phase == DebatePhase::Stopped).await;
        assert!(snapshot.topic.is_none());
        assert!(mock.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_failure_cap_stops_debate() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::fail(LlmError::connect("refused")));
        mock.queue(Script::fail(LlmError::connect("refused")));
        let handle = start(&mock, context().with_max_consecutive_failures(2));

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.phase == DebatePhase::Stopped).await;
        assert_eq!(snapshot.consecutive_failures, 2);
        assert!(snapshot.last_error.is_some());
        assert_eq!(mock.recorded_requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_delay() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::fail(LlmError::status(500)));
        mock.queue(Script::reply(&["Recovered."]));
        let handle = start(
            &mock,
            context().with_retry_delay(Duration::from_millis(250)),
        );

        handle.submit(TOPIC).await.unwrap();
        let snapshot = wait_until(&handle, |s| s.last_error.is_some()).await;
        assert!(!snapshot.generating);
        assert_eq!(mock.recorded_requests().len(), 1);

        let snapshot = wait_until(&handle, |s| s.closed_turns().count() == 1).await;
        assert_eq!(snapshot.turns[0].participant, "B");
        assert_eq!(mock.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_runtime_exits_when_handle_dropped() {
        let mock = Arc::new(MockGenerationClient::new());
        mock.queue(Script::hang(&[]));
        let (handle, task) = runtime::spawn(Arc::clone(&mock), context());

        handle.submit(TOPIC).await.unwrap();
        wait_until(&handle, |s| s.generating).await;
        drop(handle);

        let session = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("runtime did not exit")
            .unwrap();
        assert_eq!(session.topic.as_deref(), Some(TOPIC));
        assert!(mock.was_canceled(0));
    }
}
