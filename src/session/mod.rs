use crate::attachments::{AttachmentQueue, PendingAttachment, encoder};
use crate::conversation::{ConversationStore, Part, TurnId, TurnOutcome};
use crate::core::error::DochatError;
use crate::providers::{ModelProvider, ModelReply};
use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Where one send currently is. A session walks
/// `Idle -> Building -> Sending -> Streaming -> {Completed, Failed}`, with
/// `Cancelled` reachable from `Sending` or `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Building,
    Sending,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

/// How a stream ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Completed,
    Cancelled,
    Error(String),
}

/// Events emitted during a send for decoupled renderer updates.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { turn: TurnId },
    TextChunk { turn: TurnId, text: String },
    Ended { turn: TurnId, status: StreamStatus },
}

/// Cooperative cancellation handle for an in-flight send.
///
/// Cancellation is checked at suspension points, never pre-emptive.
#[derive(Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

type Subscriber = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Orchestrates one send: drains the attachment queue, builds the part list,
/// issues the request, and applies streamed fragments to the conversation.
///
/// One-shot: a session that has left `Idle` never sends again; a new send
/// starts a fresh session. The provider is an explicit per-session
/// dependency so tests can pass fakes.
pub struct StreamingSession {
    provider: Box<dyn ModelProvider>,
    model: String,
    phase: SessionPhase,
    cancel: CancelHandle,
    subscribers: Vec<Subscriber>,
}

impl StreamingSession {
    pub fn new(provider: Box<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            phase: SessionPhase::Idle,
            cancel: CancelHandle::default(),
            subscribers: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Handle that tears this send down at the next suspension point.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Register an observer for session events. Callbacks run inline on the
    /// session's control flow and must not call back into the store.
    pub fn subscribe(&mut self, f: impl Fn(&SessionEvent) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(f));
    }

    fn emit(&self, event: SessionEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }

    /// Run one complete send against `store`.
    ///
    /// Validation and encoding failures return `Err` before any history
    /// mutation. Once the user turn and placeholder exist, every failure path
    /// resolves into turn content and comes back as `Ok(StreamStatus)`.
    pub async fn send(
        &mut self,
        store: &mut ConversationStore,
        queue: &mut AttachmentQueue,
        input: &str,
    ) -> Result<StreamStatus, DochatError> {
        match self.phase {
            SessionPhase::Idle => {}
            SessionPhase::Cancelled => return Err(DochatError::Cancelled),
            phase => {
                return Err(DochatError::Invariant(format!(
                    "send on a session already in phase {:?}",
                    phase
                )));
            }
        }
        self.phase = SessionPhase::Building;

        // Drained exactly once per send attempt, before building; the queue
        // stays empty even when this send fails.
        let drained = queue.drain_for_send();

        let new_parts = match build_new_parts(drained, input) {
            Ok(parts) => parts,
            Err(e) => {
                self.phase = SessionPhase::Idle;
                return Err(e);
            }
        };
        if new_parts.is_empty() {
            self.phase = SessionPhase::Idle;
            return Err(DochatError::Validation(
                "nothing to send: no attachments and no text".to_string(),
            ));
        }
        if store.streaming_turn().is_some() {
            self.phase = SessionPhase::Idle;
            return Err(DochatError::Invariant(
                "another send is already in flight for this conversation".to_string(),
            ));
        }

        let mut request_parts = store.history_parts();
        request_parts.extend(new_parts.iter().cloned());

        store.append_user_turn(new_parts);
        let turn = store.append_assistant_placeholder()?;

        self.phase = SessionPhase::Sending;
        self.emit(SessionEvent::Started { turn });
        debug!(turn = turn.0, parts = request_parts.len(), "submitting request");

        let reply = match self.provider.submit(&request_parts, &self.model).await {
            Ok(reply) => reply,
            Err(e) => return self.fail(store, turn, e),
        };
        if self.cancel.is_cancelled() {
            // Dropping the reply releases the transport resource.
            return self.cancelled(store, turn);
        }

        match reply {
            ModelReply::Complete(text) => {
                store.append_chunk(turn, &text)?;
                self.emit(SessionEvent::TextChunk {
                    turn,
                    text,
                });
                self.complete(store, turn)
            }
            ModelReply::Stream(mut stream) => {
                self.phase = SessionPhase::Streaming;
                // Single consumer, strict receipt order: each fragment is
                // applied as it arrives, never buffered or re-sorted.
                loop {
                    match stream.next().await {
                        Some(Ok(delta)) => {
                            if self.cancel.is_cancelled() {
                                drop(stream);
                                return self.cancelled(store, turn);
                            }
                            store.append_chunk(turn, &delta)?;
                            self.emit(SessionEvent::TextChunk { turn, text: delta });
                        }
                        Some(Err(e)) => {
                            drop(stream);
                            return self.fail(store, turn, e);
                        }
                        None => {
                            drop(stream);
                            return self.complete(store, turn);
                        }
                    }
                }
            }
        }
    }

    fn complete(
        &mut self,
        store: &mut ConversationStore,
        turn: TurnId,
    ) -> Result<StreamStatus, DochatError> {
        store.finalize(turn, TurnOutcome::Success)?;
        self.phase = SessionPhase::Completed;
        debug!(turn = turn.0, "stream completed");
        self.emit(SessionEvent::Ended {
            turn,
            status: StreamStatus::Completed,
        });
        Ok(StreamStatus::Completed)
    }

    fn fail(
        &mut self,
        store: &mut ConversationStore,
        turn: TurnId,
        err: DochatError,
    ) -> Result<StreamStatus, DochatError> {
        warn!(turn = turn.0, error = %err, "send failed");
        store.finalize(turn, TurnOutcome::Failure)?;
        self.phase = SessionPhase::Failed;
        let status = StreamStatus::Error(err.to_string());
        self.emit(SessionEvent::Ended {
            turn,
            status: status.clone(),
        });
        Ok(status)
    }

    fn cancelled(
        &mut self,
        store: &mut ConversationStore,
        turn: TurnId,
    ) -> Result<StreamStatus, DochatError> {
        // Whatever was appended stands; only the streaming flag is cleared.
        store.finalize(turn, TurnOutcome::Success)?;
        self.phase = SessionPhase::Cancelled;
        debug!(turn = turn.0, "stream cancelled");
        self.emit(SessionEvent::Ended {
            turn,
            status: StreamStatus::Cancelled,
        });
        Ok(StreamStatus::Cancelled)
    }
}

/// Encode drained attachments in enqueue order, then the typed text.
///
/// The first encoding failure aborts the whole send; a part list that
/// silently dropped a failed attachment is not allowed.
fn build_new_parts(
    drained: Vec<PendingAttachment>,
    input: &str,
) -> Result<Vec<Part>, DochatError> {
    let mut parts = Vec::with_capacity(drained.len() + 1);
    for attachment in drained {
        parts.push(encoder::encode(attachment)?);
    }
    if !input.trim().is_empty() {
        parts.push(Part::Text(input.to_string()));
    }
    Ok(parts)
}
