use crate::core::error::DochatError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fixed text shown in place of a response when a send fails mid-flight.
pub const FAILURE_MESSAGE: &str =
    "Sorry, there was an error processing your message. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Inline payload of an attachment part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineData {
    Base64(String),
    PlainText(String),
}

/// One unit of content within a turn. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Part {
    Text(String),
    Attachment {
        media_type: String,
        data: InlineData,
    },
}

/// Position of a turn within its conversation. Monotonically increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Success,
    Failure,
}

/// One message (user or assistant) in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: TurnId,
    pub role: Role,
    pub content: Vec<Part>,
    pub streaming: bool,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(id: TurnId, role: Role, content: Vec<Part>, streaming: bool) -> Self {
        Self {
            id,
            role,
            content,
            streaming,
            created_at: Utc::now(),
        }
    }

    /// Concatenated text of all text-bearing parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::Attachment {
                    data: InlineData::PlainText(t),
                    ..
                } => Some(t.as_str()),
                Part::Attachment { .. } => None,
            })
            .collect()
    }
}

/// Ordered, mutable history of turns; the only owner of turn content.
///
/// Turns are append-only, except that the single turn with `streaming == true`
/// has its content mutated in place by fragment application. At most one turn
/// is streaming at any time.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Vec<Turn>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation about a specific document, seeded with the
    /// assistant greeting that names the file.
    pub fn for_document(file_name: &str) -> Self {
        let mut store = Self::new();
        let greeting = format!(
            "Hello! I'm here to help you with the file \"{}\". What would you like to know about it?",
            file_name
        );
        let id = TurnId(0);
        store
            .turns
            .push(Turn::new(id, Role::Assistant, vec![Part::Text(greeting)], false));
        store
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.get(id.0)
    }

    /// The unique streaming turn, if a send is in flight.
    pub fn streaming_turn(&self) -> Option<&Turn> {
        self.turns.iter().find(|t| t.streaming)
    }

    /// All parts of all turns in chronological order, for request assembly.
    pub fn history_parts(&self) -> Vec<Part> {
        self.turns
            .iter()
            .flat_map(|t| t.content.iter().cloned())
            .collect()
    }

    pub fn append_user_turn(&mut self, parts: Vec<Part>) -> TurnId {
        let id = TurnId(self.turns.len());
        self.turns.push(Turn::new(id, Role::User, parts, false));
        id
    }

    /// Append the empty assistant turn that fragments will be applied to.
    ///
    /// Must be called once per send, right after `append_user_turn` and
    /// before any network activity, so a renderer can show a pending state
    /// even if the request later fails. Refuses to create a second streaming
    /// turn, which is what rejects a submit while another is in flight.
    pub fn append_assistant_placeholder(&mut self) -> Result<TurnId, DochatError> {
        if let Some(active) = self.streaming_turn() {
            return Err(DochatError::Invariant(format!(
                "turn {} is still streaming",
                active.id.0
            )));
        }
        let id = TurnId(self.turns.len());
        self.turns
            .push(Turn::new(id, Role::Assistant, Vec::new(), true));
        debug!(turn = id.0, "appended assistant placeholder");
        Ok(id)
    }

    /// Apply one streamed fragment to the streaming turn identified by `id`.
    ///
    /// Calling this with a stale or non-streaming id is a programming error.
    pub fn append_chunk(&mut self, id: TurnId, delta: &str) -> Result<(), DochatError> {
        let turn = self
            .turns
            .get_mut(id.0)
            .filter(|t| t.streaming)
            .ok_or_else(|| {
                debug_assert!(false, "append_chunk on non-streaming turn {}", id.0);
                DochatError::Invariant(format!("turn {} is not streaming", id.0))
            })?;

        match turn.content.last_mut() {
            Some(Part::Text(text)) => text.push_str(delta),
            _ => turn.content.push(Part::Text(delta.to_string())),
        }
        Ok(())
    }

    /// Close out the streaming turn.
    ///
    /// On `Success` the content already accumulated stands and only the
    /// streaming flag is cleared. On `Failure` the accumulated content is
    /// replaced by [`FAILURE_MESSAGE`].
    pub fn finalize(&mut self, id: TurnId, outcome: TurnOutcome) -> Result<(), DochatError> {
        let turn = self
            .turns
            .get_mut(id.0)
            .filter(|t| t.streaming)
            .ok_or_else(|| {
                debug_assert!(false, "finalize on non-streaming turn {}", id.0);
                DochatError::Invariant(format!("turn {} is not streaming", id.0))
            })?;

        turn.streaming = false;
        if outcome == TurnOutcome::Failure {
            warn!(turn = id.0, "finalizing turn with failure message");
            turn.content = vec![Part::Text(FAILURE_MESSAGE.to_string())];
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_then_placeholder_grows_by_two() {
        let mut store = ConversationStore::new();
        store.append_user_turn(vec![Part::Text("hi".into())]);
        store.append_assistant_placeholder().unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.turns()[0].role, Role::User);
        assert_eq!(store.turns()[1].role, Role::Assistant);
        assert!(store.turns()[1].streaming);
        assert!(store.turns()[1].content.is_empty());
    }

    #[test]
    fn chunks_apply_in_receipt_order() {
        let mut store = ConversationStore::new();
        store.append_user_turn(vec![Part::Text("hi".into())]);
        let id = store.append_assistant_placeholder().unwrap();
        store.append_chunk(id, "Hel").unwrap();
        store.append_chunk(id, "lo").unwrap();
        assert_eq!(store.turn(id).unwrap().text(), "Hello");
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn chunk_on_stale_turn_is_an_invariant_violation() {
        let mut store = ConversationStore::new();
        let user = store.append_user_turn(vec![Part::Text("hi".into())]);
        let id = store.append_assistant_placeholder().unwrap();
        store.finalize(id, TurnOutcome::Success).unwrap();

        assert!(matches!(
            store.append_chunk(user, "x"),
            Err(DochatError::Invariant(_))
        ));
        assert!(matches!(
            store.append_chunk(id, "x"),
            Err(DochatError::Invariant(_))
        ));
    }

    #[test]
    #[should_panic]
    #[cfg(debug_assertions)]
    fn chunk_on_stale_turn_panics_in_dev_builds() {
        let mut store = ConversationStore::new();
        let user = store.append_user_turn(vec![Part::Text("hi".into())]);
        let _ = store.append_chunk(user, "x");
    }

    #[test]
    fn second_placeholder_while_streaming_is_rejected() {
        let mut store = ConversationStore::new();
        store.append_user_turn(vec![Part::Text("hi".into())]);
        store.append_assistant_placeholder().unwrap();
        assert!(matches!(
            store.append_assistant_placeholder(),
            Err(DochatError::Invariant(_))
        ));
    }

    #[test]
    fn failure_replaces_accumulated_content() {
        let mut store = ConversationStore::new();
        store.append_user_turn(vec![Part::Text("hi".into())]);
        let id = store.append_assistant_placeholder().unwrap();
        store.append_chunk(id, "partial answ").unwrap();
        store.finalize(id, TurnOutcome::Failure).unwrap();

        let turn = store.turn(id).unwrap();
        assert!(!turn.streaming);
        assert_eq!(turn.content, vec![Part::Text(FAILURE_MESSAGE.to_string())]);
        // the preceding user turn is untouched
        assert_eq!(store.turns()[0].text(), "hi");
    }

    #[test]
    fn history_parts_preserves_chronological_order() {
        let mut store = ConversationStore::new();
        store.append_user_turn(vec![Part::Text("q1".into())]);
        let id = store.append_assistant_placeholder().unwrap();
        store.append_chunk(id, "a1").unwrap();
        store.finalize(id, TurnOutcome::Success).unwrap();
        store.append_user_turn(vec![Part::Text("q2".into())]);

        assert_eq!(
            store.history_parts(),
            vec![
                Part::Text("q1".into()),
                Part::Text("a1".into()),
                Part::Text("q2".into()),
            ]
        );
    }

    #[test]
    fn document_conversation_starts_with_greeting() {
        let store = ConversationStore::for_document("report.pdf");
        assert_eq!(store.len(), 1);
        let turn = &store.turns()[0];
        assert_eq!(turn.role, Role::Assistant);
        assert!(!turn.streaming);
        assert!(turn.text().contains("report.pdf"));
    }
}
