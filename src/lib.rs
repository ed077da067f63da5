//! Multi-modal streaming chat about attached documents.
//!
//! The core of this crate is one send: drain the attachment queue, encode
//! each attachment into a model-acceptable part, append the user turn and an
//! assistant placeholder to the conversation, submit history plus new content
//! to the model provider, and apply streamed fragments to the placeholder in
//! receipt order until completion, failure, or cancellation.

pub mod attachments;
pub mod config;
pub mod conversation;
pub mod core;
pub mod providers;
pub mod session;
pub mod storage;

pub use attachments::{AttachmentQueue, PendingAttachment, load_attachment};
pub use config::Config;
pub use conversation::{ConversationStore, InlineData, Part, Role, Turn, TurnId, TurnOutcome};
pub use crate::core::error::DochatError;
pub use providers::{ModelProvider, ModelReply};
pub use session::{CancelHandle, SessionEvent, SessionPhase, StreamStatus, StreamingSession};
pub use storage::{DocumentEntry, DocumentRepository, Preview, PreviewResolver};
