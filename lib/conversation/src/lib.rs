//! Conversation model for chat-relay.
//!
//! This crate provides:
//!
//! - **Inbound events**: the message shape delivered by the messaging client,
//!   and the filter deciding which events reach the relay core
//! - **Reply splitting**: turning one generated answer into delivery chunks
//! - **Sessions**: bounded per-conversation chat history for stateful backends

pub mod error;
pub mod message;
pub mod reply;
pub mod session;

pub use error::SessionError;
pub use message::{IgnoreReason, InboundEvent, MediaRef, MessageKind, Route, VoiceNote};
pub use reply::split_reply;
pub use session::{ChatMessage, MessageRole, Session, SessionStore};
