//! Per-conversation chat sessions.
//!
//! Sessions hold the recent exchange history for one conversation so that a
//! stateful backend can send it along with each new prompt. They live in
//! memory only and are bounded to a fixed number of messages.

use crate::error::SessionError;
use chat_relay_core::ConversationId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// The role of a message author within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The peer on the other end of the conversation.
    User,
    /// The relay's generated answers.
    Assistant,
}

/// A message in a session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: MessageRole,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// A named session, keyed by the conversation it belongs to.
#[derive(Debug, Clone)]
pub struct Session {
    /// Conversation that owns the session.
    pub conversation: ConversationId,
    /// Recent messages, oldest first.
    pub messages: VecDeque<ChatMessage>,
}

impl Session {
    /// Creates an empty session.
    #[must_use]
    pub fn new(conversation: ConversationId) -> Self {
        Self {
            conversation,
            messages: VecDeque::new(),
        }
    }

    /// Appends a message, evicting the oldest ones beyond `limit`.
    pub fn push(&mut self, message: ChatMessage, limit: usize) {
        self.messages.push_back(message);
        while self.messages.len() > limit {
            self.messages.pop_front();
        }
    }
}

/// In-memory session storage.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<ConversationId, Session>>,
    history_limit: usize,
}

impl SessionStore {
    /// Creates a store that keeps at most `history_limit` messages per session.
    #[must_use]
    pub fn new(history_limit: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            history_limit,
        }
    }

    /// Creates the session for `conversation` if it does not exist yet.
    ///
    /// Returns true if a new session was created.
    pub fn ensure(&self, conversation: &ConversationId) -> Result<bool, SessionError> {
        let mut sessions = self.sessions.lock().map_err(|_| SessionError::Poisoned)?;
        if sessions.contains_key(conversation) {
            return Ok(false);
        }
        sessions.insert(conversation.clone(), Session::new(conversation.clone()));
        tracing::debug!(conversation = %conversation, "created chat session");
        Ok(true)
    }

    /// Returns a copy of the session history, oldest first.
    pub fn history(&self, conversation: &ConversationId) -> Result<Vec<ChatMessage>, SessionError> {
        let sessions = self.sessions.lock().map_err(|_| SessionError::Poisoned)?;
        sessions
            .get(conversation)
            .map(|session| session.messages.iter().cloned().collect())
            .ok_or_else(|| SessionError::NotFound {
                conversation: conversation.clone(),
            })
    }

    /// Records a completed prompt/answer exchange.
    pub fn record_exchange(
        &self,
        conversation: &ConversationId,
        prompt: &str,
        answer: &str,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.lock().map_err(|_| SessionError::Poisoned)?;
        let session = sessions
            .get_mut(conversation)
            .ok_or_else(|| SessionError::NotFound {
                conversation: conversation.clone(),
            })?;
        session.push(ChatMessage::user(prompt), self.history_limit);
        session.push(ChatMessage::assistant(answer), self.history_limit);
        Ok(())
    }

    /// Returns the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    /// Returns true if no session exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_creates_once() {
        let store = SessionStore::new(10);
        let id = ConversationId::new("1555@c.us");

        assert!(store.ensure(&id).unwrap());
        assert!(!store.ensure(&id).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn history_of_unknown_session_fails() {
        let store = SessionStore::new(10);
        let err = store.history(&ConversationId::new("nobody")).unwrap_err();
        assert!(matches!(err, SessionError::NotFound { .. }));
    }

    #[test]
    fn exchanges_are_recorded_in_order() {
        let store = SessionStore::new(10);
        let id = ConversationId::new("1555@c.us");
        store.ensure(&id).unwrap();

        store.record_exchange(&id, "hi", "hello!").unwrap();

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, MessageRole::User);
        assert_eq!(history[0].content, "hi");
        assert_eq!(history[1].role, MessageRole::Assistant);
        assert_eq!(history[1].content, "hello!");
    }

    #[test]
    fn history_is_bounded() {
        let store = SessionStore::new(4);
        let id = ConversationId::new("1555@c.us");
        store.ensure(&id).unwrap();

        for i in 0..5 {
            store
                .record_exchange(&id, &format!("q{i}"), &format!("a{i}"))
                .unwrap();
        }

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q3");
        assert_eq!(history[3].content, "a4");
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new(10);
        let a = ConversationId::new("a@c.us");
        let b = ConversationId::new("b@c.us");
        store.ensure(&a).unwrap();
        store.ensure(&b).unwrap();

        store.record_exchange(&a, "only a", "ok").unwrap();

        assert_eq!(store.history(&a).unwrap().len(), 2);
        assert!(store.history(&b).unwrap().is_empty());
    }
}
