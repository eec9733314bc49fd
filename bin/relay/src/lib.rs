//! chat-relay: bridges a chat gateway to a language-model backend.
//!
//! Inbound webhook events are filtered and transcribed, bursts are debounced
//! per conversation, and each settled burst is answered and relayed back
//! with human-like pacing.

pub mod config;
pub mod error;
pub mod inbound;
pub mod pipeline;
pub mod server;
