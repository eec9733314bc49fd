//! Core domain types and utilities for chat-relay.
//!
//! This crate provides the identifiers and the error-handling foundation
//! shared by the scheduler, AI, conversation and integration crates.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationId, MessageId, ParseIdError, SettleRunId};
