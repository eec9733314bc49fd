//! Answer generation for chat-relay.
//!
//! This crate provides:
//!
//! - **Backends**: an OpenAI backend with per-conversation sessions and a
//!   stateless Gemini backend, behind the [`AnswerBackend`] trait
//! - **Generator**: the backend selected at startup
//! - **Retry**: the bounded retry combinator and empty-answer fallback

pub mod backend;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod openai;
pub mod retry;

pub use backend::{AnswerBackend, BackendKind, DEFAULT_SYSTEM_PROMPT};
pub use error::GenerationError;
pub use gemini::{GeminiBackend, GeminiConfig};
pub use generator::AnswerGenerator;
pub use openai::{OpenAiConfig, OpenAiSessionBackend};
pub use retry::{FALLBACK_ANSWER, MAX_ATTEMPTS, generate_with_retry, or_fallback, with_retry};
