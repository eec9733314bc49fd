//! Outside-world adapters for chat-relay.
//!
//! This crate provides:
//!
//! - **Messaging client**: the gateway contract and its HTTP adapter
//! - **Transcriber**: voice notes to text through a speech-to-text service
//! - **Paced delivery**: sending reply chunks with typing pauses

pub mod delivery;
pub mod error;
pub mod messaging;
pub mod transcribe;

pub use delivery::{PacedDelivery, PacingConfig};
pub use error::{DeliveryError, MessagingError, TranscriptionError};
pub use messaging::{HttpGateway, MessagingClient};
pub use transcribe::{
    SpeechToText, TRANSCRIPTION_APOLOGY, Transcriber, WhisperApi, WhisperConfig,
};
