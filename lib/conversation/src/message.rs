//! Inbound message events.
//!
//! The messaging client delivers every chat event it sees. Only direct text
//! and voice messages from other people are relayed; everything else is
//! classified as ignored before it reaches the debounce scheduler.

use chat_relay_core::{ConversationId, MessageId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of content carried by an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text.
    Text,
    /// Voice note (push-to-talk audio).
    Voice,
    /// Anything else (images, stickers, reactions, ...).
    #[serde(other)]
    Other,
}

/// Reference to media stored by the messaging client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Client-side media identifier used for download.
    pub id: String,
    /// MIME type reported by the client, e.g. `audio/ogg; codecs=opus`.
    pub mime_type: String,
}

impl MediaRef {
    /// Returns the file extension matching the MIME type.
    ///
    /// Parameters such as `; codecs=opus` are ignored. Unknown audio types
    /// fall back to `ogg`, the format chat clients use for voice notes.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        let essence = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => "mp3",
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" | "audio/aac" => "m4a",
            "audio/wav" | "audio/x-wav" | "audio/wave" => "wav",
            "audio/webm" => "webm",
            "audio/flac" => "flac",
            _ => "ogg",
        }
    }
}

/// An event delivered by the messaging client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Client-assigned message id.
    pub message_id: MessageId,
    /// Conversation the message belongs to.
    pub conversation_id: ConversationId,
    /// Address of the sender.
    pub sender: String,
    /// Content kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text body, for text messages.
    #[serde(default)]
    pub body: Option<String>,
    /// Media reference, for voice messages.
    #[serde(default)]
    pub media: Option<MediaRef>,
    /// Whether the message was posted in a group.
    #[serde(default)]
    pub is_group: bool,
    /// Whether the message was sent by the relay's own account.
    #[serde(default)]
    pub is_self: bool,
}

/// A voice note that needs transcription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceNote {
    /// Message that carried the note.
    pub message_id: MessageId,
    /// Where to download the audio from.
    pub media: MediaRef,
}

/// Why an inbound event was not relayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sent by the relay's own account.
    FromSelf,
    /// Posted in a group conversation.
    Group,
    /// Broadcast list or status update.
    Broadcast,
    /// Text message with a blank body.
    EmptyText,
    /// Voice message without a media reference.
    MissingMedia,
    /// Unsupported content kind.
    Unsupported,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::FromSelf => "sent by self",
            Self::Group => "group conversation",
            Self::Broadcast => "broadcast conversation",
            Self::EmptyText => "empty text body",
            Self::MissingMedia => "voice message without media",
            Self::Unsupported => "unsupported message type",
        };
        f.write_str(reason)
    }
}

/// What the relay should do with an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Drop the event.
    Ignore(IgnoreReason),
    /// Buffer the text as-is.
    Text(String),
    /// Transcribe the voice note, then buffer the transcript.
    Voice(VoiceNote),
}

impl InboundEvent {
    /// Classifies the event.
    ///
    /// Self, group and broadcast messages are filtered first, regardless of
    /// their content kind.
    #[must_use]
    pub fn route(&self) -> Route {
        if self.is_self {
            return Route::Ignore(IgnoreReason::FromSelf);
        }
        if self.conversation_id.is_broadcast() {
            return Route::Ignore(IgnoreReason::Broadcast);
        }
        if self.is_group || self.conversation_id.is_group() {
            return Route::Ignore(IgnoreReason::Group);
        }

        match self.kind {
            MessageKind::Text => match self.body.as_deref() {
                Some(body) if !body.trim().is_empty() => Route::Text(body.to_string()),
                _ => Route::Ignore(IgnoreReason::EmptyText),
            },
            MessageKind::Voice => match &self.media {
                Some(media) => Route::Voice(VoiceNote {
                    message_id: self.message_id.clone(),
                    media: media.clone(),
                }),
                None => Route::Ignore(IgnoreReason::MissingMedia),
            },
            MessageKind::Other => Route::Ignore(IgnoreReason::Unsupported),
        }
    }
}
