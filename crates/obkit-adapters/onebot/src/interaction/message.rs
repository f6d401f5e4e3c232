use std::any::Any;
use std::fmt;
use std::sync::Arc;

use obkit_core::RichText;

use crate::api::MessageBody;
use crate::error::{BotError, BotResult};
use crate::model::segment::Segment;

/// Content of a received message: its id and segments.
///
/// Obtained from message events or `get_msg`, and sendable as is.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageContent {
    pub message_id: i64,
    pub segments: Vec<Segment>,
}

impl MessageContent {
    pub fn new(message_id: i64, segments: Vec<Segment>) -> Self {
        Self {
            message_id,
            segments,
        }
    }
}

/// A message moving through the send interception pipeline.
#[derive(Clone)]
pub enum InteractionMessage {
    /// Plain text, sent through the text fast path.
    Text(String),
    /// Protocol-agnostic rich text.
    Message(RichText),
    Content(MessageContent),
    Segments(Vec<Segment>),
    /// Application-defined payload. Cannot be sent.
    Extension(Arc<dyn Any + Send + Sync>),
}

impl InteractionMessage {
    /// Name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Message(_) => "message",
            Self::Content(_) => "content",
            Self::Segments(_) => "segments",
            Self::Extension(_) => "extension",
        }
    }

    /// Segments when they are already known without resolution.
    pub fn segments(&self) -> Option<&[Segment]> {
        match self {
            Self::Content(content) => Some(&content.segments),
            Self::Segments(segments) => Some(segments),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Resolves the message into the body of a send action.
    pub fn into_body(self) -> BotResult<MessageBody> {
        match self {
            Self::Text(text) => Ok(MessageBody::Text(text)),
            Self::Message(message) => Ok(MessageBody::Segments(
                message
                    .into_segments()
                    .iter()
                    .map(Segment::from_rich_text)
                    .collect(),
            )),
            Self::Content(content) => Ok(MessageBody::Segments(content.segments)),
            Self::Segments(segments) => Ok(MessageBody::Segments(segments)),
            Self::Extension(_) => Err(BotError::UnsupportedMessage {
                kind: self.kind().to_owned(),
            }),
        }
    }
}

impl fmt::Debug for InteractionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Message(message) => f.debug_tuple("Message").field(message).finish(),
            Self::Content(content) => f.debug_tuple("Content").field(content).finish(),
            Self::Segments(segments) => f.debug_tuple("Segments").field(segments).finish(),
            Self::Extension(_) => f.write_str("Extension(..)"),
        }
    }
}

impl From<&str> for InteractionMessage {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for InteractionMessage {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<RichText> for InteractionMessage {
    fn from(message: RichText) -> Self {
        Self::Message(message)
    }
}

impl From<MessageContent> for InteractionMessage {
    fn from(content: MessageContent) -> Self {
        Self::Content(content)
    }
}

impl From<Vec<Segment>> for InteractionMessage {
    fn from(segments: Vec<Segment>) -> Self {
        Self::Segments(segments)
    }
}

impl From<Segment> for InteractionMessage {
    fn from(segment: Segment) -> Self {
        Self::Segments(vec![segment])
    }
}
