//! Protocol-agnostic message type.
//!
//! [`RichText`] is what application code builds when it does not want to
//! depend on a specific protocol's segment model. Protocol engines map each
//! [`RichTextSegment`] to their own segments when sending.

use std::fmt::{self, Display};
use std::ops::Deref;

use serde::{Deserialize, Serialize};

// ============================================================================
// Rich Text Segment
// ============================================================================

/// A platform-agnostic rich text segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RichTextSegment {
    /// Plain text content.
    Text(String),
    /// An image, identified by a platform-specific reference
    /// (file path, URL, base64, etc.).
    Image(String),
    /// An image held in memory.
    ImageBytes(Vec<u8>),
    /// A built-in face (emoji) by its platform id.
    Face(String),
    /// A user mention.
    At(String),
    /// A mention of everyone.
    AtAll,
    /// A reference to the message being replied to.
    Reply(String),
}

impl Display for RichTextSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RichTextSegment::Text(s) => write!(f, "{s}"),
            RichTextSegment::Image(r) => write!(f, "[Image: {r}]"),
            RichTextSegment::ImageBytes(bytes) => write!(f, "[Image: {} bytes]", bytes.len()),
            RichTextSegment::Face(id) => write!(f, "[Face: {id}]"),
            RichTextSegment::At(id) => write!(f, "@{id}"),
            RichTextSegment::AtAll => write!(f, "@all"),
            RichTextSegment::Reply(id) => write!(f, "[Reply: {id}]"),
        }
    }
}

// ============================================================================
// RichText
// ============================================================================

/// A protocol-agnostic message composed of [`RichTextSegment`]s.
///
/// ```rust,ignore
/// let msg = RichText::new().reply("42").at("10001").text(" hello");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText {
    segments: Vec<RichTextSegment>,
}

impl RichText {
    /// Creates a new empty message.
    pub const fn new() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Adds a text segment.
    pub fn text(self, text: impl Into<String>) -> Self {
        self.with(RichTextSegment::Text(text.into()))
    }

    /// Adds an at-mention segment.
    pub fn at(self, id: impl Into<String>) -> Self {
        self.with(RichTextSegment::At(id.into()))
    }

    /// Adds a mention of everyone.
    pub fn at_all(self) -> Self {
        self.with(RichTextSegment::AtAll)
    }

    /// Adds an image segment.
    pub fn image(self, reference: impl Into<String>) -> Self {
        self.with(RichTextSegment::Image(reference.into()))
    }

    /// Adds an in-memory image.
    pub fn image_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.with(RichTextSegment::ImageBytes(bytes.into()))
    }

    /// Adds a built-in face.
    pub fn face(self, id: impl Into<String>) -> Self {
        self.with(RichTextSegment::Face(id.into()))
    }

    /// Adds a reply reference.
    pub fn reply(self, message_id: impl Into<String>) -> Self {
        self.with(RichTextSegment::Reply(message_id.into()))
    }

    /// Adds a segment to the end of the message.
    pub fn push(&mut self, segment: RichTextSegment) {
        self.segments.push(segment);
    }

    /// Consumes the message and adds a segment (builder pattern).
    pub fn with(mut self, segment: RichTextSegment) -> Self {
        self.segments.push(segment);
        self
    }

    /// Concatenates the content of all text segments.
    pub fn extract_plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|seg| match seg {
                RichTextSegment::Text(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Consumes the message and returns the inner segments vector.
    pub fn into_segments(self) -> Vec<RichTextSegment> {
        self.segments
    }
}

impl Deref for RichText {
    type Target = [RichTextSegment];

    fn deref(&self) -> &Self::Target {
        &self.segments
    }
}

impl Display for RichText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl From<Vec<RichTextSegment>> for RichText {
    fn from(segments: Vec<RichTextSegment>) -> Self {
        Self { segments }
    }
}

impl FromIterator<RichTextSegment> for RichText {
    fn from_iter<T: IntoIterator<Item = RichTextSegment>>(iter: T) -> Self {
        Self {
            segments: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let msg = RichText::new().reply("7").at("10001").text(" hi ").image("a.png");
        assert_eq!(msg.len(), 4);
        assert_eq!(msg.to_string(), "[Reply: 7]@10001 hi [Image: a.png]");
        assert_eq!(msg.extract_plain_text(), " hi ");

        let msg = RichText::new().face("14").image_bytes(vec![1, 2, 3]);
        assert_eq!(msg.to_string(), "[Face: 14][Image: 3 bytes]");
        assert_eq!(msg.extract_plain_text(), "");
    }

    #[test]
    fn test_serde_shape() {
        let msg = RichText::new().text("a").at_all();
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"[{"kind":"text","value":"a"},{"kind":"at_all"}]"#);

        let back: RichText = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
