//! OneBot v11 message segments.
//!
//! A segment is the wire object `{"type": "...", "data": {...}}`. The type
//! set is open:
//!
//! - standard tags decode into the concrete variants of [`Segment`]
//! - tags registered by the host decode into [`Segment::Custom`]
//! - anything else is kept verbatim as [`Segment::Unknown`]
//!
//! ```rust,ignore
//! use obkit_adapter_onebot::Segment;
//!
//! let segments = vec![Segment::reply("42"), Segment::at(10001), Segment::text(" hi")];
//! ```
//!
//! Decoding with `serde` only knows the standard tags; use
//! [`SegmentCodec`](crate::SegmentCodec) to recognize host-registered ones.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::de::{self, Deserializer};
use serde::ser::{self, SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use obkit_core::RichTextSegment;

use crate::codec::SegmentRegistry;

// ============================================================================
// Custom Segments
// ============================================================================

/// A segment type supplied by the host application.
///
/// Register the type with
/// [`SegmentRegistry::register`](crate::SegmentRegistry::register) so the
/// codec can decode it.
pub trait CustomSegment: fmt::Debug + Send + Sync + 'static {
    /// The wire tag of this segment.
    fn segment_type(&self) -> &str;

    /// Encodes the `data` part of the segment.
    fn to_data(&self) -> serde_json::Result<Value>;

    /// Returns a reference to self as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A segment whose tag no registry knows.
///
/// The tag, the data tree and any other top-level fields are kept untouched,
/// so re-encoding yields the object that was received.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownSegment {
    pub segment_type: String,
    /// `None` when the object had no `data` field.
    pub data: Option<Value>,
    /// Top-level fields besides `type` and `data`.
    pub extra: Map<String, Value>,
}

impl UnknownSegment {
    pub fn new(segment_type: impl Into<String>, data: Value) -> Self {
        Self {
            segment_type: segment_type.into(),
            data: Some(data),
            extra: Map::new(),
        }
    }

    /// Rebuilds the wire object.
    pub fn to_value(&self) -> Value {
        let mut obj = self.extra.clone();
        obj.insert("type".into(), Value::String(self.segment_type.clone()));
        if let Some(data) = &self.data {
            obj.insert("data".into(), data.clone());
        }
        Value::Object(obj)
    }
}

// ============================================================================
// Segment
// ============================================================================

macro_rules! standard_segments {
    ($($(#[$meta:meta])* $variant:ident($data:ty) => $tag:literal,)*) => {
        /// A OneBot v11 message segment.
        #[derive(Debug, Clone)]
        pub enum Segment {
            $($(#[$meta])* $variant($data),)*
            /// A host-registered segment type.
            Custom(Arc<dyn CustomSegment>),
            /// A segment with an unrecognized tag.
            Unknown(UnknownSegment),
        }

        impl Segment {
            /// Tags of every standard segment.
            pub const STANDARD_TYPES: &'static [&'static str] = &[$($tag),*];

            /// Returns the wire tag.
            pub fn segment_type(&self) -> &str {
                match self {
                    $(Self::$variant(_) => $tag,)*
                    Self::Custom(seg) => seg.segment_type(),
                    Self::Unknown(seg) => &seg.segment_type,
                }
            }

            /// Encodes the `data` part of the segment.
            pub fn to_data(&self) -> serde_json::Result<Value> {
                match self {
                    $(Self::$variant(data) => serde_json::to_value(data),)*
                    Self::Custom(seg) => seg.to_data(),
                    Self::Unknown(seg) => Ok(seg
                        .data
                        .clone()
                        .unwrap_or_else(|| Value::Object(Map::new()))),
                }
            }
        }

        impl SegmentRegistry {
            pub(crate) fn register_standard(&mut self) {
                $(self.register_fn($tag, |data| {
                    serde_json::from_value::<$data>(data).map(Segment::$variant)
                });)*
            }
        }
    };
}

standard_segments! {
    /// Plain text.
    Text(TextData) => "text",
    /// Built-in face.
    Face(FaceData) => "face",
    /// Picture.
    Image(ImageData) => "image",
    /// Voice.
    Record(RecordData) => "record",
    /// Short video.
    Video(VideoData) => "video",
    /// Mention of a member, or of everyone when `qq` is `all`.
    At(AtData) => "at",
    /// Rock-paper-scissors.
    Rps(EmptyData) => "rps",
    /// Dice.
    Dice(EmptyData) => "dice",
    /// Window shake.
    Shake(EmptyData) => "shake",
    /// Poke.
    Poke(PokeData) => "poke",
    /// Send anonymously.
    Anonymous(AnonymousData) => "anonymous",
    /// Link share.
    Share(ShareData) => "share",
    /// Friend or group recommendation.
    Contact(ContactData) => "contact",
    /// Location.
    Location(LocationData) => "location",
    /// Music share.
    Music(MusicData) => "music",
    /// Reference to the replied message.
    Reply(ReplyData) => "reply",
    /// Merged forward message.
    Forward(ForwardData) => "forward",
    /// Node of a merged forward message.
    Node(NodeData) => "node",
    /// XML card.
    Xml(RichData) => "xml",
    /// JSON card.
    Json(RichData) => "json",
}

impl Segment {
    /// Creates a text segment.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextData { text: text.into() })
    }

    /// Creates a face segment.
    pub fn face(id: impl ToString) -> Self {
        Self::Face(FaceData { id: id.to_string() })
    }

    /// Creates an image segment from a file path, URL or `base64://` string.
    pub fn image(file: impl Into<String>) -> Self {
        Self::Image(ImageData {
            file: file.into(),
            ..Default::default()
        })
    }

    /// Creates an image segment carrying `bytes` as a `base64://` file.
    pub fn image_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self::image(format!("base64://{}", STANDARD.encode(bytes)))
    }

    /// Creates a voice segment.
    pub fn record(file: impl Into<String>) -> Self {
        Self::Record(RecordData {
            file: file.into(),
            ..Default::default()
        })
    }

    /// Creates a mention of a user.
    pub fn at(user_id: i64) -> Self {
        Self::At(AtData {
            qq: user_id.to_string(),
            name: None,
        })
    }

    /// Creates a mention of everyone.
    pub fn at_all() -> Self {
        Self::At(AtData {
            qq: AtData::ALL.to_string(),
            name: None,
        })
    }

    /// Creates a reply reference.
    pub fn reply(message_id: impl ToString) -> Self {
        Self::Reply(ReplyData {
            id: message_id.to_string(),
        })
    }

    /// Creates a poke segment.
    pub fn poke(poke_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Poke(PokeData {
            poke_type: poke_type.into(),
            id: id.into(),
            name: None,
        })
    }

    /// Creates a merged-forward node that references an existing message.
    pub fn node(message_id: impl ToString) -> Self {
        Self::Node(NodeData {
            id: Some(message_id.to_string()),
            ..Default::default()
        })
    }

    /// Wraps a host-defined segment.
    pub fn custom(segment: impl CustomSegment) -> Self {
        Self::Custom(Arc::new(segment))
    }

    /// Returns the text of a text segment.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(data) => Some(&data.text),
            _ => None,
        }
    }

    /// Downcasts a custom segment.
    pub fn downcast_custom<T: CustomSegment>(&self) -> Option<&T> {
        match self {
            Self::Custom(seg) => seg.as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Encodes the whole `{type, data}` object.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        if let Self::Unknown(seg) = self {
            return Ok(seg.to_value());
        }
        let mut obj = Map::with_capacity(2);
        obj.insert("type".into(), Value::String(self.segment_type().to_owned()));
        obj.insert("data".into(), self.to_data()?);
        Ok(Value::Object(obj))
    }

    /// Maps a protocol-neutral segment.
    pub fn from_rich_text(segment: &RichTextSegment) -> Self {
        match segment {
            RichTextSegment::Text(text) => Self::text(text.as_str()),
            RichTextSegment::Image(file) => Self::image(file.as_str()),
            RichTextSegment::ImageBytes(bytes) => Self::image_bytes(bytes),
            RichTextSegment::Face(id) => Self::face(id),
            RichTextSegment::At(id) => Self::At(AtData {
                qq: id.clone(),
                name: None,
            }),
            RichTextSegment::AtAll => Self::at_all(),
            RichTextSegment::Reply(id) => Self::reply(id),
        }
    }
}

impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => {
                a.segment_type() == b.segment_type()
                    && matches!((a.to_data(), b.to_data()), (Ok(x), Ok(y)) if x == y)
            }
            (Self::Custom(_), _) | (_, Self::Custom(_)) => false,
            _ => {
                self.segment_type() == other.segment_type()
                    && matches!((self.to_data(), other.to_data()), (Ok(x), Ok(y)) if x == y)
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(data) => f.write_str(&data.text),
            Self::At(data) if data.is_all() => f.write_str("@all"),
            Self::At(data) => write!(f, "@{}", data.qq),
            Self::Image(data) => write!(f, "[image:{}]", data.file),
            Self::Reply(data) => write!(f, "[reply:{}]", data.id),
            Self::Face(data) => write!(f, "[face:{}]", data.id),
            other => write!(f, "[{}]", other.segment_type()),
        }
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Self::Unknown(seg) = self {
            return seg.to_value().serialize(serializer);
        }
        let data = self.to_data().map_err(ser::Error::custom)?;
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", self.segment_type())?;
        map.serialize_entry("data", &data)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        SegmentRegistry::shared_standard()
            .decode(value)
            .map_err(de::Error::custom)
    }
}

// ============================================================================
// Segment Data
// ============================================================================

/// `text` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    pub text: String,
}

/// `face` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceData {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// Data of segments without fields (`rps`, `dice`, `shake`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmptyData {}

/// `image` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    pub file: String,
    /// `flash` for flash pictures.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub image_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

/// `record` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `video` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoData {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// `at` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtData {
    #[serde(deserialize_with = "string_or_number")]
    pub qq: String,
    /// Display name some implementations attach on receive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl AtData {
    pub const ALL: &'static str = "all";

    /// Returns `true` for a mention of everyone.
    pub fn is_all(&self) -> bool {
        self.qq == Self::ALL
    }
}

/// `poke` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PokeData {
    #[serde(rename = "type")]
    pub poke_type: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `anonymous` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnonymousData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<String>,
}

/// `share` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareData {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// `contact` data; `type` is `qq` or `group`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactData {
    #[serde(rename = "type")]
    pub contact_type: String,
    pub id: String,
}

/// `location` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub lat: String,
    pub lon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// `music` data. `custom` music carries url/audio/title instead of an id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MusicData {
    #[serde(rename = "type")]
    pub music_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// `reply` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplyData {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
}

/// `forward` data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardData {
    pub id: String,
}

/// `node` data: either a message reference or a custom node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

/// `xml` and `json` card data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichData {
    pub data: String,
}

/// Accepts ids sent either as strings or as numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}
