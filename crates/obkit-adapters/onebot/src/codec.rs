//! Message segment codec.
//!
//! [`SegmentRegistry`] maps a segment tag to a decode function. The standard
//! OneBot tags are always present; hosts add their own with
//! [`SegmentRegistry::register`]. A tag with no entry always falls back to
//! [`Segment::Unknown`], which re-encodes to the object it was decoded from.
//!
//! ```rust,ignore
//! #[derive(Debug, Deserialize, Serialize)]
//! struct Markdown { content: String }
//!
//! impl CustomSegment for Markdown { /* segment_type() == "markdown" */ }
//!
//! let mut registry = SegmentRegistry::standard();
//! registry.register::<Markdown>("markdown");
//! let codec = SegmentCodec::new(registry);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use serde::de::{DeserializeOwned, Error as _};
use serde_json::{Map, Value};

use crate::model::segment::{CustomSegment, Segment, UnknownSegment};

type DecodeFn = Arc<dyn Fn(Value) -> serde_json::Result<Segment> + Send + Sync>;

static STANDARD: LazyLock<SegmentRegistry> = LazyLock::new(SegmentRegistry::standard);

// ============================================================================
// SegmentRegistry
// ============================================================================

/// Tag → decoder table for message segments.
#[derive(Clone)]
pub struct SegmentRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl SegmentRegistry {
    /// Creates an empty registry. Every tag decodes to [`Segment::Unknown`].
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry containing the standard OneBot v11 segments.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_standard();
        registry
    }

    /// Returns a process-wide standard registry.
    pub fn shared_standard() -> &'static Self {
        &STANDARD
    }

    /// Registers a host segment type decoded from `data` with serde.
    ///
    /// Registering a standard tag replaces the standard decoder.
    pub fn register<T>(&mut self, tag: impl Into<String>) -> &mut Self
    where
        T: CustomSegment + DeserializeOwned,
    {
        self.register_fn(tag, |data| {
            serde_json::from_value::<T>(data).map(|seg| Segment::Custom(Arc::new(seg)))
        })
    }

    /// Registers an arbitrary decode function for `tag`.
    pub fn register_fn<F>(&mut self, tag: impl Into<String>, decode: F) -> &mut Self
    where
        F: Fn(Value) -> serde_json::Result<Segment> + Send + Sync + 'static,
    {
        self.decoders.insert(tag.into(), Arc::new(decode));
        self
    }

    /// Returns `true` if `tag` has a decoder.
    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Decodes one `{type, data}` object.
    ///
    /// Registered decoders see a missing `data` field as an empty object.
    pub fn decode(&self, value: Value) -> serde_json::Result<Segment> {
        let Value::Object(mut obj) = value else {
            return Err(serde_json::Error::custom("message segment must be an object"));
        };
        let segment_type = match obj.remove("type") {
            Some(Value::String(tag)) => tag,
            Some(other) => {
                return Err(serde_json::Error::custom(format!(
                    "segment 'type' must be a string, found {other}"
                )));
            }
            None => return Err(serde_json::Error::custom("missing segment field 'type'")),
        };
        let data = obj.remove("data");

        match self.decoders.get(&segment_type) {
            Some(decode) => decode(data.unwrap_or_else(|| Value::Object(Map::new()))),
            None => Ok(Segment::Unknown(UnknownSegment {
                segment_type,
                data,
                extra: obj,
            })),
        }
    }
}

impl Default for SegmentRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for SegmentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.decoders.keys().collect();
        tags.sort();
        f.debug_struct("SegmentRegistry").field("tags", &tags).finish()
    }
}

// ============================================================================
// SegmentCodec
// ============================================================================

/// Encodes and decodes segment lists with a fixed [`SegmentRegistry`].
#[derive(Debug, Clone, Default)]
pub struct SegmentCodec {
    registry: Arc<SegmentRegistry>,
}

impl SegmentCodec {
    pub fn new(registry: SegmentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn registry(&self) -> &SegmentRegistry {
        &self.registry
    }

    /// Decodes one segment object.
    pub fn decode(&self, value: Value) -> serde_json::Result<Segment> {
        self.registry.decode(value)
    }

    /// Decodes a JSON array of segment objects.
    pub fn decode_list(&self, value: Value) -> serde_json::Result<Vec<Segment>> {
        match value {
            Value::Array(items) => items.into_iter().map(|v| self.decode(v)).collect(),
            other => Err(serde_json::Error::custom(format!(
                "message must be an array of segments, found {other}"
            ))),
        }
    }

    /// Parses and decodes a JSON text.
    pub fn decode_str(&self, text: &str) -> serde_json::Result<Segment> {
        self.decode(serde_json::from_str(text)?)
    }

    /// Encodes one segment to its `{type, data}` object.
    pub fn encode(&self, segment: &Segment) -> serde_json::Result<Value> {
        segment.to_value()
    }

    /// Encodes a segment list to a JSON array.
    pub fn encode_list(&self, segments: &[Segment]) -> serde_json::Result<Value> {
        segments
            .iter()
            .map(Segment::to_value)
            .collect::<serde_json::Result<Vec<_>>>()
            .map(Value::Array)
    }

    /// Re-decodes an unknown segment whose tag this codec knows.
    ///
    /// Segments that still cannot be decoded are returned unchanged.
    pub fn refine(&self, segment: Segment) -> Segment {
        let Segment::Unknown(unknown) = segment else {
            return segment;
        };
        if !self.registry.contains(&unknown.segment_type) {
            return Segment::Unknown(unknown);
        }

        match self.decode(unknown.to_value()) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::debug!(
                    segment_type = %unknown.segment_type,
                    error = %e,
                    "Segment kept as unknown"
                );
                Segment::Unknown(unknown)
            }
        }
    }

    /// Applies [`refine`](Self::refine) to every segment.
    pub fn refine_all(&self, segments: Vec<Segment>) -> Vec<Segment> {
        segments.into_iter().map(|seg| self.refine(seg)).collect()
    }
}
