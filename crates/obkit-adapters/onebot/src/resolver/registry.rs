//! `(post_type, sub_type)` → raw event decoder table.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::model::event::{RawDecodeFn, standard_decoders};

/// Post types whose sub-type field is not `{post_type}_type`.
const SUB_TYPE_FIELD_OVERRIDES: &[(&str, &str)] = &[("message_sent", "message_type")];

/// Returns the name of the field holding the sub type of `post_type`.
pub fn sub_type_field(post_type: &str) -> Cow<'static, str> {
    SUB_TYPE_FIELD_OVERRIDES
        .iter()
        .find(|(post, _)| *post == post_type)
        .map(|(_, field)| Cow::Borrowed(*field))
        .unwrap_or_else(|| Cow::Owned(format!("{post_type}_type")))
}

/// Two-level dispatch table for raw events.
#[derive(Debug, Clone)]
pub struct RawEventRegistry {
    decoders: HashMap<String, HashMap<String, RawDecodeFn>>,
}

impl RawEventRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry holding every standard OneBot v11 shape.
    ///
    /// Messages the bot sent itself (`message_sent`) decode like received ones.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        for (post_type, sub_type, decode) in standard_decoders() {
            registry.register(post_type, sub_type, decode);
            if post_type == "message" {
                registry.register("message_sent", sub_type, decode);
            }
        }
        registry
    }

    /// Registers `decode` for a pair, replacing any previous entry.
    pub fn register(
        &mut self,
        post_type: impl Into<String>,
        sub_type: impl Into<String>,
        decode: RawDecodeFn,
    ) -> &mut Self {
        self.decoders
            .entry(post_type.into())
            .or_default()
            .insert(sub_type.into(), decode);
        self
    }

    pub fn get(&self, post_type: &str, sub_type: &str) -> Option<RawDecodeFn> {
        self.decoders.get(post_type)?.get(sub_type).copied()
    }

    pub fn len(&self) -> usize {
        self.decoders.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RawEventRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
