//! Application-supplied event resolvers.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde_json::Value;

use obkit_core::{BoxedEvent, Event};

use crate::bot::OneBotBot;
use crate::codec::SegmentCodec;
use crate::resolver::RawEventResolution;

/// What a custom resolver gets to look at.
pub struct ResolverContext<'a> {
    pub bot: &'a OneBotBot,
    pub codec: &'a SegmentCodec,
    pub resolution: &'a RawEventResolution,
}

impl ResolverContext<'_> {
    /// Returns `true` if the payload has the given post type and sub type.
    pub fn is(&self, post_type: &str, sub_type: &str) -> bool {
        self.resolution.post_type == post_type
            && self.resolution.sub_type.as_deref() == Some(sub_type)
    }
}

/// Turns a payload into an event before the standard classification.
///
/// Resolvers run in registration order; the first `Ok(Some(_))` wins. An
/// error does not stop the chain, it is recorded on the result.
pub trait CustomEventResolver: Send + Sync {
    fn resolve(&self, ctx: &ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>>;
}

/// [`CustomEventResolver`] backed by a closure.
pub struct FnResolver<F> {
    f: F,
}

impl<F> FnResolver<F>
where
    F: Fn(&ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> CustomEventResolver for FnResolver<F>
where
    F: Fn(&ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>> + Send + Sync,
{
    fn resolve(&self, ctx: &ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>> {
        (self.f)(ctx)
    }
}

/// Decodes one `(post_type, sub_type)` pair into a serde type.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct GroupSign { group_id: i64, user_id: i64 }
/// impl Event for GroupSign { /* ... */ }
///
/// builder.custom_resolver(SerdeEventResolver::<GroupSign>::new("notice", "group_sign"));
/// ```
pub struct SerdeEventResolver<E> {
    post_type: String,
    sub_type: String,
    _marker: PhantomData<fn() -> E>,
}

impl<E> SerdeEventResolver<E> {
    pub fn new(post_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            post_type: post_type.into(),
            sub_type: sub_type.into(),
            _marker: PhantomData,
        }
    }
}

impl<E> fmt::Debug for SerdeEventResolver<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeEventResolver")
            .field("post_type", &self.post_type)
            .field("sub_type", &self.sub_type)
            .field("event", &std::any::type_name::<E>())
            .finish()
    }
}

impl<E> CustomEventResolver for SerdeEventResolver<E>
where
    E: Event + DeserializeOwned,
{
    fn resolve(&self, ctx: &ResolverContext<'_>) -> anyhow::Result<Option<BoxedEvent>> {
        if !ctx.is(&self.post_type, &self.sub_type) {
            return Ok(None);
        }
        let event: E = serde_json::from_value(Value::Object(ctx.resolution.json.clone()))?;
        Ok(Some(BoxedEvent::new(event)))
    }
}
