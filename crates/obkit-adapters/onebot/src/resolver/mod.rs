//! Event resolution.
//!
//! Turns one received JSON text into exactly one [`BoxedEvent`]:
//!
//! ```text
//! text ──parse──▶ RawEventResolution ──custom chain──▶ first Some(event)
//!                  (post_type, sub_type,      │
//!                   raw_event?, reason?)      ▼ none
//!                                    raw_event? ──▶ classify ──▶ OneBotEvent
//!                                        │
//!                                        ▼ none
//!                                    UnknownEvent
//! ```
//!
//! Only an unparsable payload or a missing `post_type` is an error; every
//! other failure degrades to [`UnknownEvent`] and is logged.

mod classify;
mod custom;
mod registry;

pub use classify::classify;
pub use custom::{CustomEventResolver, FnResolver, ResolverContext, SerdeEventResolver};
pub use registry::{RawEventRegistry, sub_type_field};

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, trace};

use obkit_core::BoxedEvent;

use crate::bot::OneBotBot;
use crate::error::ResolveError;
use crate::event::{OneBotEvent, UnknownEvent};
use crate::model::event::RawEvent;

// ============================================================================
// Raw Resolution
// ============================================================================

/// First-stage result: the envelope fields and, when a standard shape
/// matched, the decoded raw event.
#[derive(Debug)]
pub struct RawEventResolution {
    pub text: Arc<str>,
    pub json: Map<String, Value>,
    pub post_type: String,
    pub sub_type: Option<String>,
    /// `-1` when absent.
    pub time: i64,
    /// `0` when absent.
    pub self_id: i64,
    pub raw_event: Option<RawEvent>,
    /// Field-level decode failure of a known shape.
    pub reason: Option<ResolveError>,
}

/// Parses `text` and decodes it with `registry` when the pair is known.
pub fn resolve_raw(
    registry: &RawEventRegistry,
    text: &str,
) -> Result<RawEventResolution, ResolveError> {
    let json: Map<String, Value> =
        serde_json::from_str(text).map_err(ResolveError::InvalidPayload)?;

    let post_type = json
        .get("post_type")
        .and_then(Value::as_str)
        .ok_or(ResolveError::MissingPostType)?
        .to_owned();
    let field = sub_type_field(&post_type);
    let sub_type = json
        .get(&*field)
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    let time = json.get("time").and_then(Value::as_i64).unwrap_or(-1);
    let self_id = json.get("self_id").and_then(Value::as_i64).unwrap_or(0);

    let mut raw_event = None;
    let mut reason = None;
    if let Some(sub) = &sub_type
        && let Some(decode) = registry.get(&post_type, sub)
    {
        match decode(Value::Object(json.clone())) {
            Ok(event) => raw_event = Some(event),
            Err(source) => {
                error!(
                    post_type = %post_type,
                    sub_type = %sub,
                    error = %source,
                    "Failed to decode raw event, it will be pushed as an unknown event"
                );
                reason = Some(ResolveError::Decode {
                    post_type: post_type.clone(),
                    sub_type: sub.clone(),
                    source,
                });
            }
        }
    }

    Ok(RawEventResolution {
        text: Arc::from(text),
        json,
        post_type,
        sub_type,
        time,
        self_id,
        raw_event,
        reason,
    })
}

// ============================================================================
// EventResolver
// ============================================================================

/// Standard registry plus the ordered custom resolver chain.
#[derive(Clone, Default)]
pub struct EventResolver {
    registry: RawEventRegistry,
    custom: Vec<Arc<dyn CustomEventResolver>>,
}

impl EventResolver {
    pub fn new(registry: RawEventRegistry, custom: Vec<Arc<dyn CustomEventResolver>>) -> Self {
        Self { registry, custom }
    }

    pub fn registry(&self) -> &RawEventRegistry {
        &self.registry
    }

    /// Number of custom resolvers.
    pub fn custom_count(&self) -> usize {
        self.custom.len()
    }

    /// Resolves `text` received by `bot`.
    ///
    /// Fails only for fatal errors (see [`ResolveError::is_fatal`]).
    pub fn resolve(&self, bot: &OneBotBot, text: &str) -> Result<BoxedEvent, ResolveError> {
        let mut resolution = resolve_raw(&self.registry, text)?;
        trace!(
            post_type = %resolution.post_type,
            sub_type = ?resolution.sub_type,
            "Resolved raw event"
        );

        let (custom_event, errors) = self.run_custom(bot, &resolution);

        let mut reason = resolution.reason.take();
        if !errors.is_empty() {
            reason = Some(ResolveError::CustomResolvers {
                errors,
                cause: reason.map(Box::new),
            });
        }
        if let Some(reason) = &reason {
            error!(
                bot_id = %bot.id(),
                error = %reason,
                "Something failed when resolving event"
            );
            debug!(text = %text, error = ?reason, "Failed event text");
        }

        if let Some(event) = custom_event {
            return Ok(event);
        }

        match resolution.raw_event.take() {
            Some(raw) => {
                debug!("No custom resolver matched, using the standard classification");
                let kind = classify(raw, bot.codec());
                Ok(BoxedEvent::new(OneBotEvent::new(
                    bot.clone(),
                    resolution.text,
                    kind,
                )))
            }
            None => {
                debug!(post_type = %resolution.post_type, "Event resolved as unknown");
                Ok(BoxedEvent::new(UnknownEvent {
                    source: resolution.text,
                    json: resolution.json,
                    post_type: resolution.post_type,
                    sub_type: resolution.sub_type,
                    time: resolution.time,
                    self_id: resolution.self_id,
                    reason,
                }))
            }
        }
    }

    fn run_custom(
        &self,
        bot: &OneBotBot,
        resolution: &RawEventResolution,
    ) -> (Option<BoxedEvent>, Vec<anyhow::Error>) {
        let mut errors = Vec::new();
        if self.custom.is_empty() {
            return (None, errors);
        }

        let ctx = ResolverContext {
            bot,
            codec: bot.codec(),
            resolution,
        };
        for resolver in &self.custom {
            match resolver.resolve(&ctx) {
                Ok(Some(event)) => return (Some(event), errors),
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }
        (None, errors)
    }
}
