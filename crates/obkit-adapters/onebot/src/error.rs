//! Error types for the OneBot engine.
//!
//! - [`ApiError`] - action request/response failures
//! - [`ResolveError`] - inbound event resolution failures
//! - [`InterceptionError`] - aggregated pre-send listener failures
//! - [`BotError`] - umbrella error returned by [`OneBotBot`](crate::OneBotBot)

use std::fmt;

use obkit_core::TransportError;
use thiserror::Error;

// ============================================================================
// Action Errors
// ============================================================================

/// Errors raised while invoking a gateway action.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The gateway answered with a non-2xx HTTP status.
    #[error("API response not successful: HTTP {status}, body: {body}")]
    ResponseNotSuccessful { status: u16, body: String },

    /// The HTTP transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The request body or the response envelope could not be (de)serialized.
    #[error("failed to decode result of action '{action}': {source}")]
    Decode {
        action: String,
        #[source]
        source: serde_json::Error,
    },

    /// The envelope was decoded but carries no usable data.
    #[error(
        "action '{action}' did not produce data: retcode={retcode}, status={status}, raw={raw}"
    )]
    IllegalState {
        action: String,
        retcode: i64,
        status: String,
        raw: String,
    },

    /// A custom action was built from inconsistent parts.
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

/// Result type for action calls.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Resolve Errors
// ============================================================================

/// Errors raised while turning a raw frame into an event.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The text is not a JSON object.
    #[error("invalid event payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),

    /// The object has no string `post_type`.
    #[error("missing required event property 'post_type'")]
    MissingPostType,

    /// A known `(post_type, sub_type)` shape failed field-level decoding.
    #[error("failed to decode '{post_type}.{sub_type}' event: {source}")]
    Decode {
        post_type: String,
        sub_type: String,
        #[source]
        source: serde_json::Error,
    },

    /// One or more custom resolvers failed.
    #[error("{} custom event resolver(s) failed", errors.len())]
    CustomResolvers {
        errors: Vec<anyhow::Error>,
        #[source]
        cause: Option<Box<ResolveError>>,
    },
}

impl ResolveError {
    /// Returns `true` when the payload itself cannot be trusted.
    ///
    /// Fatal errors abort resolution instead of degrading to an
    /// [`UnknownEvent`](crate::UnknownEvent).
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidPayload(_) | Self::MissingPostType)
    }
}

// ============================================================================
// Interception Errors
// ============================================================================

/// Aggregated failure of pre-send listeners.
///
/// `suppressed` keeps every listener error in invocation order.
#[derive(Debug, Error)]
pub struct InterceptionError {
    pub suppressed: Vec<anyhow::Error>,
}

impl InterceptionError {
    pub fn new(suppressed: Vec<anyhow::Error>) -> Self {
        Self { suppressed }
    }
}

impl fmt::Display for InterceptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "message pre-send event process failed with {} error(s)",
            self.suppressed.len()
        )?;
        for (i, err) in self.suppressed.iter().enumerate() {
            write!(f, "\n  [{i}] {err:#}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Bot Errors
// ============================================================================

/// Umbrella error for bot operations.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Interception(#[from] InterceptionError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The message variant cannot be turned into segments.
    #[error("message type '{kind}' is not supported for interception")]
    UnsupportedMessage { kind: String },

    /// The event has no chat to answer in.
    #[error("event '{event}' cannot be replied to")]
    NotReplyable { event: &'static str },

    #[error("event '{event}' does not carry a message")]
    NotAMessage { event: &'static str },

    /// The pre-send message was already consumed.
    #[error("message of pre-send event has already been consumed")]
    MessageConsumed,

    /// The event channel gave up reconnecting.
    #[error("failed to connect to '{url}' after {attempts} attempt(s): {last_error}")]
    ConnectRetriesExhausted {
        url: String,
        attempts: u32,
        last_error: TransportError,
    },

    /// The bot was cancelled before the operation could complete.
    #[error("bot has been cancelled")]
    Cancelled,

    /// Invalid bot configuration.
    #[error("invalid bot configuration: {0}")]
    Config(String),
}

/// Result type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interception_error_keeps_order() {
        let err = InterceptionError::new(vec![anyhow::anyhow!("E1"), anyhow::anyhow!("E2")]);
        let messages: Vec<_> = err.suppressed.iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["E1", "E2"]);
        assert!(err.to_string().contains("2 error(s)"));
    }

    #[test]
    fn test_resolve_error_fatality() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(ResolveError::InvalidPayload(json_err).is_fatal());
        assert!(ResolveError::MissingPostType.is_fatal());
        assert!(
            !ResolveError::CustomResolvers {
                errors: vec![],
                cause: None
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_api_error_display() {
        let err = ApiError::IllegalState {
            action: "get_login_info".into(),
            retcode: 100,
            status: "failed".into(),
            raw: "{}".into(),
        };
        let text = err.to_string();
        assert!(text.contains("get_login_info"));
        assert!(text.contains("retcode=100"));
    }
}
