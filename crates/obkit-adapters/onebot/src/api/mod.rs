//! Typed action layer over the gateway's HTTP API.
//!
//! An [`Action<T>`] names a gateway action, carries its JSON body and knows
//! how to decode the `data` of the result envelope into `T`.
//! [`ActionClient`] executes it:
//!
//! | Method | Returns | Fails on |
//! |--------|---------|----------|
//! | [`request_raw`](ActionClient::request_raw) | response text | transport error, non-2xx status |
//! | [`request_result`](ActionClient::request_result) | [`ActionResult<T>`] | the above, undecodable envelope |
//! | [`request_data`](ActionClient::request_data) | `T` | the above, non-success retcode, missing data |
//!
//! Nothing is retried here: whether an action may be repeated safely is up
//! to the caller.

pub mod actions;
mod custom;

pub use actions::*;
pub use custom::{CustomAction, CustomActionBuilder};

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use obkit_core::{HttpClient, HttpMethod, HttpRequest};

use crate::error::{ApiError, ApiResult};

/// `retcode` of a successful call.
pub const RETCODE_SUCCESS: i64 = 0;
/// `retcode` of an accepted `_async` call.
pub const RETCODE_ASYNC: i64 = 1;

type DataDecoder<T> = Arc<dyn Fn(Value) -> serde_json::Result<T> + Send + Sync>;

// ============================================================================
// Action
// ============================================================================

/// Variant of an action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSuffix {
    /// `{action}_async`: the gateway answers before executing.
    Async,
    /// `{action}_rate_limited`: the gateway queues the call.
    RateLimited,
}

impl ActionSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Async => "_async",
            Self::RateLimited => "_rate_limited",
        }
    }
}

/// A gateway action returning `T`.
pub struct Action<T> {
    name: Cow<'static, str>,
    method: HttpMethod,
    body: Option<Value>,
    suffix: Option<ActionSuffix>,
    decoder: DataDecoder<T>,
}

impl<T> Action<T> {
    /// Creates a POST action whose data decodes with serde.
    pub fn new(name: impl Into<Cow<'static, str>>, body: Option<Value>) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        Self::with_decoder(name, HttpMethod::Post, body, serde_json::from_value::<T>)
    }

    /// Creates an action with an explicit data decoder.
    pub fn with_decoder<F>(
        name: impl Into<Cow<'static, str>>,
        method: HttpMethod,
        body: Option<Value>,
        decoder: F,
    ) -> Self
    where
        F: Fn(Value) -> serde_json::Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            method,
            body,
            suffix: None,
            decoder: Arc::new(decoder),
        }
    }

    /// Sends the action to a suffixed endpoint.
    pub fn suffix(mut self, suffix: ActionSuffix) -> Self {
        self.suffix = Some(suffix);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// `{name}{suffix}`, the path segment of the endpoint.
    pub fn endpoint(&self) -> String {
        match self.suffix {
            Some(suffix) => format!("{}{}", self.name, suffix.as_str()),
            None => self.name.to_string(),
        }
    }

    /// Decodes a result envelope.
    pub fn decode_result(&self, raw: &str) -> ApiResult<ActionResult<T>> {
        let decode_err = |source| ApiError::Decode {
            action: self.endpoint(),
            source,
        };
        let envelope: Envelope = serde_json::from_str(raw).map_err(decode_err)?;
        let data = match envelope.data {
            Value::Null => None,
            value => Some((self.decoder)(value).map_err(decode_err)?),
        };

        Ok(ActionResult {
            retcode: envelope.retcode,
            status: envelope.status,
            data,
            message: envelope.message,
            wording: envelope.wording,
            raw: raw.to_owned(),
        })
    }
}

impl<T> Clone for Action<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            method: self.method,
            body: self.body.clone(),
            suffix: self.suffix,
            decoder: self.decoder.clone(),
        }
    }
}

impl<T> fmt::Debug for Action<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("body", &self.body)
            .field("suffix", &self.suffix)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ActionResult
// ============================================================================

#[derive(Deserialize)]
struct Envelope {
    retcode: i64,
    #[serde(default)]
    status: String,
    #[serde(default)]
    data: Value,
    #[serde(default, rename = "msg")]
    message: Option<String>,
    #[serde(default)]
    wording: Option<String>,
}

/// The `{retcode, status, data}` envelope of an action response.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    pub retcode: i64,
    /// `ok`, `async` or `failed`.
    pub status: String,
    pub data: Option<T>,
    /// Error message some implementations add on failure.
    pub message: Option<String>,
    pub wording: Option<String>,
    /// The response text the envelope was decoded from.
    pub raw: String,
}

impl<T> ActionResult<T> {
    pub fn is_success(&self) -> bool {
        self.retcode == RETCODE_SUCCESS || self.status == "ok"
    }

    /// Returns `true` for an accepted `_async` call.
    pub fn is_async(&self) -> bool {
        self.retcode == RETCODE_ASYNC
    }

    /// Returns the data of a successful result.
    pub fn data_or_error(self, action: &str) -> ApiResult<T> {
        match self.data {
            Some(data) if self.is_success() => Ok(data),
            _ => Err(self.into_illegal_state(action)),
        }
    }

    /// Fails unless the call succeeded. `data` may still be absent.
    pub fn ensure_success(self, action: &str) -> ApiResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(self.into_illegal_state(action))
        }
    }

    fn into_illegal_state(self, action: &str) -> ApiError {
        ApiError::IllegalState {
            action: action.to_owned(),
            retcode: self.retcode,
            status: self.status,
            raw: self.raw,
        }
    }
}

// ============================================================================
// ActionClient
// ============================================================================

/// Executes [`Action`]s against `{api_host}/{action}`.
#[derive(Clone)]
pub struct ActionClient {
    http: Arc<dyn HttpClient>,
    api_host: String,
    access_token: Option<String>,
}

impl ActionClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        api_host: impl Into<String>,
        access_token: Option<String>,
    ) -> Self {
        let mut api_host = api_host.into();
        while api_host.ends_with('/') {
            api_host.pop();
        }
        Self {
            http,
            api_host,
            access_token: access_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn api_host(&self) -> &str {
        &self.api_host
    }

    /// Full URL of the action endpoint.
    pub fn action_url<T>(&self, action: &Action<T>) -> String {
        format!("{}/{}", self.api_host, action.endpoint())
    }

    /// Executes the action and returns the response text.
    pub async fn request_raw<T>(&self, action: &Action<T>) -> ApiResult<String> {
        let url = self.action_url(action);
        let mut request = HttpRequest::new(action.method(), url);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if action.method() != HttpMethod::Get {
            let body = match action.body() {
                Some(body) => serde_json::to_string(body),
                None => Ok("{}".to_owned()),
            }
            .map_err(|source| ApiError::Decode {
                action: action.endpoint(),
                source,
            })?;
            trace!(action = %action.name(), body = %body, "Action request body");
            request = request.json(body);
        }

        debug!(action = %action.name(), url = %request.url, "Executing action");
        let response = self.http.execute(request).await?;
        trace!(
            action = %action.name(),
            status = response.status,
            body = %response.body,
            "Action response"
        );

        if !response.is_success() {
            return Err(ApiError::ResponseNotSuccessful {
                status: response.status,
                body: response.body,
            });
        }
        Ok(response.body)
    }

    /// Executes the action and decodes the result envelope.
    pub async fn request_result<T>(&self, action: &Action<T>) -> ApiResult<ActionResult<T>> {
        let raw = self.request_raw(action).await?;
        action.decode_result(&raw)
    }

    /// Executes the action and returns the data of a successful result.
    pub async fn request_data<T>(&self, action: &Action<T>) -> ApiResult<T> {
        self.request_result(action)
            .await?
            .data_or_error(&action.endpoint())
    }
}

impl fmt::Debug for ActionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionClient")
            .field("api_host", &self.api_host)
            .field("has_token", &self.access_token.is_some())
            .finish()
    }
}
