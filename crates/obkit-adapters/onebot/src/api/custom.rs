//! Runtime-defined actions for gateway extensions.

use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use obkit_core::HttpMethod;

use crate::api::{Action, ActionSuffix, DataDecoder};
use crate::error::{ApiError, ApiResult};

/// Entry point for actions the crate does not model.
///
/// ```rust,ignore
/// let action = CustomAction::builder::<Vec<ShutMember>>("get_group_shut_list")
///     .body(json!({ "group_id": 123 }))
///     .decode_with_serde()
///     .build()?;
/// let shut = bot.execute_data(&action).await?;
/// ```
pub struct CustomAction;

impl CustomAction {
    pub fn builder<T>(action: impl Into<Cow<'static, str>>) -> CustomActionBuilder<T> {
        CustomActionBuilder {
            name: action.into(),
            method: HttpMethod::Post,
            body: None,
            suffix: None,
            decoder: None,
            _marker: PhantomData,
        }
    }
}

/// Builder returned by [`CustomAction::builder`].
pub struct CustomActionBuilder<T> {
    name: Cow<'static, str>,
    method: HttpMethod,
    body: Option<Value>,
    suffix: Option<ActionSuffix>,
    decoder: Option<DataDecoder<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CustomActionBuilder<T> {
    /// HTTP method, `POST` by default.
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn suffix(mut self, suffix: ActionSuffix) -> Self {
        self.suffix = Some(suffix);
        self
    }

    /// Decodes `data` with `decoder`.
    pub fn decoder<F>(mut self, decoder: F) -> Self
    where
        F: Fn(Value) -> serde_json::Result<T> + Send + Sync + 'static,
    {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    /// Decodes `data` with serde.
    pub fn decode_with_serde(self) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        self.decoder(serde_json::from_value::<T>)
    }

    /// Builds the action.
    ///
    /// Fails for a `GET` with a body, or when no decoder was set.
    pub fn build(self) -> ApiResult<Action<T>> {
        if self.method == HttpMethod::Get && self.body.is_some() {
            return Err(ApiError::InvalidAction(format!(
                "action '{}' uses GET and cannot carry a body",
                self.name
            )));
        }
        let Some(decoder) = self.decoder else {
            return Err(ApiError::InvalidAction(format!(
                "action '{}' has no result decoder",
                self.name
            )));
        };

        Ok(Action {
            name: self.name,
            method: self.method,
            body: self.body,
            suffix: self.suffix,
            decoder,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::ActionClient;
    use crate::testing::MockHttpClient;

    #[test]
    fn test_get_with_body_is_rejected() {
        let err = CustomAction::builder::<Value>("x")
            .method(HttpMethod::Get)
            .body(json!({}))
            .decode_with_serde()
            .build()
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAction(_)));
    }

    #[test]
    fn test_decoder_is_required() {
        let err = CustomAction::builder::<Value>("x").build().unwrap_err();
        assert!(err.to_string().contains("no result decoder"));
    }

    #[tokio::test]
    async fn test_custom_get_action() {
        let http = MockHttpClient::new();
        http.respond(200, r#"{"retcode":0,"status":"ok","data":[1,2,3]}"#);
        let client = ActionClient::new(http.clone(), "http://gw", None);

        let action = CustomAction::builder("list_things")
            .method(HttpMethod::Get)
            .suffix(ActionSuffix::RateLimited)
            .decoder(|data| serde_json::from_value::<Vec<i32>>(data).map(|v| v.len()))
            .build()
            .unwrap();

        assert_eq!(client.request_data(&action).await.unwrap(), 3);
        let requests = http.requests();
        assert_eq!(requests[0].method, HttpMethod::Get);
        assert_eq!(requests[0].url, "http://gw/list_things_rate_limited");
        assert_eq!(requests[0].json_body, None);
    }
}
