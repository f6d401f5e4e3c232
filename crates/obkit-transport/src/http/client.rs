//! HTTP client capability implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, Method};
use tracing::trace;

use obkit_core::{HttpClient, HttpMethod, HttpRequest, HttpResponse, TransportError, TransportResult};

/// Timeouts applied to every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpClientOptions {
    /// Whole-request timeout. `None` disables it.
    pub request_timeout: Option<Duration>,
    /// Connect timeout. `None` disables it.
    pub connect_timeout: Option<Duration>,
}

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a client with a 30 second request timeout.
    pub fn new() -> TransportResult<Self> {
        Self::with_options(HttpClientOptions {
            request_timeout: Some(Duration::from_secs(30)),
            connect_timeout: None,
        })
    }

    /// Creates a client with custom timeouts.
    pub fn with_options(options: HttpClientOptions) -> TransportResult<Self> {
        let mut builder = ClientBuilder::new();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> TransportResult<HttpResponse> {
        trace!(method = %request.method, url = %request.url, "Sending HTTP request");

        let mut req = self
            .client
            .request(to_reqwest_method(request.method), &request.url);
        if let Some(token) = &request.bearer_token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = request.json_body {
            req = req.header(CONTENT_TYPE, "application/json").body(body);
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_builder() {
                TransportError::InvalidRequest(e.to_string())
            } else {
                TransportError::Io(e.to_string())
            }
        })?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        trace!(status, len = body.len(), "Received HTTP response");
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_post_with_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send_msg"))
            .and(header("authorization", "Bearer secret"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"message":"hi"}"#))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"retcode":0,"status":"ok"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new().unwrap();
        let response = client
            .execute(
                HttpRequest::new(HttpMethod::Post, format!("{}/send_msg", server.uri()))
                    .bearer_auth("secret")
                    .json(r#"{"message":"hi"}"#),
            )
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.body, r#"{"retcode":0,"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_non_success_status_is_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let client = ReqwestHttpClient::new().unwrap();
        let response = client
            .execute(HttpRequest::new(
                HttpMethod::Post,
                format!("{}/get_login_info", server.uri()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status, 401);
        assert_eq!(response.body, "Unauthorized");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_io_error() {
        let client = ReqwestHttpClient::with_options(HttpClientOptions {
            request_timeout: Some(Duration::from_secs(2)),
            connect_timeout: Some(Duration::from_secs(1)),
        })
        .unwrap();

        let err = client
            .execute(HttpRequest::new(HttpMethod::Get, "http://127.0.0.1:9/"))
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Io(_)));
    }
}
