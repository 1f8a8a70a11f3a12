//! HTTP transport seam and its reqwest implementation
//!
//! A transport runs one exchange and reports back through a
//! [`ResponseHandler`] on its own schedule, from whatever thread its runtime
//! picks. Handlers must therefore never block and must tolerate being called
//! after the task that issued the request has gone away.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use promptwire_core::errors::{LlmError, LlmResult};

use crate::config::TransportConfig;

/// An outbound POST
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    /// Report cumulative content through [`ResponseHandler::on_progress`]
    pub stream_progress: bool,
}

impl HttpRequest {
    /// JSON POST authenticated with a bearer token
    pub fn json_post(url: impl Into<String>, api_key: &str, body: String) -> Self {
        Self {
            url: url.into(),
            headers: vec![
                ("Content-Type", "application/json".to_string()),
                ("Authorization", format!("Bearer {}", api_key)),
            ],
            body,
            stream_progress: false,
        }
    }

    pub fn with_progress(mut self, stream_progress: bool) -> Self {
        self.stream_progress = stream_progress;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A received response: status plus the complete body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Callbacks a transport invokes while an exchange runs
pub trait ResponseHandler: Send + Sync {
    /// The request was handed to the network
    fn on_sent(&self);

    /// More of the body arrived. `content` is everything received so far.
    fn on_progress(&self, content: &str, bytes_received: u64);

    /// Terminal callback, invoked exactly once per exchange
    fn on_complete(&self, outcome: Result<HttpResponse, LlmError>);
}

/// Executes HTTP exchanges on behalf of tasks
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Run `request` to completion, reporting through `handler`.
    ///
    /// Dropping the returned future aborts the exchange.
    async fn execute(&self, request: HttpRequest, handler: Arc<dyn ResponseHandler>);
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a new transport
    pub fn new(config: TransportConfig) -> LlmResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(timeout));
        }

        let client = builder
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest, handler: Arc<dyn ResponseHandler>) {
        let mut builder = self.client.post(&request.url).body(request.body);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let outbound = match builder.build() {
            Ok(outbound) => outbound,
            Err(e) => {
                error!("Failed to build request for {}: {}", request.url, e);
                handler.on_complete(Err(LlmError::ConfigError(format!("Invalid request: {}", e))));
                return;
            }
        };

        debug!("POST {}", request.url);
        handler.on_sent();

        let response = match self.client.execute(outbound).await {
            Ok(response) => response,
            Err(e) => {
                handler.on_complete(Err(LlmError::NetworkError(format!("HTTP request failed: {}", e))));
                return;
            }
        };

        let status = response.status();
        debug!("Response status {} from {}", status, request.url);

        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    body.extend_from_slice(&bytes);
                    if request.stream_progress {
                        handler.on_progress(&String::from_utf8_lossy(&body), body.len() as u64);
                    }
                }
                Err(e) => {
                    handler.on_complete(Err(LlmError::NetworkError(format!(
                        "Failed to read response body: {}",
                        e
                    ))));
                    return;
                }
            }
        }

        handler.on_complete(Ok(HttpResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<u32>,
        progress: Mutex<Vec<String>>,
        complete: Mutex<Vec<Result<HttpResponse, String>>>,
    }

    impl ResponseHandler for Recorder {
        fn on_sent(&self) {
            *self.sent.lock().unwrap() += 1;
        }

        fn on_progress(&self, content: &str, _bytes_received: u64) {
            self.progress.lock().unwrap().push(content.to_string());
        }

        fn on_complete(&self, outcome: Result<HttpResponse, LlmError>) {
            self.complete.lock().unwrap().push(outcome.map_err(|e| e.to_string()));
        }
    }

    #[tokio::test]
    async fn test_post_with_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(header("Content-Type", "application/json"))
            .and(body_json(serde_json::json!({"model": "gpt-4"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(TransportConfig::default()).unwrap();
        let recorder = Arc::new(Recorder::default());
        let request = HttpRequest::json_post(
            format!("{}/v1/chat/completions", server.uri()),
            "test-key",
            "{\"model\":\"gpt-4\"}".to_string(),
        );

        transport.execute(request, recorder.clone()).await;

        assert_eq!(*recorder.sent.lock().unwrap(), 1);
        assert!(recorder.progress.lock().unwrap().is_empty());
        let complete = recorder.complete.lock().unwrap();
        assert_eq!(complete.len(), 1);
        assert_eq!(complete[0], Ok(HttpResponse::new(200, "{\"ok\":true}")));
    }

    #[tokio::test]
    async fn test_progress_reports_cumulative_body() {
        let server = MockServer::start().await;
        let body = "data: {\"a\":1}\n\ndata: [DONE]\n\n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(TransportConfig::default()).unwrap();
        let recorder = Arc::new(Recorder::default());
        let request = HttpRequest::json_post(server.uri(), "k", String::new()).with_progress(true);

        transport.execute(request, recorder.clone()).await;

        let progress = recorder.progress.lock().unwrap();
        assert!(!progress.is_empty());
        assert_eq!(progress.last().map(String::as_str), Some(body));
        assert_eq!(recorder.complete.lock().unwrap()[0], Ok(HttpResponse::new(200, body)));
    }

    #[tokio::test]
    async fn test_error_status_is_passed_through() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("{\"error\":{}}"))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::new(TransportConfig::default()).unwrap();
        let recorder = Arc::new(Recorder::default());
        transport
            .execute(HttpRequest::json_post(server.uri(), "k", String::new()), recorder.clone())
            .await;

        let complete = recorder.complete.lock().unwrap();
        let response = complete[0].as_ref().unwrap();
        assert_eq!(response.status, 401);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let transport = ReqwestTransport::new(TransportConfig::default().with_connect_timeout(500)).unwrap();
        let recorder = Arc::new(Recorder::default());

        // Port 9 (discard) is closed on test machines
        transport
            .execute(HttpRequest::json_post("http://127.0.0.1:9/", "k", String::new()), recorder.clone())
            .await;

        let complete = recorder.complete.lock().unwrap();
        assert_eq!(complete.len(), 1);
        assert!(complete[0].as_ref().unwrap_err().contains("HTTP request failed"));
    }

    #[test]
    fn test_request_headers() {
        let request = HttpRequest::json_post("http://x", "sk-1", String::new());
        assert_eq!(request.header("authorization"), Some("Bearer sk-1"));
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert!(!request.stream_progress);
    }
}
