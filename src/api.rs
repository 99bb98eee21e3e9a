use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use crate::errors::{CliError, with_debug_hint};

/// HTTP client for the chat proxy and remote catalogs.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: String,
    debug: bool,
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub elapsed_ms: u128,
    pub json: Value,
}

impl ApiClient {
    pub fn new(endpoint: String, timeout_ms: u64, debug: bool) -> Result<Self, CliError> {
        let timeout = Duration::from_millis(timeout_ms.max(1));
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            debug,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `body` to the proxy endpoint. Sent exactly once.
    pub async fn post_json(&self, body: &Value) -> Result<ApiResponse, CliError> {
        let started = Instant::now();
        let request = self.client.post(&self.endpoint).json(body);
        tracing::debug!(endpoint = %self.endpoint, "posting chat request");
        let response = request.send().await.map_err(|err| self.network_error(err))?;
        self.finish(response, started).await
    }

    pub async fn get_json(&self, url: &str) -> Result<ApiResponse, CliError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| self.network_error(err))?;
        self.finish(response, started).await
    }

    async fn finish(
        &self,
        response: reqwest::Response,
        started: Instant,
    ) -> Result<ApiResponse, CliError> {
        let status = response.status();
        let text = response.text().await.map_err(|err| {
            tracing::warn!(status = status.as_u16(), error = %err, "reading response body failed");
            self.network_error(err)
        })?;

        let parsed = if text.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({ "raw": text }))
        };

        if status.is_success() {
            return Ok(ApiResponse {
                elapsed_ms: started.elapsed().as_millis(),
                json: parsed,
            });
        }

        Err(self.http_error(status, parsed))
    }

    fn network_error(&self, err: reqwest::Error) -> CliError {
        let message = if err.is_timeout() {
            "Request timed out.".to_string()
        } else {
            format!("Network request failed: {err}")
        };
        CliError::Network(with_debug_hint(&message, self.debug))
    }

    fn http_error(&self, status: StatusCode, payload: Value) -> CliError {
        let mut details = error_message(&payload)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

        if self.debug {
            details.push_str(&format!(" payload={payload}"));
        }

        match status.as_u16() {
            400 => CliError::Usage(details),
            401 | 403 => CliError::Auth(details),
            429 => CliError::RateLimited(details),
            500..=599 => CliError::Server(details),
            _ => CliError::Generic(details),
        }
    }
}

/// Proxies report failures as `{"error": "..."}` or OpenAI-style `{"error": {"message": "..."}}`.
fn error_message(payload: &Value) -> Option<String> {
    let error = payload.get("error");
    error
        .and_then(|v| v.as_str())
        .or_else(|| error.and_then(|v| v.get("message")).and_then(|v| v.as_str()))
        .or_else(|| payload.get("message").and_then(|v| v.as_str()))
        .map(|s| s.to_string())
}


#[cfg(test)]
mod tests {
    use super::test_server::{serve_once, serve_truncated};
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn server_error_maps_to_server_variant_with_message() {
        let url = serve_once(
            "500 Internal Server Error",
            r#"{"error":{"message":"upstream exploded"}}"#,
        )
        .await;
        let api = ApiClient::new(url, 5_000, false).unwrap();
        let err = api.post_json(&json!({"model": "m"})).await.unwrap_err();
        match err {
            CliError::Server(msg) => assert_eq!(msg, "upstream exploded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn status_without_message_is_described() {
        let url = serve_once("429 Too Many Requests", "").await;
        let api = ApiClient::new(url, 5_000, false).unwrap();
        let err = api.post_json(&json!({})).await.unwrap_err();
        assert!(matches!(err, CliError::RateLimited(ref m) if m == "Request failed with status 429"));
    }

    #[tokio::test]
    async fn success_keeps_non_json_body_as_raw() {
        let url = serve_once("200 OK", "not json").await;
        let api = ApiClient::new(url, 5_000, false).unwrap();
        let res = api.post_json(&json!({})).await.unwrap();
        assert_eq!(res.json, json!({ "raw": "not json" }));
    }

    #[tokio::test]
    async fn cut_off_body_is_network_error() {
        let url = serve_truncated(r#"{"choices":[{"message""#).await;
        let api = ApiClient::new(url, 5_000, false).unwrap();
        let err = api.post_json(&json!({})).await.unwrap_err();
        assert!(matches!(err, CliError::Network(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let api = ApiClient::new(format!("http://{addr}/"), 2_000, true).unwrap();
        let err = api.post_json(&json!({})).await.unwrap_err();
        assert!(matches!(err, CliError::Network(_)));
    }
}
