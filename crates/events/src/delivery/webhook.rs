//! Outbound webhook delivery.
//!
//! [`WebhookDelivery`] POSTs a JSON body to an external URL with optional
//! extra headers. A call is a single attempt; retries are up to the caller.

use std::collections::BTreeMap;
use std::time::Duration;

/// Default HTTP request timeout for a single delivery attempt.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, bad header).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// Delivers JSON payloads to external webhook endpoints.
#[derive(Clone)]
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    /// Create a delivery service whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// POST `body` to `url` once and check the response status.
    ///
    /// Returns the 2xx status code on success.
    pub async fn send(
        &self,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: &serde_json::Value,
    ) -> Result<u16, WebhookError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            tracing::debug!(url, status, "Webhook endpoint rejected delivery");
            return Err(WebhookError::HttpStatus(status));
        }
        Ok(status)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Accept one HTTP request, answer with `status`, and hand back the raw
    /// request text.
    async fn one_shot_server(status: u16) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let text = String::from_utf8_lossy(&buf);
                if let Some(end) = text.find("\r\n\r\n") {
                    let content_length = text[..end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + content_length {
                        break;
                    }
                }
            }
            let reply = format!("HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
            socket.write_all(reply.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        });
        (url, handle)
    }

    #[tokio::test]
    async fn send_posts_json_with_headers() {
        let (url, server) = one_shot_server(204).await;
        let delivery = WebhookDelivery::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        let headers = BTreeMap::from([("X-Signature".to_string(), "abc".to_string())]);

        let status = delivery
            .send(&url, &headers, &serde_json::json!({"rule_id": 7}))
            .await
            .unwrap();
        assert_eq!(status, 204);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /hook"));
        assert!(request.to_ascii_lowercase().contains("x-signature: abc"));
        assert!(request.contains(r#"{"rule_id":7}"#));
    }

    #[tokio::test]
    async fn send_rejects_non_success_status() {
        let (url, server) = one_shot_server(502).await;
        let delivery = WebhookDelivery::new(DEFAULT_REQUEST_TIMEOUT).unwrap();

        let err = delivery
            .send(&url, &BTreeMap::new(), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, WebhookError::HttpStatus(502)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn send_reports_invalid_url_as_request_error() {
        let delivery = WebhookDelivery::new(DEFAULT_REQUEST_TIMEOUT).unwrap();
        let err = delivery
            .send("not a url", &BTreeMap::new(), &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("HTTP request failed"));
    }

    #[test]
    fn webhook_error_display_http_status() {
        let err = WebhookError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }
}
