use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::TransportError;

/// Opaque request/reply channel to the game server.
///
/// `service` and `method` form the logical address of the call. The body
/// and the reply are plain JSON documents; the claim client owns their shape.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        service: &str,
        method: &str,
        body: Value,
    ) -> Result<Value, TransportError>;
}

/// JSON-over-HTTP transport. Each call is `POST {base_url}/{service}/{method}`
/// and is bounded by the client timeout.
pub struct HttpTransport {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn endpoint(&self, service: &str, method: &str) -> String {
        format!("{}/{}/{}", self.base_url, service, method)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Unreachable(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        service: &str,
        method: &str,
        body: Value,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint(service, method);
        debug!(%url, "Sending request");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                method: method.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_address() {
        let transport =
            HttpTransport::new("http://game.local/rpc/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.endpoint("gamepb.emailpb.EmailService", "GetEmailList"),
            "http://game.local/rpc/gamepb.emailpb.EmailService/GetEmailList"
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 1 is reserved and refuses connections on loopback.
        let transport =
            HttpTransport::new("http://127.0.0.1:1", Duration::from_millis(500)).unwrap();
        let result = transport
            .send("svc", "Method", serde_json::json!({}))
            .await;
        assert!(matches!(
            result,
            Err(TransportError::Unreachable(_)) | Err(TransportError::Timeout(_))
        ));
    }
}
