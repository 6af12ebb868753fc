//! Network seams used by the fetcher and the tester
//!
//! The fetcher and tester talk to the network only through [`SourceClient`]
//! and [`ProbeClient`], so both can run against in-memory stubs.

use crate::proxy::models::ProxyCandidate;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Default user agent for list downloads
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// User agent sent through probed proxies
pub const PROBE_USER_AGENT: &str = "ProxyTester/1.0";

/// Anticipated probe failures. `Display` is the message stored on the result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Timeout")]
    Timeout,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("Invalid response body")]
    MalformedBody,
    #[error("{0}")]
    Connection(String),
}

/// What the IP-echo endpoint reported back through the proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReply {
    pub origin: String,
}

impl ProbeReply {
    /// Extract the `origin` field from an IP-echo JSON body
    pub fn from_json(body: &Value) -> Result<Self, ProbeError> {
        body.get("origin")
            .and_then(Value::as_str)
            .map(|origin| Self {
                origin: origin.to_string(),
            })
            .ok_or(ProbeError::MalformedBody)
    }
}

/// Downloads the raw body of a proxy list
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String>;
}

/// Sends one request through a candidate proxy
#[async_trait]
pub trait ProbeClient: Send + Sync {
    async fn probe(
        &self,
        proxy: &ProxyCandidate,
        test_url: &str,
        timeout: Duration,
    ) -> Result<ProbeReply, ProbeError>;
}

/// reqwest-backed list downloader sharing one client across sources
#[derive(Debug, Clone)]
pub struct HttpSourceClient {
    client: Client,
}

impl HttpSourceClient {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl SourceClient for HttpSourceClient {
    async fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            anyhow::bail!("HTTP status: {}", status);
        }
        Ok(response.text().await?)
    }
}

/// reqwest-backed prober. It holds no client of its own: every probe builds
/// a fresh one so no connection is shared between candidates.
#[derive(Debug, Clone)]
pub struct HttpProbeClient {
    user_agent: String,
}

impl Default for HttpProbeClient {
    fn default() -> Self {
        Self::new(PROBE_USER_AGENT)
    }
}

impl HttpProbeClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    fn client_for(&self, proxy: &ProxyCandidate, timeout: Duration) -> Result<Client, ProbeError> {
        let reqwest_proxy =
            ReqwestProxy::all(proxy.url()).map_err(|e| ProbeError::Connection(e.to_string()))?;

        Client::builder()
            .proxy(reqwest_proxy)
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ProbeError::Connection(e.to_string()))
    }
}

#[async_trait]
impl ProbeClient for HttpProbeClient {
    async fn probe(
        &self,
        proxy: &ProxyCandidate,
        test_url: &str,
        timeout: Duration,
    ) -> Result<ProbeReply, ProbeError> {
        let client = self.client_for(proxy, timeout)?;

        let response = client.get(test_url).send().await.map_err(classify)?;
        if response.status() != StatusCode::OK {
            return Err(ProbeError::Status(response.status().as_u16()));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::MalformedBody
            }
        })?;
        ProbeReply::from_json(&body)
    }
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else {
        ProbeError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probe_error_messages() {
        assert_eq!(ProbeError::Timeout.to_string(), "Timeout");
        assert_eq!(ProbeError::Status(503).to_string(), "HTTP 503");
        assert_eq!(ProbeError::MalformedBody.to_string(), "Invalid response body");
        assert_eq!(
            ProbeError::Connection("connection refused".into()).to_string(),
            "connection refused"
        );
    }

    #[test]
    fn test_reply_from_json() {
        let reply = ProbeReply::from_json(&json!({ "origin": "1.2.3.4" })).unwrap();
        assert_eq!(reply.origin, "1.2.3.4");

        assert_eq!(
            ProbeReply::from_json(&json!({ "ip": "1.2.3.4" })),
            Err(ProbeError::MalformedBody)
        );
        assert_eq!(
            ProbeReply::from_json(&json!({ "origin": 12 })),
            Err(ProbeError::MalformedBody)
        );
    }

    #[test]
    fn test_http_clients_creation() {
        assert!(HttpSourceClient::new(Duration::from_secs(5)).is_ok());
        assert_eq!(HttpProbeClient::default().user_agent, PROBE_USER_AGENT);
        assert_eq!(HttpProbeClient::new("curl/8.0").user_agent, "curl/8.0");
    }
}
