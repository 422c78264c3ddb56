//! HTTP executor - make HTTP requests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{ExecutionContext, Executor};
use crate::error::{Error, Result};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP request executor.
///
/// The long-running executor of the built-in set: the request races the
/// run's cancel signal, so a stop request aborts the in-flight call instead
/// of waiting out the network timeout.
pub struct HttpExecutor {
    client: Client,
}

impl HttpExecutor {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(DEFAULT_HTTP_CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout defaults: {}", e);
                Client::new()
            });
        Self { client }
    }
}

impl Default for HttpExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct HttpConfig {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: Option<Value>,
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
    /// Return raw text instead of parsing JSON
    #[serde(default)]
    raw_response: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

#[async_trait]
impl Executor for HttpExecutor {
    fn node_type(&self) -> &str {
        "http"
    }

    fn description(&self) -> &str {
        "Make an HTTP request"
    }

    async fn execute(&self, ctx: &ExecutionContext) -> Result<Value> {
        let config: HttpConfig = serde_json::from_value(ctx.data().clone())
            .map_err(|e| Error::Node(format!("Invalid http config: {}", e)))?;

        validate_url(&config.url)?;

        let method = reqwest::Method::from_bytes(config.method.to_uppercase().as_bytes())
            .map_err(|_| Error::Node(format!("Invalid HTTP method: {}", config.method)))?;

        let mut request = self.client.request(method, &config.url);

        if let Some(timeout_seconds) = config.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout_seconds.max(1)));
        }

        if let Some(Value::Object(headers)) = &config.headers {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    request = request.header(name, value);
                }
            }
        }

        if let Some(body) = &config.body {
            request = request.json(body);
        }

        debug!("HTTP node '{}' requesting {}", ctx.node.id, config.url);

        // Race the request against the run's cancel signal.
        let response = tokio::select! {
            result = request.send() => result
                .map_err(|e| Error::Node(format!("HTTP request failed: {}", e)))?,
            _ = ctx.run.cancel().cancelled() => return Err(Error::Cancelled),
        };

        let status = response.status();
        let body = tokio::select! {
            result = response.text() => result
                .map_err(|e| Error::Node(format!("Failed to read response body: {}", e)))?,
            _ = ctx.run.cancel().cancelled() => return Err(Error::Cancelled),
        };

        if !status.is_success() {
            return Err(Error::Node(format!(
                "HTTP request to {} returned status {}",
                config.url,
                status.as_u16()
            )));
        }

        let body_value = if config.raw_response {
            Value::String(body)
        } else {
            serde_json::from_str(&body).unwrap_or(Value::String(body))
        };

        Ok(json!({
            "status": status.as_u16(),
            "body": body_value,
        }))
    }
}

/// Only http and https URLs are dispatched.
fn validate_url(url: &str) -> Result<()> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::Node(format!("Invalid URL '{}': {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::Node(format!(
            "Unsupported URL scheme '{}'. Only http and https are allowed.",
            scheme
        ))),
    }
}
