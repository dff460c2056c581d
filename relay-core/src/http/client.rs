//! HTTP client implementation using reqwest

use crate::http::{error::map_http_error, RequestOptions};
use crate::providers::error::{ProviderError, ProviderResult};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("relay/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> ProviderResult<Self> {
        Self::with_config(Duration::from_secs(10), Duration::from_secs(30), 10)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        connect_timeout: Duration,
        request_timeout: Duration,
        max_idle_per_host: usize,
    ) -> ProviderResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client: Arc::new(client),
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// POST a JSON body, returning the parsed JSON response
    pub async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
        options: &RequestOptions,
    ) -> ProviderResult<Value> {
        let mut builder = self
            .client
            .post(url)
            .timeout(options.timeout)
            .json(body)
            .header("X-Request-ID", options.request_id.to_string());
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        self.execute(builder, options).await
    }

    /// GET a JSON resource
    pub async fn get_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        options: &RequestOptions,
    ) -> ProviderResult<Value> {
        let mut builder = self
            .client
            .get(url)
            .timeout(options.timeout)
            .header("X-Request-ID", options.request_id.to_string());
        for (key, value) in headers {
            builder = builder.header(key, value);
        }
        self.execute(builder, options).await
    }

    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        options: &RequestOptions,
    ) -> ProviderResult<Value> {
        let request_id = options.request_id;
        debug!(
            kind = options.call_kind.as_str(),
            %request_id,
            "executing upstream request"
        );

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!(%request_id, "upstream request timed out");
                ProviderError::Timeout
            } else if e.is_connect() {
                error!(%request_id, "upstream connection failed: {e}");
                ProviderError::Network(format!("connection failed: {e} [request_id: {request_id}]"))
            } else {
                error!(%request_id, "upstream request failed: {e}");
                ProviderError::Network(format!("{e} [request_id: {request_id}]"))
            }
        })?;

        let status = response.status();
        debug!(%request_id, status = status.as_u16(), "upstream response");

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!(
                %request_id,
                status = status.as_u16(),
                "upstream request failed"
            );
            return Err(map_http_error(status, body, request_id));
        }

        self.validate_content_type(&response)?;
        self.check_content_length(&response)?;

        let text = response.text().await.map_err(|e| {
            ProviderError::Network(format!(
                "failed to read response body: {e} [request_id: {request_id}]"
            ))
        })?;

        if text.len() > self.max_response_size {
            return Err(ProviderError::Parse(format!(
                "response size {} exceeds maximum {} [request_id: {request_id}]",
                text.len(),
                self.max_response_size
            )));
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(%request_id, "invalid JSON from upstream: {e}");
            ProviderError::Parse(format!("invalid response format: {e} [request_id: {request_id}]"))
        })
    }

    /// Validate response content type
    fn validate_content_type(&self, response: &reqwest::Response) -> ProviderResult<()> {
        if let Some(content_type) = response.headers().get("content-type") {
            let content_type = content_type.to_str().unwrap_or("").to_lowercase();
            if !content_type.contains("application/json") {
                return Err(ProviderError::Parse(format!(
                    "expected application/json, got: {content_type}"
                )));
            }
        }
        Ok(())
    }

    /// Check advertised response size before reading the body
    fn check_content_length(&self, response: &reqwest::Response) -> ProviderResult<()> {
        if let Some(length) = response.content_length() {
            if length as usize > self.max_response_size {
                return Err(ProviderError::Parse(format!(
                    "response size {length} exceeds maximum {}",
                    self.max_response_size
                )));
            }
        }
        Ok(())
    }
}
