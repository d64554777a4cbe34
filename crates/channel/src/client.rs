//! iQmetrix REST client.
//!
//! Every iQmetrix service lives on its own host
//! (`{protocol}://{service}{environment}.iqmetrix.net`). The client resolves
//! the host per call, attaches the bearer token, and decodes JSON bodies.
//! Non-success statuses become [`ChannelError::Status`] so handlers can use
//! `?` and let the error taxonomy pick the hub status.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::instrument;

use crate::config::ChannelConfig;
use crate::error::ChannelError;

/// iQmetrix service hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Crm,
    Catalogs,
    ProductLibrary,
    Availability,
    Pricing,
    Order,
    SalesOrder,
    OrderManagementReporting,
}

impl Service {
    pub const ALL: [Self; 8] = [
        Self::Crm,
        Self::Catalogs,
        Self::ProductLibrary,
        Self::Availability,
        Self::Pricing,
        Self::Order,
        Self::SalesOrder,
        Self::OrderManagementReporting,
    ];

    /// Host prefix for the service.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crm => "crm",
            Self::Catalogs => "catalogs",
            Self::ProductLibrary => "productlibrary",
            Self::Availability => "availability",
            Self::Pricing => "pricing",
            Self::Order => "order",
            Self::SalesOrder => "salesorder",
            Self::OrderManagementReporting => "ordermanagementreporting",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A successful vendor response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// Decoded JSON body (`Null` when the body was empty).
    pub body: Value,
}

/// iQmetrix API client.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct DropshipClient {
    inner: Arc<DropshipClientInner>,
}

struct DropshipClientInner {
    client: reqwest::Client,
    config: Arc<ChannelConfig>,
}

impl DropshipClient {
    /// Create a new client for the configured environment.
    ///
    /// # Errors
    ///
    /// Returns error if the access token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: Arc<ChannelConfig>) -> Result<Self, ChannelError> {
        let mut headers = HeaderMap::new();

        let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", config.expose_token()))
            .map_err(|e| ChannelError::InvalidPayload(format!("Invalid access token format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(DropshipClientInner { client, config }),
        })
    }

    /// Configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &ChannelConfig {
        &self.inner.config
    }

    /// Full URL for a path on a service host.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Config` if the base URL cannot be built.
    pub fn url(&self, service: Service, path: &str) -> Result<String, ChannelError> {
        let base = self.inner.config.base_url(service.name())?;
        Ok(format!("{}{path}", base.as_str().trim_end_matches('/')))
    }

    /// Execute a GET request.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn get(
        &self,
        service: Service,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Reply, ChannelError> {
        self.send(Method::GET, service, path, query, None).await
    }

    /// Execute a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn post(&self, service: Service, path: &str, body: &Value) -> Result<Reply, ChannelError> {
        self.send(Method::POST, service, path, &[], Some(body)).await
    }

    /// Execute a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError` on transport failure, non-success status, or an
    /// undecodable body.
    pub async fn put(&self, service: Service, path: &str, body: &Value) -> Result<Reply, ChannelError> {
        self.send(Method::PUT, service, path, &[], Some(body)).await
    }

    #[instrument(skip(self, query, body), fields(service = %service))]
    async fn send(
        &self,
        method: Method,
        service: Service,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Reply, ChannelError> {
        let url = self.url(service, path)?;
        let started = Instant::now();

        let mut response = self.request(&method, &url, query, body).send().await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS
            && let Some(sleep) = self.inner.config.rate_limit_sleep
        {
            let wait = retry_after(response.headers()).unwrap_or(sleep);
            tracing::warn!(
                wait_secs = wait.as_secs(),
                "Request was throttled, retrying once"
            );
            tokio::time::sleep(wait).await;
            response = self.request(&method, &url, query, body).send().await?;
        }

        let status = response.status();
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            method = %method,
            url = %url,
            status = status.as_u16(),
            elapsed_ms,
            "request completed in {elapsed_ms} milliseconds"
        );

        let text = response.text().await?;

        if !status.is_success() {
            return Err(ChannelError::Status {
                method: method.to_string(),
                url,
                status: status.as_u16(),
                body: text,
            });
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)
                .map_err(|e| ChannelError::UnexpectedResponse(format!("{method} {url}: {e}")))?
        };

        Ok(Reply {
            status: status.as_u16(),
            body,
        })
    }

    fn request(
        &self,
        method: &Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> reqwest::RequestBuilder {
        let mut request = self.inner.client.request(method.clone(), url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
