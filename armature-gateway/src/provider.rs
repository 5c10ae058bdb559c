//! Processor API trait and shared HTTP client

use crate::error::{ApiResult, ProcessorError, ProcessorErrors};
use crate::remote::*;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Processor API
///
/// Implement this trait for each payment gateway. Every call is a single
/// remote request; implementations must not retry on their own.
#[async_trait]
pub trait ProcessorApi: Send + Sync {
    /// Gateway name recorded on local transactions
    fn name(&self) -> &'static str;

    /// Create a customer
    async fn create_customer(&self, request: CreateCustomerRequest) -> ApiResult<RemoteCustomer>;

    /// Create an order
    async fn create_order(&self, request: CreateOrderRequest) -> ApiResult<RemoteOrder>;

    /// Fetch an order
    async fn get_order(&self, id: &str) -> ApiResult<RemoteOrder>;

    /// Apply a sparse update at a given order version
    async fn update_order(&self, id: &str, version: i64, patch: OrderPatch)
    -> ApiResult<RemoteOrder>;

    /// Create a payment
    async fn create_payment(&self, request: CreatePaymentRequest) -> ApiResult<RemotePayment>;

    /// Refund a payment
    async fn create_refund(&self, request: CreateRefundRequest) -> ApiResult<RemoteRefund>;
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    errors: Vec<ProcessorError>,
}

/// Common HTTP client for providers
///
/// One client per mode and request scope; it owns its connection pool and
/// holds no global state.
pub struct ProviderClient {
    client: reqwest::Client,
    base_url: String,
    access_token: SecretString,
    version_header: Option<(&'static str, String)>,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(
        base_url: impl Into<String>,
        access_token: SecretString,
        timeout: Duration,
    ) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("armature-gateway/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            version_header: None,
        })
    }

    /// Pin the processor API version, sent as `header` on every request
    pub fn with_api_version(mut self, header: &'static str, version: impl Into<String>) -> Self {
        self.version_header = Some((header, version.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.send(self.client.get(self.url(path))).await
    }

    /// POST request with JSON body
    pub async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(self.client.post(self.url(path)).json(body)).await
    }

    /// PUT request with JSON body
    pub async fn put<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        self.send(self.client.put(self.url(path)).json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let mut request = request.bearer_auth(self.access_token.expose_secret());
        if let Some((header, version)) = &self.version_header {
            request = request.header(*header, version);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_success() {
            return Ok(serde_json::from_slice(&body)?);
        }

        debug!(
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "Processor returned an error response"
        );

        let envelope: ErrorEnvelope = serde_json::from_slice(&body).unwrap_or_default();
        if envelope.errors.is_empty() {
            return Err(ProcessorErrors::single(ProcessorError {
                category: "API_ERROR".to_string(),
                ..ProcessorError::new(
                    status_code(status),
                    status.canonical_reason().unwrap_or("unexpected status"),
                )
            }));
        }
        Err(ProcessorErrors(envelope.errors))
    }
}

/// Error code for a bare HTTP status with no error body
fn status_code(status: reqwest::StatusCode) -> String {
    match status.as_u16() {
        401 => "UNAUTHORIZED".to_string(),
        403 => "FORBIDDEN".to_string(),
        429 => "RATE_LIMITED".to_string(),
        503 => "SERVICE_UNAVAILABLE".to_string(),
        504 => "GATEWAY_TIMEOUT".to_string(),
        code => format!("HTTP_{code}"),
    }
}
