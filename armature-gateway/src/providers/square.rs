//! Square processor implementation

use crate::{
    config::GatewayConfig,
    error::ApiResult,
    provider::{ProcessorApi, ProviderClient},
    remote::*,
    types::Mode,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Production API host
pub const LIVE_BASE_URL: &str = "https://connect.squareup.com";
/// Sandbox API host
pub const SANDBOX_BASE_URL: &str = "https://connect.squareupsandbox.com";
/// Header pinning the API version
pub const VERSION_HEADER: &str = "Square-Version";

/// Square provider
pub struct SquareProvider {
    client: ProviderClient,
}

impl SquareProvider {
    /// Create a provider for the configured mode
    pub fn new(config: &GatewayConfig) -> ApiResult<Self> {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| Self::default_base_url(config.mode).to_string());
        let token = config.access_token.expose_secret().to_string();
        let client = ProviderClient::new(base_url, SecretString::new(token.into_boxed_str()), config.timeout)?
            .with_api_version(VERSION_HEADER, &config.api_version);
        Ok(Self { client })
    }

    pub fn default_base_url(mode: Mode) -> &'static str {
        match mode {
            Mode::Live => LIVE_BASE_URL,
            Mode::Sandbox => SANDBOX_BASE_URL,
        }
    }

    pub fn base_url(&self) -> &str {
        self.client.base_url()
    }
}

/// `/v2/orders/{id}` with the id encoded as one path segment
fn order_path(id: &str) -> ApiResult<String> {
    let mut url = Url::parse(LIVE_BASE_URL)?;
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.clear().extend(["v2", "orders", id]);
    }
    Ok(url.path().to_string())
}

#[async_trait]
impl ProcessorApi for SquareProvider {
    fn name(&self) -> &'static str {
        "square"
    }

    async fn create_customer(&self, request: CreateCustomerRequest) -> ApiResult<RemoteCustomer> {
        let response: CustomerResponse = self.client.post("/v2/customers", &request).await?;
        Ok(response.customer)
    }

    async fn create_order(&self, request: CreateOrderRequest) -> ApiResult<RemoteOrder> {
        debug!(
            line_items = request.order.line_items.len(),
            discounts = request.order.discounts.len(),
            taxes = request.order.taxes.len(),
            "Creating Square order"
        );
        let response: OrderResponse = self.client.post("/v2/orders", &request).await?;
        Ok(response.order)
    }

    async fn get_order(&self, id: &str) -> ApiResult<RemoteOrder> {
        let response: OrderResponse = self.client.get(&order_path(id)?).await?;
        Ok(response.order)
    }

    async fn update_order(
        &self,
        id: &str,
        version: i64,
        patch: OrderPatch,
    ) -> ApiResult<RemoteOrder> {
        let body = UpdateOrderBody {
            order: VersionedPatch { version, patch },
            idempotency_key: idempotency_key(),
        };
        let response: OrderResponse = self.client.put(&order_path(id)?, &body).await?;
        Ok(response.order)
    }

    async fn create_payment(&self, request: CreatePaymentRequest) -> ApiResult<RemotePayment> {
        let response: PaymentResponse = self.client.post("/v2/payments", &request).await?;
        Ok(response.payment)
    }

    async fn create_refund(&self, request: CreateRefundRequest) -> ApiResult<RemoteRefund> {
        let response: RefundResponse = self.client.post("/v2/refunds", &request).await?;
        Ok(response.refund)
    }
}

// Square API types

#[derive(Debug, Deserialize)]
struct CustomerResponse {
    customer: RemoteCustomer,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    order: RemoteOrder,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    payment: RemotePayment,
}

#[derive(Debug, Deserialize)]
struct RefundResponse {
    refund: RemoteRefund,
}

#[derive(Debug, Serialize)]
struct UpdateOrderBody {
    order: VersionedPatch,
    idempotency_key: String,
}

#[derive(Debug, Serialize)]
struct VersionedPatch {
    version: i64,
    #[serde(flatten)]
    patch: OrderPatch,
}
