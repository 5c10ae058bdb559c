//! Payment Gateway Module for Armature Framework
//!
//! Connects a storefront's carts, orders and refunds to a remote card
//! processor. Carts are translated into itemized processor orders, charged
//! with a tokenized card, and refunds issued locally are reconciled back to
//! the processor.
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Payment Gateway                           │
//! │                                                                  │
//! │  ┌──────────────────────────────────────────────────────────┐  │
//! │  │                      Gateway API                          │  │
//! │  │              checkout()   |   refund()                    │  │
//! │  └──────────────────────────────────────────────────────────┘  │
//! │                            │                                    │
//! │         ┌──────────────────┼──────────────────┐                │
//! │         ▼                  ▼                  ▼                │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────┐          │
//! │  │  Customer  │    │   Order    │    │  Payment   │          │
//! │  │  Resolver  │    │  Builder   │    │ Processor  │          │
//! │  └────────────┘    └────────────┘    └────────────┘          │
//! │         │                  │                  │                │
//! │         ▼                  ▼                  ▼                │
//! │  ┌──────────────────┐    ┌──────────────────────────────┐     │
//! │  │    LocalStore    │    │  ProcessorApi (Square, ...)  │     │
//! │  └──────────────────┘    └──────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use armature_gateway::{Gateway, GatewayConfig, MemoryStore, SquareProvider};
//!
//! dotenvy::dotenv().ok();
//! let config = GatewayConfig::from_env("ARMATURE_GATEWAY")?;
//! let gateway = Gateway::new(SquareProvider::new(&config)?, Arc::new(MemoryStore::new()), config)?;
//!
//! let outcome = gateway.checkout(CheckoutRequest {
//!     order_id: 1042,
//!     cart,
//!     profile: CustomerProfile::new("ada@example.com", "Ada Lovelace"),
//!     source_token: "cnon:card-nonce-ok".into(),
//! }).await?;
//!
//! // Later, when the store issues a refund
//! gateway.refund(&RefundRecord::new(77, 1042, dec!(-49.99))).await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod classify;
pub mod config;
pub mod customer;
pub mod error;
pub mod money;
pub mod order;
pub mod payment;
pub mod provider;
pub mod refund;
pub mod remote;
pub mod store;
pub mod types;

pub mod providers;

pub use cart::*;
pub use checkout::*;
pub use classify::*;
pub use config::*;
pub use customer::*;
pub use error::*;
pub use money::*;
pub use order::*;
pub use payment::*;
pub use provider::*;
pub use refund::*;
pub use remote::*;
pub use store::*;
pub use types::*;

#[cfg(feature = "square")]
pub use providers::SquareProvider;

use std::sync::Arc;
use tracing::info;

/// Main gateway
///
/// Owns the processor client, the local store handle and the configuration
/// for one mode. Clones share all three.
pub struct Gateway<P: ProcessorApi, S: LocalStore> {
    processor: Arc<P>,
    store: Arc<S>,
    config: Arc<GatewayConfig>,
    order_transform: Option<OrderTransform>,
    payment_transform: Option<PaymentTransform>,
}

impl<P: ProcessorApi, S: LocalStore> Gateway<P, S> {
    /// Create a new gateway; the configuration is validated first
    pub fn new(processor: P, store: Arc<S>, config: GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;
        info!(
            gateway = processor.name(),
            mode = %config.mode,
            location = %config.location_id,
            currency = %config.merchant_currency,
            "Payment gateway initialized"
        );
        Ok(Self {
            processor: Arc::new(processor),
            store,
            config: Arc::new(config),
            order_transform: None,
            payment_transform: None,
        })
    }

    /// Transform every order request right before submission
    pub fn with_order_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(CreateOrderRequest) -> CreateOrderRequest + Send + Sync + 'static,
    {
        self.order_transform = Some(Arc::new(transform));
        self
    }

    /// Transform every payment request right before submission
    pub fn with_payment_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(CreatePaymentRequest) -> CreatePaymentRequest + Send + Sync + 'static,
    {
        self.payment_transform = Some(Arc::new(transform));
        self
    }

    /// Get the processor
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Get the local store
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Reconcile a locally issued refund with the processor
    pub async fn refund(&self, refund: &RefundRecord) -> GatewayResult<RefundOutcome> {
        let order = self
            .store
            .get_order(refund.order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(refund.order_id))?;
        self.refund_order(&order, refund).await
    }

    /// Reconcile a refund against an order the caller already loaded
    pub async fn refund_order(
        &self,
        order: &LocalOrder,
        refund: &RefundRecord,
    ) -> GatewayResult<RefundOutcome> {
        RefundReconciler::new(self.processor(), self.store())
            .refund(order, refund)
            .await
    }
}

impl<P: ProcessorApi, S: LocalStore> Clone for Gateway<P, S> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
            order_transform: self.order_transform.clone(),
            payment_transform: self.payment_transform.clone(),
        }
    }
}
