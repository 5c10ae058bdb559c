//! Charging a remote order
//!
//! A failed charge must not leave the remote order open: the order is
//! re-fetched for its current version and canceled before the error is
//! returned.

use crate::classify::classify;
use crate::config::{ApplicationFeePolicy, GatewayConfig};
use crate::error::{GatewayError, GatewayResult, ProcessorErrors, reference_code};
use crate::money::Money;
use crate::provider::ProcessorApi;
use crate::remote::*;
use crate::types::CustomerProfile;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Pre-submit transform applied to a finished payment request
pub type PaymentTransform =
    Arc<dyn Fn(CreatePaymentRequest) -> CreatePaymentRequest + Send + Sync>;

/// Submits charges against processor orders
pub struct PaymentProcessor<'a, P: ?Sized> {
    processor: &'a P,
    location_id: &'a str,
    application_fee: ApplicationFeePolicy,
    transform: Option<PaymentTransform>,
}

impl<'a, P: ProcessorApi + ?Sized> PaymentProcessor<'a, P> {
    pub fn new(processor: &'a P, config: &'a GatewayConfig) -> Self {
        Self {
            processor,
            location_id: &config.location_id,
            application_fee: config.application_fee,
            transform: None,
        }
    }

    /// Set the pre-submit transform
    pub fn with_transform(mut self, transform: Option<PaymentTransform>) -> Self {
        self.transform = transform;
        self
    }

    /// Build the payment request for an order
    pub fn payment_request(
        &self,
        order: &RemoteOrder,
        source_token: &str,
        billing: Option<&CustomerProfile>,
    ) -> CreatePaymentRequest {
        let amount = order.total_money.clone();
        let app_fee = self
            .application_fee
            .fee_for(amount.amount)
            .map(|fee| Money::new(fee, amount.currency.clone()));

        let request = CreatePaymentRequest {
            idempotency_key: idempotency_key(),
            source_id: source_token.to_string(),
            amount_money: amount,
            order_id: order.id.clone(),
            location_id: self.location_id.to_string(),
            autocomplete: true,
            customer_id: order.customer_id.clone(),
            app_fee_money: app_fee,
            billing_address: billing
                .and_then(|p| p.billing_address.as_ref())
                .map(RemoteAddress::from),
            buyer_email_address: billing
                .map(|p| p.email.clone())
                .filter(|email| !email.is_empty()),
            buyer_phone_number: billing.and_then(|p| p.phone.clone()),
            reference_id: None,
        };

        match &self.transform {
            Some(transform) => transform(request),
            None => request,
        }
    }

    /// Charge a remote order
    pub async fn charge(
        &self,
        order: &RemoteOrder,
        source_token: &str,
        billing: Option<&CustomerProfile>,
    ) -> GatewayResult<RemotePayment> {
        let request = self.payment_request(order, source_token, billing);
        let amount = request.amount_money.clone();

        match self.processor.create_payment(request).await {
            Ok(payment) => {
                info!(order = %order.id, payment = %payment.id, amount = %amount, "Payment created");
                Ok(payment)
            }
            Err(errors) => Err(self.fail(order, errors).await),
        }
    }

    async fn fail(&self, order: &RemoteOrder, errors: ProcessorErrors) -> GatewayError {
        let reference = reference_code();
        let classification = classify(errors.first_code());
        warn!(
            reference = %reference,
            order = %order.id,
            code = ?classification.code,
            kind = ?classification.kind,
            "Payment failed"
        );
        debug!(reference = %reference, errors = %errors, "Processor error detail");

        self.cancel_order(order, &reference).await;

        GatewayError::PaymentFailed {
            reference,
            message: classification.message.to_string(),
            errors,
        }
    }

    /// Cancel the order at its current version; exactly one update call
    async fn cancel_order(&self, order: &RemoteOrder, reference: &str) {
        let version = match self.processor.get_order(&order.id).await {
            Ok(current) => current.version,
            Err(errors) => {
                warn!(
                    reference = %reference,
                    order = %order.id,
                    errors = %errors,
                    "Could not refresh order before cancel, using creation version"
                );
                order.version
            }
        };

        let patch = OrderPatch::cancel(self.location_id);
        match self.processor.update_order(&order.id, version, patch).await {
            Ok(canceled) => {
                info!(reference = %reference, order = %canceled.id, state = ?canceled.state, "Canceled order after failed payment");
            }
            Err(errors) => {
                error!(
                    target: "armature_gateway::reconcile",
                    reference = %reference,
                    order = %order.id,
                    version,
                    errors = %errors,
                    "Remote order left open after failed payment"
                );
            }
        }
    }
}
