//! Checkout flow: customer, order, charge

use crate::Gateway;
use crate::cart::Cart;
use crate::classify::classify;
use crate::customer::CustomerResolver;
use crate::error::{GatewayError, GatewayResult, reference_code};
use crate::money::is_supported;
use crate::order::OrderBuilder;
use crate::payment::PaymentProcessor;
use crate::provider::ProcessorApi;
use crate::remote::{RemoteOrder, RemotePayment};
use crate::store::LocalStore;
use crate::types::*;
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Checkout submission
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Pending local order created by the caller
    pub order_id: u64,
    pub cart: Cart,
    pub profile: CustomerProfile,
    /// Payment-method token from the card form
    pub source_token: String,
}

/// Successful checkout
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: LocalOrder,
    pub customer: LocalCustomer,
    pub remote_order: RemoteOrder,
    pub payment: RemotePayment,
}

impl<P: ProcessorApi, S: LocalStore> Gateway<P, S> {
    /// Charge a cart against a pending local order
    pub async fn checkout(&self, request: CheckoutRequest) -> GatewayResult<CheckoutOutcome> {
        let CheckoutRequest {
            order_id,
            cart,
            profile,
            source_token,
        } = request;
        let config = self.config();

        if !is_supported(&cart.currency, &config.merchant_currency) {
            return Err(GatewayError::UnsupportedCurrency {
                currency: cart.currency.to_uppercase(),
                merchant: config.merchant_currency.clone(),
            });
        }
        cart.validate()?;

        let mut order = self
            .store()
            .get_order(order_id)
            .await?
            .ok_or(GatewayError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(GatewayError::InvalidOrderState {
                id: order_id,
                state: order.status.as_str().to_string(),
            });
        }
        if order.mode != config.mode {
            return Err(GatewayError::Config(format!(
                "order {} was created in {} mode, gateway runs in {} mode",
                order_id, order.mode, config.mode
            )));
        }

        let resolver = CustomerResolver::new(self.processor(), self.store(), config.mode);
        let (customer, remote_customer_id) = resolver.resolve(&profile).await?;

        let catalog = self.discount_catalog(&cart).await?;
        let mut builder = OrderBuilder::from_config(config);
        if let Some(transform) = &self.order_transform {
            let transform = transform.clone();
            builder = builder.with_transform(move |req| transform(req));
        }
        let order_request = builder.build(
            &cart,
            Some(&remote_customer_id),
            Some(&order_id.to_string()),
            &catalog,
        )?;
        let expected_total = order_request.expected_total();

        let remote_order = match self.processor().create_order(order_request).await {
            Ok(remote_order) => remote_order,
            Err(errors) => {
                let reference = reference_code();
                let classification = classify(errors.first_code());
                warn!(reference = %reference, order = order_id, code = ?classification.code, "Order creation failed");
                debug!(reference = %reference, errors = %errors, "Processor error detail");
                return Err(GatewayError::OrderCreationFailed {
                    reference,
                    message: classification.message.to_string(),
                    errors,
                });
            }
        };

        if remote_order.total_money.amount != expected_total {
            warn!(
                order = order_id,
                remote_order = %remote_order.id,
                expected = expected_total,
                reported = remote_order.total_money.amount,
                "Processor order total differs from local total"
            );
        }

        let payment = PaymentProcessor::new(self.processor(), config)
            .with_transform(self.payment_transform.clone())
            .charge(&remote_order, &source_token, Some(&profile))
            .await?;

        order.gateway_transaction_id = Some(payment.id.clone());
        order.customer_id = Some(customer.id);
        order.status = OrderStatus::Processing;
        if let Err(source) = self.store().update_order(&order).await {
            let reference = reference_code();
            error!(
                target: "armature_gateway::reconcile",
                reference = %reference,
                order = order_id,
                payment = %payment.id,
                error = %source,
                "Payment captured but local order was not updated"
            );
            return Err(GatewayError::Persistence {
                reference,
                context: format!("order {} payment {}", order_id, payment.id),
                source,
            });
        }

        info!(order = order_id, payment = %payment.id, remote_order = %remote_order.id, "Checkout complete");
        Ok(CheckoutOutcome {
            order,
            customer,
            remote_order,
            payment,
        })
    }

    /// Resolve every discount code used in the cart; vanished codes are absent
    async fn discount_catalog(&self, cart: &Cart) -> GatewayResult<HashMap<String, Discount>> {
        let mut catalog = HashMap::new();
        for code in cart.discount_codes() {
            if let Some(discount) = self.store().find_discount(&code).await? {
                catalog.insert(code, discount);
            }
        }
        Ok(catalog)
    }
}
