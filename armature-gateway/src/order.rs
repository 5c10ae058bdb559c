//! Cart to processor order translation
//!
//! Every cart line becomes a line item keyed by its 1-based position. Item
//! discounts, discount fees and item tax are attributed to that line. Item
//! surcharges become quantity-1 surcharge lines pointing back at their item,
//! since processors multiply line modifiers by the line quantity. Order fees
//! become order-level discounts (discount fees) or synthetic line items
//! (surcharge fees).

use crate::cart::{Cart, Fee, FeeKind};
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::money::{Money, calculate_tax};
use crate::remote::*;
use crate::types::Discount;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name given to generated tax entries
pub const TAX_NAME: &str = "Sales Tax";

/// Resolves discount codes captured in the cart
pub trait DiscountLookup {
    fn find(&self, code: &str) -> Option<&Discount>;
}

impl DiscountLookup for HashMap<String, Discount> {
    fn find(&self, code: &str) -> Option<&Discount> {
        self.get(code)
    }
}

/// Pre-submit transform applied to a finished order request
pub type OrderTransform = Arc<dyn Fn(CreateOrderRequest) -> CreateOrderRequest + Send + Sync>;

/// Builds processor order requests from carts
#[derive(Clone)]
pub struct OrderBuilder {
    location_id: String,
    plugin_version: String,
    transform: Option<OrderTransform>,
}

impl OrderBuilder {
    pub fn new(location_id: impl Into<String>, plugin_version: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            plugin_version: plugin_version.into(),
            transform: None,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(&config.location_id, &config.plugin_version)
    }

    /// Set the pre-submit transform; its output is submitted as-is
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(CreateOrderRequest) -> CreateOrderRequest + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Build the order creation request for a cart
    pub fn build(
        &self,
        cart: &Cart,
        customer_id: Option<&str>,
        reference_id: Option<&str>,
        lookup: &dyn DiscountLookup,
    ) -> GatewayResult<CreateOrderRequest> {
        let currency = cart.currency.to_uppercase();
        let money = |amount: Decimal| Money::from_decimal(amount, &currency);

        let mut line_items = Vec::with_capacity(cart.items.len());
        let mut discounts = Vec::new();
        let mut taxes = Vec::new();

        let order_discounts = cart
            .fees
            .iter()
            .filter(|fee| fee.is_order_scoped())
            .filter_map(|fee| match &fee.kind {
                FeeKind::Discount { amount } => Some((fee, *amount)),
                FeeKind::Surcharge { .. } => None,
            });
        for (n, (fee, amount)) in order_discounts.enumerate() {
            discounts.push(OrderDiscount::fixed(
                format!("order-discount-{}", n + 1),
                &fee.label,
                money(amount)?,
                Scope::Order,
            ));
        }

        let mut item_surcharges = Vec::new();
        for (index, item) in cart.items.iter().enumerate() {
            let seq = index + 1;
            let hash = item_hash(&item.id, seq);
            let mut line = LineItem {
                uid: seq.to_string(),
                name: item.name.clone(),
                quantity: item.quantity.to_string(),
                base_price_money: money(item.unit_price)?,
                variation_name: item.variant_label.clone(),
                note: None,
                applied_discounts: Vec::new(),
                applied_taxes: Vec::new(),
            };

            for (code, amount) in &item.applied_discounts {
                let Some(discount) = lookup.find(code) else {
                    warn!(code = %code, item = %item.id, "Discount code no longer resolves, skipping");
                    continue;
                };
                let uid = format!("{code}-{hash}");
                discounts.push(OrderDiscount::fixed(
                    &uid,
                    &discount.name,
                    money(*amount)?,
                    Scope::LineItem,
                ));
                line.applied_discounts.push(AppliedDiscount { discount_uid: uid });
            }

            for (n, fee) in cart.fees_for(index).enumerate() {
                match &fee.kind {
                    FeeKind::Discount { amount } => {
                        let uid = format!("fee-{hash}-{}", n + 1);
                        discounts.push(OrderDiscount::fixed(
                            &uid,
                            &fee.label,
                            money(*amount)?,
                            Scope::LineItem,
                        ));
                        line.applied_discounts.push(AppliedDiscount { discount_uid: uid });
                    }
                    FeeKind::Surcharge { amount } => {
                        item_surcharges.push((line.uid.clone(), fee, *amount));
                    }
                }
            }

            if item.tax > Decimal::ZERO {
                let uid = format!("tax-{hash}");
                taxes.push(self.line_tax(&uid, cart.tax_rate, money(item.tax)?));
                line.applied_taxes.push(AppliedTax { tax_uid: uid });
            }

            line_items.push(line);
        }

        for fee in cart.orphaned_fees() {
            warn!(
                fee = %fee.label,
                item = fee.associated_item_id.as_deref().unwrap_or_default(),
                "Fee references an item that is not in the cart, skipping"
            );
        }

        let order_surcharges = cart
            .fees
            .iter()
            .filter(|fee| fee.is_order_scoped())
            .filter_map(|fee| match &fee.kind {
                FeeKind::Surcharge { amount } => Some((fee, *amount)),
                FeeKind::Discount { .. } => None,
            });
        let mut seq = cart.items.len();
        for (item_uid, fee, amount) in item_surcharges {
            seq += 1;
            line_items.push(LineItem {
                uid: seq.to_string(),
                name: fee.label.clone(),
                quantity: "1".to_string(),
                base_price_money: money(amount)?,
                variation_name: None,
                note: Some(format!("Surcharge for line {item_uid}")),
                applied_discounts: Vec::new(),
                applied_taxes: Vec::new(),
            });
        }
        for (fee, amount) in order_surcharges {
            seq += 1;
            let line = self.fee_line(fee, amount, seq, cart.tax_rate, &currency, &mut taxes)?;
            line_items.push(line);
        }

        let mut metadata = HashMap::new();
        metadata.insert("plugin_version".to_string(), self.plugin_version.clone());
        if let Some(reference) = reference_id {
            metadata.insert("order_id".to_string(), reference.to_string());
        }

        let request = CreateOrderRequest {
            idempotency_key: idempotency_key(),
            order: OrderDraft {
                location_id: self.location_id.clone(),
                customer_id: customer_id.map(str::to_string),
                reference_id: reference_id.map(str::to_string),
                line_items,
                discounts,
                taxes,
                metadata,
            },
        };

        debug!(
            line_items = request.order.line_items.len(),
            discounts = request.order.discounts.len(),
            taxes = request.order.taxes.len(),
            "Built order request"
        );

        Ok(match &self.transform {
            Some(transform) => transform(request),
            None => request,
        })
    }

    fn line_tax(&self, uid: &str, rate: Decimal, applied: Money) -> OrderTax {
        OrderTax {
            uid: uid.to_string(),
            name: TAX_NAME.to_string(),
            tax_type: "ADDITIVE".to_string(),
            percentage: percentage(rate),
            scope: Scope::LineItem,
            applied_money: applied,
        }
    }

    fn fee_line(
        &self,
        fee: &Fee,
        amount: Decimal,
        seq: usize,
        rate: Decimal,
        currency: &str,
        taxes: &mut Vec<OrderTax>,
    ) -> GatewayResult<LineItem> {
        let hash = item_hash(&format!("fee:{}", fee.label), seq);
        let mut line = LineItem {
            uid: seq.to_string(),
            name: fee.label.clone(),
            quantity: "1".to_string(),
            base_price_money: Money::from_decimal(amount, currency)?,
            variation_name: None,
            note: None,
            applied_discounts: Vec::new(),
            applied_taxes: Vec::new(),
        };

        if fee.taxable {
            let tax = calculate_tax(amount, rate, currency);
            if tax > Decimal::ZERO {
                let uid = format!("tax-{hash}");
                taxes.push(self.line_tax(&uid, rate, Money::from_decimal(tax, currency)?));
                line.applied_taxes.push(AppliedTax { tax_uid: uid });
            }
        }
        Ok(line)
    }
}

/// Short stable hash distinguishing repeated items within one order
fn item_hash(id: &str, seq: usize) -> String {
    let digest = Sha256::digest(format!("{id}:{seq}").as_bytes());
    hex::encode(&digest[..4])
}

/// Fraction to percentage string, `0.0825` -> `"8.25"`
fn percentage(rate: Decimal) -> String {
    (rate * Decimal::ONE_HUNDRED).normalize().to_string()
}

impl CreateOrderRequest {
    /// Total the processor should report for this request, in minor units
    ///
    /// Line base price x quantity, minus discounts, plus taxes. Fractional
    /// quantities round half away from zero to the minor unit.
    pub fn expected_total(&self) -> i64 {
        let lines: i64 = self.order.line_items.iter().map(line_total).sum();
        let discounts: i64 = self.order.discounts.iter().map(|d| d.amount_money.amount).sum();
        let taxes: i64 = self.order.taxes.iter().map(|t| t.applied_money.amount).sum();
        lines - discounts + taxes
    }
}

fn line_total(line: &LineItem) -> i64 {
    let quantity = match Decimal::from_str(line.quantity.trim()) {
        Ok(quantity) => quantity,
        Err(err) => {
            warn!(uid = %line.uid, quantity = %line.quantity, error = %err, "Unparseable line quantity, counting as 1");
            Decimal::ONE
        }
    };
    let total = (Decimal::from(line.base_price_money.amount) * quantity)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    total.to_i64().unwrap_or(i64::MAX)
}
