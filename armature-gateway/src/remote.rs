//! Processor-side request and response types

use crate::money::Money;
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Generate a fresh idempotency key
pub fn idempotency_key() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Create customer request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub idempotency_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<RemoteAddress>,
    /// Local customer id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

/// Remote customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCustomer {
    pub id: String,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Processor address shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAddress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub administrative_district_level_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl From<&Address> for RemoteAddress {
    fn from(a: &Address) -> Self {
        Self {
            address_line_1: a.line1.clone(),
            address_line_2: a.line2.clone(),
            locality: a.city.clone(),
            administrative_district_level_1: a.state.clone(),
            postal_code: a.postal_code.clone(),
            country: a.country.as_ref().map(|c| c.to_uppercase()),
        }
    }
}

/// Create order request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub idempotency_key: String,
    pub order: OrderDraft,
}

/// Order body of a create request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub line_items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discounts: Vec<OrderDiscount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taxes: Vec<OrderTax>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

/// Order line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub uid: String,
    pub name: String,
    /// Decimal string, as processors expect
    pub quantity: String,
    pub base_price_money: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_discounts: Vec<AppliedDiscount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applied_taxes: Vec<AppliedTax>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedDiscount {
    pub discount_uid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedTax {
    pub tax_uid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scope {
    Order,
    LineItem,
}

/// Fixed-amount discount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDiscount {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub discount_type: String,
    pub amount_money: Money,
    pub scope: Scope,
}

impl OrderDiscount {
    pub fn fixed(uid: impl Into<String>, name: impl Into<String>, amount: Money, scope: Scope) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
            discount_type: "FIXED_AMOUNT".to_string(),
            amount_money: amount,
            scope,
        }
    }
}

/// Additive tax with a precomputed amount
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTax {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub tax_type: String,
    /// Percentage as a decimal string, `"8.25"`
    pub percentage: String,
    pub scope: Scope,
    pub applied_money: Money,
}

/// Order state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    #[default]
    Open,
    Completed,
    Canceled,
    Draft,
}

/// Remote order as reported by the processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub location_id: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub state: OrderState,
    pub total_money: Money,
    #[serde(default)]
    pub customer_id: Option<String>,
}

/// Sparse order update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub location_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<OrderState>,
}

impl OrderPatch {
    /// Transition to canceled
    pub fn cancel(location_id: impl Into<String>) -> Self {
        Self {
            location_id: location_id.into(),
            state: Some(OrderState::Canceled),
        }
    }
}

/// Create payment request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub idempotency_key: String,
    /// Payment-method token from the card form
    pub source_id: String,
    pub amount_money: Money,
    pub order_id: String,
    pub location_id: String,
    pub autocomplete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_fee_money: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<RemoteAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

/// Remote payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePayment {
    pub id: String,
    pub amount_money: Money,
    pub status: String,
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Create refund request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRefundRequest {
    pub idempotency_key: String,
    pub payment_id: String,
    pub amount_money: Money,
    pub reason: String,
}

/// Remote refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRefund {
    pub id: String,
    pub amount_money: Money,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub payment_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys_are_unique() {
        assert_ne!(idempotency_key(), idempotency_key());
    }

    #[test]
    fn test_discount_wire_shape() {
        let d = OrderDiscount::fixed("d1", "Promo", Money::new(500, "usd"), Scope::LineItem);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["type"], "FIXED_AMOUNT");
        assert_eq!(json["scope"], "LINE_ITEM");
        assert_eq!(json["amount_money"]["currency"], "USD");
    }

    #[test]
    fn test_remote_order_defaults() {
        let order: RemoteOrder = serde_json::from_str(
            r#"{"id":"o1","location_id":"L1","total_money":{"amount":100,"currency":"USD"}}"#,
        )
        .unwrap();
        assert_eq!(order.state, OrderState::Open);
        assert_eq!(order.version, 0);
    }

    #[test]
    fn test_cancel_patch() {
        let json = serde_json::to_value(OrderPatch::cancel("L1")).unwrap();
        assert_eq!(json["state"], "CANCELED");
    }
}
