//! Local order, customer and ledger types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use crate::error::GatewayError;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Processor environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Live,
    #[default]
    Sandbox,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Sandbox => "sandbox",
        }
    }

    /// Customer metadata key holding the remote customer id for this mode
    pub fn customer_meta_key(&self) -> String {
        format!("remote_customer_id_{}", self.as_str())
    }
}

impl FromStr for Mode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "live" | "production" => Ok(Self::Live),
            "sandbox" | "test" => Ok(Self::Sandbox),
            _ => Err(GatewayError::Config(format!("unknown mode: {s}"))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Complete,
    Failed,
    Refunded,
    PartiallyRefunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::PartiallyRefunded => "partially_refunded",
        }
    }
}

/// Persisted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalOrder {
    pub id: u64,
    pub customer_id: Option<u64>,
    pub currency: String,
    pub total: Decimal,
    /// Processor payment id once charged
    pub gateway_transaction_id: Option<String>,
    pub mode: Mode,
    pub status: OrderStatus,
}

impl LocalOrder {
    /// New pending order
    pub fn pending(id: u64, currency: impl Into<String>, total: Decimal, mode: Mode) -> Self {
        Self {
            id,
            customer_id: None,
            currency: currency.into(),
            total,
            gateway_transaction_id: None,
            mode,
            status: OrderStatus::Pending,
        }
    }
}

/// Postal address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// Checkout customer details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub billing_address: Option<Address>,
    /// Site user account, if logged in
    pub user_id: Option<u64>,
}

impl CustomerProfile {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    pub fn user_id(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Split the display name into given and family parts
    pub fn split_name(&self) -> (Option<String>, Option<String>) {
        let mut parts = self.name.trim().splitn(2, char::is_whitespace);
        let given = parts.next().filter(|s| !s.is_empty()).map(str::to_string);
        let family = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        (given, family)
    }
}

/// Persisted customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCustomer {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub user_id: Option<u64>,
    pub metadata: HashMap<String, String>,
}

impl LocalCustomer {
    /// Remote customer id recorded for a mode
    pub fn remote_id(&self, mode: Mode) -> Option<&str> {
        self.metadata
            .get(&mode.customer_meta_key())
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }
}

/// Customer insert payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub email: String,
    pub name: String,
    pub user_id: Option<u64>,
}

/// Discount resolvable by code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub code: String,
    pub name: String,
}

/// Object a transaction is recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Order,
}

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Complete,
    Failed,
}

/// Transaction insert payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub object_id: u64,
    pub object_type: ObjectType,
    /// Signed, negative for refunds
    pub total: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub gateway: String,
    /// Processor-side id (payment or refund)
    pub transaction_id: String,
    pub mode: Mode,
}

/// Persisted ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: u64,
    pub object_id: u64,
    pub object_type: ObjectType,
    pub total: Decimal,
    pub currency: String,
    pub status: TransactionStatus,
    pub gateway: String,
    pub transaction_id: String,
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
}

/// Local refund object created by the store before reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRecord {
    pub id: u64,
    pub order_id: u64,
    /// Negative for a refund
    pub total: Decimal,
    pub reason: Option<String>,
}

impl RefundRecord {
    pub fn new(id: u64, order_id: u64, total: Decimal) -> Self {
        Self {
            id,
            order_id,
            total,
            reason: None,
        }
    }
}
