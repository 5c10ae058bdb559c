//! Request-scoped cart snapshot handed to the order builder

use crate::error::{GatewayError, GatewayResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a fee does to the total, decided once when the fee is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeKind {
    /// Reduces the total; `amount` is non-negative
    Discount { amount: Decimal },
    /// Adds to the total; `amount` is non-negative
    Surcharge { amount: Decimal },
}

/// Cart fee, order-scoped unless `associated_item_id` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub label: String,
    pub kind: FeeKind,
    pub associated_item_id: Option<String>,
    pub taxable: bool,
}

impl Fee {
    /// Build from a signed amount: negative is a discount, anything else a surcharge
    pub fn from_signed(label: impl Into<String>, amount: Decimal) -> Self {
        let kind = if amount.is_sign_negative() && !amount.is_zero() {
            FeeKind::Discount {
                amount: amount.abs(),
            }
        } else {
            FeeKind::Surcharge {
                amount: amount.abs(),
            }
        };
        Self {
            label: label.into(),
            kind,
            associated_item_id: None,
            taxable: true,
        }
    }

    /// Discount fee
    pub fn discount(label: impl Into<String>, amount: Decimal) -> Self {
        Self::from_signed(label, -amount.abs())
    }

    /// Surcharge fee
    pub fn surcharge(label: impl Into<String>, amount: Decimal) -> Self {
        Self::from_signed(label, amount.abs())
    }

    /// Attach to a cart item
    pub fn for_item(mut self, item_id: impl Into<String>) -> Self {
        self.associated_item_id = Some(item_id.into());
        self
    }

    /// Mark as tax-exempt
    pub fn tax_exempt(mut self) -> Self {
        self.taxable = false;
        self
    }

    /// Signed amount, negative for discounts
    pub fn signed_amount(&self) -> Decimal {
        match &self.kind {
            FeeKind::Discount { amount } => -*amount,
            FeeKind::Surcharge { amount } => *amount,
        }
    }

    pub fn is_order_scoped(&self) -> bool {
        self.associated_item_id.is_none()
    }
}

/// One cart line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Catalog reference
    pub id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    /// Line tax amount, already computed by the cart
    pub tax: Decimal,
    /// Discount code -> amount taken off this line
    pub applied_discounts: BTreeMap<String, Decimal>,
    /// Item-scoped fees
    pub fees: Vec<Fee>,
    pub variant_label: Option<String>,
}

impl CartItem {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            unit_price,
            tax: Decimal::ZERO,
            applied_discounts: BTreeMap::new(),
            fees: Vec::new(),
            variant_label: None,
        }
    }

    pub fn tax(mut self, tax: Decimal) -> Self {
        self.tax = tax;
        self
    }

    pub fn discount(mut self, code: impl Into<String>, amount: Decimal) -> Self {
        self.applied_discounts.insert(code.into(), amount);
        self
    }

    /// Add an item-scoped fee; its association is forced to this item
    pub fn fee(mut self, fee: Fee) -> Self {
        let fee = fee.for_item(self.id.clone());
        self.fees.push(fee);
        self
    }

    pub fn variant(mut self, label: impl Into<String>) -> Self {
        self.variant_label = Some(label.into());
        self
    }

    /// `unit_price x quantity`
    pub fn subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    fn validate(&self) -> GatewayResult<()> {
        if self.quantity < 1 {
            return Err(GatewayError::InvalidCart(format!(
                "item {} has quantity 0",
                self.id
            )));
        }
        if self.tax.is_sign_negative() && !self.tax.is_zero() {
            return Err(GatewayError::InvalidCart(format!(
                "item {} has negative tax",
                self.id
            )));
        }
        let discounts: Decimal = self.applied_discounts.values().sum();
        if discounts > self.subtotal() {
            return Err(GatewayError::InvalidCart(format!(
                "item {} discounts {} exceed subtotal {}",
                self.id,
                discounts,
                self.subtotal()
            )));
        }
        Ok(())
    }
}

/// Cart snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub fees: Vec<Fee>,
    /// Fraction, `0.08` is 8%
    pub tax_rate: Decimal,
    pub currency: String,
}

impl Cart {
    pub fn new(currency: impl Into<String>, tax_rate: Decimal) -> Self {
        Self {
            items: Vec::new(),
            fees: Vec::new(),
            tax_rate,
            currency: currency.into(),
        }
    }

    pub fn item(mut self, item: CartItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn fee(mut self, fee: Fee) -> Self {
        self.fees.push(fee);
        self
    }

    /// Fees attributed to the line at `index`: its own plus cart fees pointing at it
    ///
    /// A cart fee naming an item id that appears on several lines belongs to
    /// the first of them only.
    pub fn fees_for(&self, index: usize) -> impl Iterator<Item = &Fee> + '_ {
        let item = self.items.get(index);
        let first_line = item.is_some_and(|item| {
            self.items.iter().position(|other| other.id == item.id) == Some(index)
        });
        let cart_fees = self.fees.iter().filter(move |fee| {
            first_line && fee.associated_item_id.as_deref() == item.map(|item| item.id.as_str())
        });
        item.into_iter().flat_map(|item| item.fees.iter()).chain(cart_fees)
    }

    /// Cart fees pointing at an item that is not in the cart
    pub fn orphaned_fees(&self) -> impl Iterator<Item = &Fee> + '_ {
        self.fees.iter().filter(move |fee| match &fee.associated_item_id {
            Some(id) => !self.items.iter().any(|item| &item.id == id),
            None => false,
        })
    }

    /// Check structural invariants
    pub fn validate(&self) -> GatewayResult<()> {
        if self.items.is_empty() {
            return Err(GatewayError::InvalidCart("cart has no items".to_string()));
        }
        if self.tax_rate.is_sign_negative() && !self.tax_rate.is_zero() {
            return Err(GatewayError::InvalidCart("negative tax rate".to_string()));
        }
        self.items.iter().try_for_each(CartItem::validate)
    }

    /// Every discount code used by any item
    pub fn discount_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .items
            .iter()
            .flat_map(|item| item.applied_discounts.keys().cloned())
            .collect();
        codes.sort();
        codes.dedup();
        codes
    }
}
