//! Money and currency normalization
//!
//! Processors expect integer amounts in the currency's smallest unit. Local
//! amounts are `Decimal` major units. Conversion rounds half away from zero,
//! once per amount, so totals are never re-rounded after summation.

use crate::error::{GatewayError, GatewayResult};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO 4217 codes without a fractional minor unit
pub const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// Is a zero-decimal currency (case-insensitive)
pub fn is_zero_decimal(currency: &str) -> bool {
    ZERO_DECIMAL_CURRENCIES
        .iter()
        .any(|code| code.eq_ignore_ascii_case(currency))
}

/// Decimal places used by the currency
pub fn decimals(currency: &str) -> u32 {
    if is_zero_decimal(currency) { 0 } else { 2 }
}

/// Convert a major-unit amount to the processor's integer representation
pub fn to_minor_units(amount: Decimal, currency: &str) -> GatewayResult<i64> {
    let scaled = if is_zero_decimal(currency) {
        Some(amount)
    } else {
        amount.checked_mul(Decimal::ONE_HUNDRED)
    };

    scaled
        .map(|value| value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|value| value.to_i64())
        .ok_or_else(|| GatewayError::InvalidAmount(format!("{amount} {currency}")))
}

/// Convert a minor-unit amount back to major units
pub fn from_minor_units(amount: i64, currency: &str) -> Decimal {
    Decimal::new(amount, decimals(currency))
}

/// Single-currency processors reject checkout in any other currency
pub fn is_supported(currency: &str, merchant_currency: &str) -> bool {
    currency.eq_ignore_ascii_case(merchant_currency)
}

/// Standard tax function: `amount x rate`, rounded to the currency precision
pub fn calculate_tax(amount: Decimal, rate: Decimal, currency: &str) -> Decimal {
    (amount * rate).round_dp_with_strategy(decimals(currency), RoundingStrategy::MidpointAwayFromZero)
}

/// Human-readable amount, e.g. `49.99 USD` or `500 JPY`
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    format!(
        "{:.prec$} {}",
        amount,
        currency.to_uppercase(),
        prec = decimals(currency) as usize
    )
}

/// Wire money: integer minor units with a currency code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// Amount in smallest currency unit
    pub amount: i64,
    /// ISO 4217 code, upper case
    pub currency: String,
}

impl Money {
    /// Create from minor units
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into().to_uppercase(),
        }
    }

    /// Create from a major-unit decimal
    pub fn from_decimal(amount: Decimal, currency: &str) -> GatewayResult<Self> {
        Ok(Self::new(to_minor_units(amount, currency)?, currency))
    }

    /// Amount in major units
    pub fn to_decimal(&self) -> Decimal {
        from_minor_units(self.amount, &self.currency)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_amount(self.to_decimal(), &self.currency))
    }
}
