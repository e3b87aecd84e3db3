//! Order pricing with coupon discounts
//!
//! Computes the subtotal of an order from unit price × quantity and applies a
//! flat percentage discount when the supplied coupon is valid. Persistence and
//! the HTTP surface live outside this crate; they call [`OrderPricer::quote`]
//! after startup has finished loading the coupon sources.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validator::CouponValidator;

/// Errors rejecting an order before pricing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// No line items
    #[error("At least one order item is required")]
    EmptyOrder,

    /// Quantity must be greater than zero
    #[error("Quantity must be greater than 0 for product {product_id}")]
    InvalidQuantity { product_id: String },

    /// Unit price below zero
    #[error("Negative unit price for product {product_id}")]
    NegativePrice { product_id: String },

    /// Line or running subtotal does not fit in a `Decimal`
    #[error("Order amount overflows at product {product_id}")]
    AmountOverflow { product_id: String },

    /// Discount does not fit in a `Decimal`
    #[error("Discount overflows for subtotal {subtotal}")]
    DiscountOverflow { subtotal: Decimal },
}

/// One priced line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            unit_price,
            quantity,
        }
    }

    /// `unit_price × quantity`, or `None` on overflow
    pub fn subtotal(&self) -> Option<Decimal> {
        self.unit_price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Flat discount applied to a subtotal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiscountPolicy {
    pub rate: Decimal,
}

impl DiscountPolicy {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    /// Discount amount for `subtotal`, or `None` on overflow
    pub fn apply(&self, subtotal: Decimal) -> Option<Decimal> {
        subtotal.checked_mul(self.rate)
    }
}

impl Default for DiscountPolicy {
    fn default() -> Self {
        Self {
            rate: Decimal::new(10, 2),
        }
    }
}

/// Priced order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderQuote {
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub coupon_applied: bool,
}

/// Prices orders against a ready coupon validator
#[derive(Debug, Clone)]
pub struct OrderPricer {
    validator: CouponValidator,
    policy: DiscountPolicy,
}

impl OrderPricer {
    pub fn new(validator: CouponValidator, policy: DiscountPolicy) -> Self {
        Self { validator, policy }
    }

    pub fn validator(&self) -> &CouponValidator {
        &self.validator
    }

    /// Price `items`, discounting when `coupon` is valid
    ///
    /// An empty coupon string is treated as no coupon.
    pub fn quote(&self, items: &[LineItem], coupon: Option<&str>) -> Result<OrderQuote, OrderError> {
        if items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }

        let mut subtotal = Decimal::ZERO;
        for item in items {
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
            if item.unit_price < Decimal::ZERO {
                return Err(OrderError::NegativePrice {
                    product_id: item.product_id.clone(),
                });
            }
            subtotal = item
                .subtotal()
                .and_then(|line| subtotal.checked_add(line))
                .ok_or_else(|| OrderError::AmountOverflow {
                    product_id: item.product_id.clone(),
                })?;
        }

        let coupon_applied = match coupon.filter(|c| !c.is_empty()) {
            Some(code) => {
                let valid = self.validator.is_valid_coupon(code);
                tracing::info!(coupon = code, valid, "Coupon evaluated for order");
                valid
            }
            None => false,
        };

        let discount = if coupon_applied {
            self.policy
                .apply(subtotal)
                .ok_or(OrderError::DiscountOverflow { subtotal })?
        } else {
            Decimal::ZERO
        };
        let total = subtotal
            .checked_sub(discount)
            .ok_or(OrderError::DiscountOverflow { subtotal })?;

        Ok(OrderQuote {
            items: items.to_vec(),
            subtotal,
            discount,
            total,
            coupon_applied,
        })
    }
}
