use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::{percent, Money};

/// A volume discount bracket: `rate` applies to any subtotal at or above
/// `threshold` until the next bracket starts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountTier {
    pub threshold: Money,
    pub rate: Decimal,
}

/// Tier discount, GST and delivery fee rules. Brackets are kept in ascending
/// threshold order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    pub tiers: Vec<DiscountTier>,
    pub gst_rate: Decimal,
    pub delivery_fee: Money,
    pub free_delivery_threshold: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                DiscountTier { threshold: Money::ZERO, rate: percent(Decimal::from(2)) },
                DiscountTier { threshold: Money::from_major(200), rate: percent(Decimal::from(4)) },
                DiscountTier { threshold: Money::from_major(1000), rate: percent(Decimal::from(6)) },
            ],
            gst_rate: percent(Decimal::from(5)),
            delivery_fee: Money::from_major(30),
            free_delivery_threshold: Money::from_major(200),
        }
    }
}

impl PricingPolicy {
    pub fn tier_discount_rate(&self, subtotal: Money) -> Decimal {
        self.tiers
            .iter()
            .take_while(|tier| tier.threshold <= subtotal)
            .last()
            .map_or(Decimal::ZERO, |tier| tier.rate)
    }

    pub fn tier_discount(&self, subtotal: Money) -> Money {
        subtotal.multiply_by_rate(self.tier_discount_rate(subtotal))
    }

    pub fn gst(&self, taxable_amount: Money) -> Money {
        taxable_amount.multiply_by_rate(self.gst_rate)
    }

    /// Charged on the pre-discount subtotal.
    pub fn delivery_fee(&self, subtotal: Money) -> Money {
        if subtotal < self.free_delivery_threshold {
            self.delivery_fee
        } else {
            Money::ZERO
        }
    }
}

pub fn tier_discount_rate(subtotal: Money) -> Decimal {
    PricingPolicy::default().tier_discount_rate(subtotal)
}

pub fn gst(taxable_amount: Money) -> Money {
    PricingPolicy::default().gst(taxable_amount)
}

pub fn delivery_fee(subtotal: Money) -> Money {
    PricingPolicy::default().delivery_fee(subtotal)
}
