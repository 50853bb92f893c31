use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::errors::DomainError;

/// Coupon codes are matched case-insensitively; the stored form is trimmed
/// upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CouponCode(pub String);

impl CouponCode {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_uppercase();
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub code: CouponCode,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Percentage points for [`DiscountType::Percentage`], rupees for
    /// [`DiscountType::Fixed`].
    pub discount_value: Decimal,
    pub min_order_amount: Money,
    pub max_discount_amount: Option<Money>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_limit: Option<u32>,
    pub used_count: u32,
    pub is_active: bool,
}

impl Coupon {
    pub fn check_invariants(&self) -> Result<(), DomainError> {
        if self.valid_from > self.valid_until {
            return Err(self.violation("valid_from must not be after valid_until"));
        }
        if let Some(limit) = self.usage_limit {
            if self.used_count > limit {
                return Err(self.violation("used_count exceeds usage_limit"));
            }
        }
        if self.discount_value.is_sign_negative() && !self.discount_value.is_zero() {
            return Err(self.violation("discount_value must not be negative"));
        }
        if self.discount_type == DiscountType::Percentage
            && self.discount_value > Decimal::ONE_HUNDRED
        {
            return Err(self.violation("percentage discount_value must not exceed 100"));
        }
        Ok(())
    }

    pub fn has_remaining_uses(&self) -> bool {
        self.usage_limit.map_or(true, |limit| self.used_count < limit)
    }

    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    fn violation(&self, detail: &str) -> DomainError {
        DomainError::InvariantViolation(format!("coupon `{}`: {detail}", self.code.0))
    }
}
