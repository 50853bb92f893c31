use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::coupon::{Coupon, CouponCode, DiscountType};
use crate::domain::money::{percent, Money, MoneyError};

#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum CouponError {
    #[error("coupon is inactive")]
    Inactive,
    #[error("coupon is outside its validity window")]
    Expired,
    #[error("coupon usage limit reached")]
    UsageLimitReached,
    #[error("order subtotal is below the coupon minimum of {required}")]
    MinimumOrderNotMet { required: Money },
}

impl CouponError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Inactive => "This coupon is no longer active".to_owned(),
            Self::Expired => "This coupon has expired".to_owned(),
            Self::UsageLimitReached => "This coupon has reached its usage limit".to_owned(),
            Self::MinimumOrderNotMet { required } => {
                format!("Minimum order amount ₹{required} required for this coupon")
            }
        }
    }
}

/// A coupon that passed validation against a specific subtotal, together
/// with the discount it is worth on that subtotal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCoupon {
    pub code: CouponCode,
    pub discount: Money,
}

pub trait CouponValidator: Send + Sync {
    fn validate(
        &self,
        coupon: &Coupon,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCoupon, CouponError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StandardCouponValidator;

impl CouponValidator for StandardCouponValidator {
    fn validate(
        &self,
        coupon: &Coupon,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<ValidatedCoupon, CouponError> {
        validate(coupon, subtotal, now)
    }
}

/// Checks run in a fixed order and stop at the first failure. `used_count`
/// is not touched; redemption happens when the order is committed.
pub fn validate(
    coupon: &Coupon,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<ValidatedCoupon, CouponError> {
    if !coupon.is_active {
        return Err(CouponError::Inactive);
    }
    if !coupon.is_within_window(now) {
        return Err(CouponError::Expired);
    }
    if !coupon.has_remaining_uses() {
        return Err(CouponError::UsageLimitReached);
    }
    if subtotal < coupon.min_order_amount {
        return Err(CouponError::MinimumOrderNotMet { required: coupon.min_order_amount });
    }

    Ok(ValidatedCoupon { code: coupon.code.clone(), discount: coupon_discount(coupon, subtotal) })
}

fn coupon_discount(coupon: &Coupon, subtotal: Money) -> Money {
    match coupon.discount_type {
        DiscountType::Percentage => {
            let discount = subtotal.multiply_by_rate(percent(coupon.discount_value));
            let discount = match coupon.max_discount_amount {
                Some(cap) => discount.min(cap),
                None => discount,
            };
            discount.min(subtotal)
        }
        DiscountType::Fixed => match Money::from_decimal_rounded(coupon.discount_value) {
            Ok(amount) => amount.min(subtotal),
            Err(MoneyError::OutOfRange(_)) => subtotal,
            Err(_) => Money::ZERO,
        },
    }
}
