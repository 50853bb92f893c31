use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use bhojana_core::domain::cart::Cart;
use bhojana_core::domain::coupon::{Coupon, CouponCode};
use bhojana_core::domain::money::Money;
use bhojana_core::domain::order::{CustomerId, Order, OrderId, PaymentMethod};
use bhojana_core::errors::{ApplicationError, DomainError};
use bhojana_core::pricing::{
    CouponError, CouponValidator, DeterministicPricingEngine, PricingResult,
    StandardCouponValidator, ValidatedCoupon,
};

use crate::repositories::{CouponRepository, OrderRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cannot check out an empty cart")]
    EmptyCart,
    #[error("coupon `{0}` does not exist")]
    CouponNotFound(String),
    #[error(transparent)]
    Coupon(#[from] CouponError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl CheckoutError {
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyCart => "Your cart is empty.".to_owned(),
            Self::CouponNotFound(_) => "Invalid coupon code".to_owned(),
            Self::Coupon(error) => error.user_message(),
            Self::Domain(error) => error.user_message(),
            Self::Repository(_) => "Checkout is temporarily unavailable.".to_owned(),
        }
    }
}

impl From<CheckoutError> for ApplicationError {
    fn from(value: CheckoutError) -> Self {
        match value {
            CheckoutError::EmptyCart => {
                DomainError::InvariantViolation("cannot check out an empty cart".to_owned()).into()
            }
            CheckoutError::CouponNotFound(_) => Self::NotFound("Invalid coupon code".to_owned()),
            CheckoutError::Coupon(error) => DomainError::from(error).into(),
            CheckoutError::Domain(error) => error.into(),
            CheckoutError::Repository(error) => Self::Persistence(error.to_string()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub cart: Cart,
    pub coupon_code: Option<String>,
    pub payment_method: PaymentMethod,
}

/// What the cart and checkout pages show. A rejected coupon does not fail the
/// preview; the price is computed without it and the reason is reported.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutPreview {
    pub pricing: PricingResult,
    pub coupon: Option<ValidatedCoupon>,
    pub coupon_rejection: Option<CouponError>,
}

pub struct CheckoutService {
    coupons: Arc<dyn CouponRepository>,
    orders: Arc<dyn OrderRepository>,
    pricing: DeterministicPricingEngine,
    validator: StandardCouponValidator,
}

impl CheckoutService {
    pub fn new(
        coupons: Arc<dyn CouponRepository>,
        orders: Arc<dyn OrderRepository>,
        pricing: DeterministicPricingEngine,
    ) -> Self {
        Self { coupons, orders, pricing, validator: StandardCouponValidator }
    }

    pub async fn preview(
        &self,
        cart: &Cart,
        coupon_code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<CheckoutPreview, CheckoutError> {
        let (coupon, coupon_rejection) = match self.lookup(coupon_code).await? {
            Some(coupon) => match self.validator.validate(&coupon, cart.subtotal(), now) {
                Ok(validated) => (Some(validated), None),
                Err(rejection) => (None, Some(rejection)),
            },
            None => (None, None),
        };

        let pricing = self.pricing.price_with_trace(cart, coupon.as_ref());
        Ok(CheckoutPreview { pricing, coupon, coupon_rejection })
    }

    /// Prices the cart, re-validates the coupon at `now` and commits the order
    /// together with the coupon redemption.
    ///
    /// A coupon that no longer validates fails the whole call rather than
    /// silently dropping the discount. Callers show the rejection (as
    /// [`preview`](Self::preview) reports it) and place the order again with
    /// `coupon_code: None` once the customer accepts the undiscounted total.
    pub async fn place_order(
        &self,
        request: CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<Order, CheckoutError> {
        if request.cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal = request.cart.subtotal();
        let validated = match self.lookup(request.coupon_code.as_deref()).await? {
            Some(coupon) => Some(self.validator.validate(&coupon, subtotal, now)?),
            None => None,
        };

        let pricing = self.pricing.price_with_trace(&request.cart, validated.as_ref()).breakdown;
        let coupon_code = validated.as_ref().map(|coupon| coupon.code.clone());
        let order = Order::place(
            OrderId::generate(),
            request.customer_id,
            &request.cart,
            pricing,
            coupon_code.clone(),
            request.payment_method,
            now,
        )?;

        match self.orders.create(&order, coupon_code.as_ref()).await {
            Ok(()) => {}
            Err(RepositoryError::CouponUnavailable(code)) => {
                let rejection = self.redemption_failure(&code, subtotal, now).await?;
                warn!(
                    event_name = "checkout.coupon.redemption_rejected",
                    order_id = %order.id,
                    coupon_code = %code,
                    reason = %rejection,
                    "coupon could not be redeemed at commit time"
                );
                return Err(rejection.into());
            }
            Err(error) => return Err(error.into()),
        }

        info!(
            event_name = "checkout.order.placed",
            order_id = %order.id,
            customer_id = %order.customer_id.0,
            coupon_code = order.coupon_code.as_ref().map(CouponCode::as_str).unwrap_or("none"),
            total = %order.pricing.total,
            "order placed"
        );
        Ok(order)
    }

    async fn lookup(&self, raw: Option<&str>) -> Result<Option<Coupon>, CheckoutError> {
        let Some(code) = raw.and_then(CouponCode::parse) else {
            return Ok(None);
        };
        match self.coupons.find_by_code(&code).await? {
            Some(coupon) => Ok(Some(coupon)),
            None => Err(CheckoutError::CouponNotFound(code.0)),
        }
    }

    /// Explains a failed conditional redemption. Whatever changed between
    /// validation and commit, a coupon that now validates again lost its last
    /// use to a concurrent order.
    async fn redemption_failure(
        &self,
        code: &str,
        subtotal: Money,
        now: DateTime<Utc>,
    ) -> Result<CouponError, CheckoutError> {
        let current = self.coupons.find_by_code(&CouponCode(code.to_string())).await?;
        let rejection = current
            .map(|coupon| self.validator.validate(&coupon, subtotal, now).err())
            .unwrap_or(Some(CouponError::Inactive));
        Ok(rejection.unwrap_or(CouponError::UsageLimitReached))
    }
}
