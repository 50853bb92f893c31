use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::cart::{Cart, FoodItemId};
use crate::domain::coupon::CouponCode;
use crate::domain::money::Money;
use crate::errors::DomainError;
use crate::lifecycle::TransitionOutcome;
use crate::pricing::PriceBreakdown;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
    Returned,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Returned)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "preparing" => Some(Self::Preparing),
            "out_for_delivery" => Some(Self::OutForDelivery),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            "returned" => Some(Self::Returned),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CashOnDelivery => "cash_on_delivery",
            Self::Online => "online",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "cash_on_delivery" | "cash" => Some(Self::CashOnDelivery),
            "online" | "paypal" => Some(Self::Online),
            _ => None,
        }
    }
}

/// A line of a placed order, priced as it was at checkout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub food_item_id: FoodItemId,
    pub quantity: u32,
    pub unit_price: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub items: Vec<OrderItem>,
    pub pricing: PriceBreakdown,
    pub coupon_code: Option<CouponCode>,
    pub delivery_agent_id: Option<AgentId>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub cancel_reason: Option<String>,
    pub commission_amount: Option<Money>,
    pub commission_paid: bool,
    pub commission_paid_at: Option<DateTime<Utc>>,
    /// Bumped on every mutation; persistence uses it as an optimistic lock.
    pub version: u32,
}

impl Order {
    /// Freezes a cart and its breakdown into a new pending order.
    pub fn place(
        id: OrderId,
        customer_id: CustomerId,
        cart: &Cart,
        pricing: PriceBreakdown,
        coupon_code: Option<CouponCode>,
        payment_method: PaymentMethod,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if cart.is_empty() {
            return Err(DomainError::InvariantViolation("cannot place an empty cart".to_owned()));
        }
        if pricing.subtotal != cart.subtotal() || !pricing.is_consistent() {
            return Err(DomainError::InvariantViolation(
                "price breakdown does not match the cart".to_owned(),
            ));
        }
        if coupon_code.is_none() && !pricing.coupon_discount.is_zero() {
            return Err(DomainError::InvariantViolation(
                "coupon discount recorded without a coupon".to_owned(),
            ));
        }

        let items = cart
            .lines()
            .iter()
            .map(|line| OrderItem {
                food_item_id: line.food_item_id().clone(),
                quantity: line.quantity(),
                unit_price: line.unit_price(),
            })
            .collect();

        Ok(Self {
            id,
            customer_id,
            status: OrderStatus::Pending,
            payment_method,
            items,
            pricing,
            coupon_code,
            delivery_agent_id: None,
            assigned_at: None,
            created_at,
            dispatched_at: None,
            delivered_at: None,
            closed_at: None,
            cancel_reason: None,
            commission_amount: None,
            commission_paid: false,
            commission_paid_at: None,
            version: 0,
        })
    }

    pub fn total(&self) -> Money {
        self.pricing.total
    }

    /// Applies an outcome computed by the lifecycle for this exact version.
    pub fn apply(&mut self, outcome: &TransitionOutcome) -> Result<(), DomainError> {
        if outcome.order_id != self.id || outcome.from != self.status {
            return Err(DomainError::InvariantViolation(format!(
                "transition {} -> {} does not apply to order {} in status {}",
                outcome.from, outcome.to, self.id, self.status
            )));
        }

        self.status = outcome.to;
        match outcome.to {
            OrderStatus::OutForDelivery => self.dispatched_at = Some(outcome.at),
            OrderStatus::Delivered => self.delivered_at = Some(outcome.at),
            _ => {}
        }
        if outcome.to.is_terminal() {
            self.closed_at = Some(outcome.at);
            self.commission_amount = outcome.commission;
        }
        if outcome.to == OrderStatus::Cancelled {
            self.cancel_reason = outcome.reason.clone();
        }
        self.version += 1;
        Ok(())
    }

    pub fn assign_agent(&mut self, agent: AgentId, at: DateTime<Utc>) -> Result<(), DomainError> {
        if self.status.is_terminal() || self.status == OrderStatus::OutForDelivery {
            return Err(DomainError::InvariantViolation(format!(
                "order {} in status {} can no longer be reassigned",
                self.id, self.status
            )));
        }

        self.delivery_agent_id = Some(agent);
        self.assigned_at = Some(at);
        self.version += 1;
        Ok(())
    }

    pub fn commission_due(&self) -> Money {
        if self.commission_paid {
            return Money::ZERO;
        }
        self.commission_amount.unwrap_or(Money::ZERO)
    }

    /// Records the payout of a closed order's commission; returns the amount
    /// paid.
    pub fn mark_commission_paid(&mut self, at: DateTime<Utc>) -> Result<Money, DomainError> {
        if !self.status.is_terminal() {
            return Err(DomainError::InvariantViolation(format!(
                "order {} is still {} and has no commission to pay",
                self.id, self.status
            )));
        }
        if self.commission_paid {
            return Err(DomainError::InvariantViolation(format!(
                "commission for order {} is already paid",
                self.id
            )));
        }
        let amount = self.commission_due();
        if amount.is_zero() {
            return Err(DomainError::InvariantViolation(format!(
                "order {} did not earn a commission",
                self.id
            )));
        }

        self.commission_paid = true;
        self.commission_paid_at = Some(at);
        self.version += 1;
        Ok(amount)
    }
}
