pub mod earnings;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money::{percent, Money};
use crate::domain::order::{Order, OrderStatus};

pub use earnings::{DailyEarnings, EarningsReport};

/// Delivery agent commission rates. `per_order_base` is added to every
/// commission-bearing order on top of the rate-based share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionPolicy {
    pub delivered_rate: Decimal,
    pub undelivered_rate: Decimal,
    pub per_order_base: Money,
}

impl Default for CommissionPolicy {
    fn default() -> Self {
        Self {
            delivered_rate: percent(Decimal::from(12)),
            undelivered_rate: percent(Decimal::from(6)),
            per_order_base: Money::ZERO,
        }
    }
}

impl CommissionPolicy {
    pub fn commission(&self, order_total: Money, status: OrderStatus) -> Money {
        let rate = match status {
            OrderStatus::Delivered => self.delivered_rate,
            OrderStatus::Returned | OrderStatus::Cancelled => self.undelivered_rate,
            _ => return Money::ZERO,
        };
        self.per_order_base.add(order_total.multiply_by_rate(rate))
    }

    /// Commission earned when an order closes. A cancellation earns nothing
    /// unless an agent had already been put on the order.
    pub fn for_closure(&self, order_total: Money, status: OrderStatus, agent_assigned: bool) -> Money {
        if status == OrderStatus::Cancelled && !agent_assigned {
            return Money::ZERO;
        }
        self.commission(order_total, status)
    }

    /// The amount stored on the order when it closed, recomputed for rows
    /// that predate the cached column.
    pub fn for_order(&self, order: &Order) -> Money {
        order.commission_amount.unwrap_or_else(|| {
            self.for_closure(order.total(), order.status, order.delivery_agent_id.is_some())
        })
    }
}

pub fn commission(order_total: Money, status: OrderStatus) -> Money {
    CommissionPolicy::default().commission(order_total, status)
}
