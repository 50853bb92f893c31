use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::commission::CommissionPolicy;
use crate::domain::money::Money;
use crate::domain::order::{AgentId, Order, OrderStatus, PaymentMethod};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyEarnings {
    pub orders: u32,
    pub delivered: u32,
    pub commission: Money,
}

/// An agent's earnings over their closed orders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningsReport {
    pub agent_id: AgentId,
    pub delivered_orders: u32,
    pub returned_orders: u32,
    pub cancelled_orders: u32,
    pub total_commission: Money,
    pub pending_commission: Money,
    pub paid_commission: Money,
    pub cash_on_delivery_commission: Money,
    pub online_commission: Money,
    pub delivery_fees_collected: Money,
    pub daily: BTreeMap<NaiveDate, DailyEarnings>,
}

impl EarningsReport {
    /// Folds over `orders`, ignoring anything not assigned to `agent_id` or
    /// still open.
    pub fn build(agent_id: &AgentId, orders: &[Order], policy: &CommissionPolicy) -> Self {
        let mut report = Self {
            agent_id: agent_id.clone(),
            delivered_orders: 0,
            returned_orders: 0,
            cancelled_orders: 0,
            total_commission: Money::ZERO,
            pending_commission: Money::ZERO,
            paid_commission: Money::ZERO,
            cash_on_delivery_commission: Money::ZERO,
            online_commission: Money::ZERO,
            delivery_fees_collected: Money::ZERO,
            daily: BTreeMap::new(),
        };

        let closed = orders.iter().filter(|order| {
            order.status.is_terminal() && order.delivery_agent_id.as_ref() == Some(agent_id)
        });
        for order in closed {
            report.record(order, policy.for_order(order));
        }
        report
    }

    fn record(&mut self, order: &Order, commission: Money) {
        match order.status {
            OrderStatus::Delivered => {
                self.delivered_orders += 1;
                self.delivery_fees_collected =
                    self.delivery_fees_collected.add(order.pricing.delivery_fee);
            }
            OrderStatus::Returned => self.returned_orders += 1,
            OrderStatus::Cancelled => self.cancelled_orders += 1,
            _ => {}
        }

        self.total_commission = self.total_commission.add(commission);
        if order.commission_paid {
            self.paid_commission = self.paid_commission.add(commission);
        } else {
            self.pending_commission = self.pending_commission.add(commission);
        }
        match order.payment_method {
            PaymentMethod::CashOnDelivery => {
                self.cash_on_delivery_commission = self.cash_on_delivery_commission.add(commission);
            }
            PaymentMethod::Online => self.online_commission = self.online_commission.add(commission),
        }

        let day = order.closed_at.unwrap_or(order.created_at).date_naive();
        let entry = self.daily.entry(day).or_default();
        entry.orders += 1;
        if order.status == OrderStatus::Delivered {
            entry.delivered += 1;
        }
        entry.commission = entry.commission.add(commission);
    }

    pub fn order_count(&self) -> u32 {
        self.delivered_orders + self.returned_orders + self.cancelled_orders
    }
}
