use chrono::Duration;
use thiserror::Error;

use crate::commission::CommissionPolicy;
use crate::domain::order::{Order, OrderStatus};
use crate::lifecycle::states::{Actor, ActorRole, StatusChange, TransitionOutcome};

pub const DEFAULT_CANCELLATION_WINDOW_SECS: i64 = 300;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OrderTransitionError {
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("customer cancellation window of {window_secs}s has elapsed")]
    CancellationWindowExpired { window_secs: i64 },
    #[error("{actor} may not move an order to {to}")]
    NotPermitted { actor: ActorRole, to: OrderStatus },
    #[error("order is assigned to a different delivery agent")]
    NotAssigned,
    #[error("order has no delivery agent assigned")]
    NoAgentAssigned,
}

impl OrderTransitionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidTransition { from, to } => {
                format!("Cannot update order: a {from} order cannot become {to}.")
            }
            Self::CancellationWindowExpired { window_secs } => {
                if window_secs % 60 == 0 {
                    format!(
                        "Orders can only be cancelled within {} minutes of placement.",
                        window_secs / 60
                    )
                } else {
                    format!("Orders can only be cancelled within {window_secs} seconds of placement.")
                }
            }
            Self::NotPermitted { to, .. } => {
                format!("You are not allowed to mark this order as {to}.")
            }
            Self::NotAssigned => "This order is not assigned to you.".to_owned(),
            Self::NoAgentAssigned => {
                "Assign a delivery agent before sending this order out.".to_owned()
            }
        }
    }
}

/// Whether `to` follows `from` in the transition table, regardless of who asks.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::{Cancelled, Confirmed, Delivered, OutForDelivery, Pending, Preparing, Returned};

    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Confirmed, Preparing)
            | (Preparing, OutForDelivery)
            | (OutForDelivery, Delivered)
            | (Pending | Confirmed | Preparing, Cancelled)
            | (OutForDelivery, Returned)
    )
}

/// The single entry point for order status changes. It never mutates the
/// order; callers persist the returned outcome under a version check.
#[derive(Clone, Debug)]
pub struct OrderLifecycle {
    cancellation_window: Duration,
    commission: CommissionPolicy,
}

impl Default for OrderLifecycle {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_CANCELLATION_WINDOW_SECS), CommissionPolicy::default())
    }
}

impl OrderLifecycle {
    pub fn new(cancellation_window: Duration, commission: CommissionPolicy) -> Self {
        Self { cancellation_window, commission }
    }

    pub fn cancellation_window(&self) -> Duration {
        self.cancellation_window
    }

    pub fn commission_policy(&self) -> &CommissionPolicy {
        &self.commission
    }

    pub fn transition(
        &self,
        order: &Order,
        change: &StatusChange,
    ) -> Result<TransitionOutcome, OrderTransitionError> {
        let from = order.status;
        let to = change.target;

        if from.is_terminal() || !can_transition(from, to) {
            return Err(OrderTransitionError::InvalidTransition { from, to });
        }

        match &change.actor {
            Actor::Admin => {}
            Actor::Customer(customer) => {
                if to != OrderStatus::Cancelled || *customer != order.customer_id {
                    return Err(OrderTransitionError::NotPermitted {
                        actor: ActorRole::Customer,
                        to,
                    });
                }
                self.check_cancellation_window(order, change)?;
            }
            Actor::DeliveryAgent(agent) => {
                if !matches!(
                    to,
                    OrderStatus::OutForDelivery | OrderStatus::Delivered | OrderStatus::Returned
                ) {
                    return Err(OrderTransitionError::NotPermitted {
                        actor: ActorRole::DeliveryAgent,
                        to,
                    });
                }
                if order.delivery_agent_id.as_ref() != Some(agent) {
                    return Err(OrderTransitionError::NotAssigned);
                }
            }
        }

        if to == OrderStatus::OutForDelivery && order.delivery_agent_id.is_none() {
            return Err(OrderTransitionError::NoAgentAssigned);
        }

        let commission = to.is_terminal().then(|| {
            self.commission.for_closure(order.total(), to, order.delivery_agent_id.is_some())
        });

        Ok(TransitionOutcome {
            order_id: order.id,
            from,
            to,
            actor: change.actor.role(),
            at: change.requested_at,
            commission,
            reason: change.reason.clone(),
        })
    }

    fn check_cancellation_window(
        &self,
        order: &Order,
        change: &StatusChange,
    ) -> Result<(), OrderTransitionError> {
        let expired = OrderTransitionError::CancellationWindowExpired {
            window_secs: self.cancellation_window.num_seconds(),
        };
        if !matches!(order.status, OrderStatus::Pending | OrderStatus::Confirmed) {
            return Err(expired);
        }
        // A clock that runs behind the order's creation time counts as inside the window.
        let elapsed = change.requested_at - order.created_at;
        if elapsed >= self.cancellation_window {
            return Err(expired);
        }
        Ok(())
    }
}
