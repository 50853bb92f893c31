use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::domain::order::{AgentId, CustomerId, OrderId, OrderStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Customer,
    Admin,
    DeliveryAgent,
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Customer => "customer",
            Self::Admin => "admin",
            Self::DeliveryAgent => "delivery_agent",
        })
    }
}

/// Who is asking for a status change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Actor {
    Customer(CustomerId),
    Admin,
    DeliveryAgent(AgentId),
}

impl Actor {
    pub fn role(&self) -> ActorRole {
        match self {
            Self::Customer(_) => ActorRole::Customer,
            Self::Admin => ActorRole::Admin,
            Self::DeliveryAgent(_) => ActorRole::DeliveryAgent,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub target: OrderStatus,
    pub actor: Actor,
    pub requested_at: DateTime<Utc>,
    pub reason: Option<String>,
}

impl StatusChange {
    pub fn new(target: OrderStatus, actor: Actor, requested_at: DateTime<Utc>) -> Self {
        Self { target, actor, requested_at, reason: None }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// The accepted result of a status change, ready to be applied to the order
/// it was computed for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub order_id: OrderId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor: ActorRole,
    pub at: DateTime<Utc>,
    /// Set when `to` is terminal.
    pub commission: Option<Money>,
    pub reason: Option<String>,
}
