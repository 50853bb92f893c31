use std::collections::HashMap;

use tokio::sync::RwLock;
use uuid::Uuid;

use bhojana_core::domain::coupon::{Coupon, CouponCode};
use bhojana_core::domain::order::{AgentId, Order, OrderId};

use super::{CouponRepository, OrderRepository, RepositoryError};

#[derive(Default)]
struct State {
    coupons: HashMap<String, Coupon>,
    orders: HashMap<Uuid, Order>,
}

/// Coupons and orders behind one lock, so a redemption and its order insert
/// are observed together.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

#[async_trait::async_trait]
impl CouponRepository for InMemoryStore {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.coupons.get(code.as_str()).cloned())
    }

    async fn save(&self, mut coupon: Coupon) -> Result<(), RepositoryError> {
        coupon.check_invariants().map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let mut state = self.state.write().await;

        if let Some(stored) = state.coupons.get(coupon.code.as_str()) {
            if coupon.usage_limit.is_some_and(|limit| limit < stored.used_count) {
                return Err(RepositoryError::Conflict(format!(
                    "coupon `{}` is already used beyond its new usage limit",
                    coupon.code.as_str()
                )));
            }
            coupon.used_count = stored.used_count;
        }

        state.coupons.insert(coupon.code.as_str().to_string(), coupon);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let state = self.state.read().await;
        let mut coupons: Vec<Coupon> = state.coupons.values().cloned().collect();
        coupons.sort_by(|a, b| a.code.as_str().cmp(b.code.as_str()));
        Ok(coupons)
    }
}

#[async_trait::async_trait]
impl OrderRepository for InMemoryStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.orders.get(&id.0).cloned())
    }

    async fn create(
        &self,
        order: &Order,
        redeem: Option<&CouponCode>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;

        if state.orders.contains_key(&order.id.0) {
            return Err(RepositoryError::Conflict(format!("order {}", order.id)));
        }

        if let Some(code) = redeem {
            let coupon = state
                .coupons
                .get_mut(code.as_str())
                .filter(|coupon| {
                    coupon.is_active
                        && coupon.is_within_window(order.created_at)
                        && coupon.has_remaining_uses()
                })
                .ok_or_else(|| RepositoryError::CouponUnavailable(code.as_str().to_string()))?;
            coupon.used_count += 1;
        }

        state.orders.insert(order.id.0, order.clone());
        Ok(())
    }

    async fn update(&self, order: &Order, expected_version: u32) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        let stored = state
            .orders
            .get_mut(&order.id.0)
            .ok_or_else(|| RepositoryError::NotFound(format!("order {}", order.id)))?;

        if stored.version != expected_version {
            return Err(RepositoryError::Conflict(format!("order {}", order.id)));
        }
        *stored = order.clone();
        Ok(())
    }

    async fn list_for_agent(&self, agent: &AgentId) -> Result<Vec<Order>, RepositoryError> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|order| order.delivery_agent_id.as_ref() == Some(agent))
            .cloned()
            .collect();
        orders.sort_by_key(|order| order.created_at);
        Ok(orders)
    }
}
