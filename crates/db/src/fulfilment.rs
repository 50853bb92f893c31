use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use bhojana_core::commission::EarningsReport;
use bhojana_core::domain::money::Money;
use bhojana_core::domain::order::{AgentId, Order, OrderId};
use bhojana_core::errors::{ApplicationError, DomainError};
use bhojana_core::lifecycle::{OrderLifecycle, OrderTransitionError, StatusChange};

use crate::repositories::{OrderRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum FulfilmentError {
    #[error("order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error(transparent)]
    Transition(#[from] OrderTransitionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("order {0} was changed concurrently")]
    Conflict(OrderId),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<FulfilmentError> for ApplicationError {
    fn from(value: FulfilmentError) -> Self {
        match value {
            FulfilmentError::OrderNotFound(id) => Self::NotFound(format!("order {id} does not exist")),
            FulfilmentError::Transition(error) => DomainError::from(error).into(),
            FulfilmentError::Domain(error) => error.into(),
            FulfilmentError::Conflict(id) => Self::Conflict(format!("order {id}")),
            FulfilmentError::Repository(error) => Self::Persistence(error.to_string()),
        }
    }
}

/// Status changes, agent assignment and commission payouts for placed orders.
/// Every write is a read-modify-write guarded by the order version.
pub struct FulfilmentService {
    orders: Arc<dyn OrderRepository>,
    lifecycle: OrderLifecycle,
}

impl FulfilmentService {
    pub fn new(orders: Arc<dyn OrderRepository>, lifecycle: OrderLifecycle) -> Self {
        Self { orders, lifecycle }
    }

    pub fn lifecycle(&self) -> &OrderLifecycle {
        &self.lifecycle
    }

    pub async fn update_status(
        &self,
        id: &OrderId,
        change: StatusChange,
    ) -> Result<Order, FulfilmentError> {
        let mut order = self.load(id).await?;
        let expected_version = order.version;
        let outcome = self.lifecycle.transition(&order, &change)?;
        order.apply(&outcome)?;

        self.store(&order, expected_version).await?;
        info!(
            event_name = "fulfilment.transition.applied",
            order_id = %order.id,
            from = %outcome.from,
            to = %outcome.to,
            actor = %outcome.actor,
            commission = %outcome.commission.unwrap_or(Money::ZERO),
            "order status changed"
        );
        Ok(order)
    }

    pub async fn assign_agent(
        &self,
        id: &OrderId,
        agent: AgentId,
        at: DateTime<Utc>,
    ) -> Result<Order, FulfilmentError> {
        let mut order = self.load(id).await?;
        let expected_version = order.version;
        order.assign_agent(agent, at)?;

        self.store(&order, expected_version).await?;
        info!(
            event_name = "fulfilment.agent.assigned",
            order_id = %order.id,
            agent_id = order.delivery_agent_id.as_ref().map(|agent| agent.0.as_str()).unwrap_or(""),
            "delivery agent assigned"
        );
        Ok(order)
    }

    /// Marks the commission of a closed order as paid out and returns the
    /// amount.
    pub async fn pay_commission(
        &self,
        id: &OrderId,
        at: DateTime<Utc>,
    ) -> Result<Money, FulfilmentError> {
        let mut order = self.load(id).await?;
        let expected_version = order.version;
        let amount = order.mark_commission_paid(at)?;

        self.store(&order, expected_version).await?;
        info!(
            event_name = "fulfilment.commission.paid",
            order_id = %order.id,
            amount = %amount,
            "commission paid"
        );
        Ok(amount)
    }

    pub async fn earnings_report(&self, agent: &AgentId) -> Result<EarningsReport, FulfilmentError> {
        let orders = self.orders.list_for_agent(agent).await.map_err(FulfilmentError::Repository)?;
        Ok(EarningsReport::build(agent, &orders, self.lifecycle.commission_policy()))
    }

    async fn load(&self, id: &OrderId) -> Result<Order, FulfilmentError> {
        self.orders
            .find_by_id(id)
            .await
            .map_err(FulfilmentError::Repository)?
            .ok_or(FulfilmentError::OrderNotFound(*id))
    }

    async fn store(&self, order: &Order, expected_version: u32) -> Result<(), FulfilmentError> {
        match self.orders.update(order, expected_version).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::Conflict(_)) => {
                warn!(
                    event_name = "fulfilment.transition.conflicted",
                    order_id = %order.id,
                    expected_version,
                    "order was changed concurrently"
                );
                Err(FulfilmentError::Conflict(order.id))
            }
            Err(RepositoryError::NotFound(_)) => Err(FulfilmentError::OrderNotFound(order.id)),
            Err(error) => Err(FulfilmentError::Repository(error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use bhojana_core::domain::cart::{Cart, FoodItemId, LineItem};
    use bhojana_core::domain::coupon::CouponCode;
    use bhojana_core::domain::money::Money;
    use bhojana_core::domain::order::{
        AgentId, CustomerId, Order, OrderId, OrderStatus, PaymentMethod,
    };
    use bhojana_core::errors::{ApplicationError, DomainError};
    use bhojana_core::lifecycle::{Actor, OrderLifecycle, OrderTransitionError, StatusChange};
    use bhojana_core::pricing::{DeterministicPricingEngine, PricingEngine};

    use super::{FulfilmentError, FulfilmentService};
    use crate::repositories::{InMemoryStore, OrderRepository, RepositoryError};

    fn placed_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 2, 19, 30, 0).single().expect("date")
    }

    fn order() -> Order {
        let cart = Cart::new(vec![
            LineItem::new(FoodItemId("thali".to_string()), Money::from_major(500), 2).expect("line"),
        ]);
        let pricing = DeterministicPricingEngine::default().price(&cart, None);
        Order::place(
            OrderId::generate(),
            CustomerId("cust-1".to_string()),
            &cart,
            pricing,
            None,
            PaymentMethod::CashOnDelivery,
            placed_at(),
        )
        .expect("place")
    }

    async fn service_with(order: &Order) -> (FulfilmentService, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::default());
        store.create(order, None).await.expect("create");
        (FulfilmentService::new(store.clone(), OrderLifecycle::default()), store)
    }

    fn rider() -> AgentId {
        AgentId("rider-7".to_string())
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        placed_at() + Duration::minutes(minutes)
    }

    #[tokio::test]
    async fn order_moves_through_delivery_and_pays_out() {
        let order = order();
        let (service, store) = service_with(&order).await;

        for (target, minute) in [(OrderStatus::Confirmed, 1), (OrderStatus::Preparing, 3)] {
            service
                .update_status(&order.id, StatusChange::new(target, Actor::Admin, at(minute)))
                .await
                .expect("kitchen step");
        }
        service.assign_agent(&order.id, rider(), at(4)).await.expect("assign");
        service
            .update_status(
                &order.id,
                StatusChange::new(OrderStatus::OutForDelivery, Actor::DeliveryAgent(rider()), at(20)),
            )
            .await
            .expect("dispatch");
        let delivered = service
            .update_status(
                &order.id,
                StatusChange::new(OrderStatus::Delivered, Actor::DeliveryAgent(rider()), at(45)),
            )
            .await
            .expect("deliver");

        assert_eq!(delivered.status, OrderStatus::Delivered);
        assert_eq!(delivered.delivered_at, Some(at(45)));
        assert_eq!(delivered.commission_amount, Some(Money::from_minor(11_844)));

        let paid = service.pay_commission(&order.id, at(60)).await.expect("pay");
        assert_eq!(paid, Money::from_minor(11_844));

        let stored = store.find_by_id(&order.id).await.expect("find").expect("order");
        assert!(stored.commission_paid);
        assert_eq!(stored.version, 6);
    }

    #[tokio::test]
    async fn commission_cannot_be_paid_twice() {
        let order = order();
        let (service, _) = service_with(&order).await;
        service.assign_agent(&order.id, rider(), at(1)).await.expect("assign");
        service
            .update_status(&order.id, StatusChange::new(OrderStatus::Cancelled, Actor::Admin, at(2)))
            .await
            .expect("cancel");

        assert_eq!(
            service.pay_commission(&order.id, at(3)).await.expect("pay"),
            Money::from_minor(5_922)
        );
        assert!(matches!(
            service.pay_commission(&order.id, at(4)).await,
            Err(FulfilmentError::Domain(DomainError::InvariantViolation(_)))
        ));
    }

    #[tokio::test]
    async fn late_customer_cancellation_is_rejected_and_not_stored() {
        let order = order();
        let (service, store) = service_with(&order).await;

        let change = StatusChange::new(
            OrderStatus::Cancelled,
            Actor::Customer(CustomerId("cust-1".to_string())),
            at(5),
        )
        .with_reason("changed my mind");
        let result = service.update_status(&order.id, change).await;

        assert!(matches!(
            result,
            Err(FulfilmentError::Transition(OrderTransitionError::CancellationWindowExpired {
                window_secs: 300
            }))
        ));
        let stored = store.find_by_id(&order.id).await.expect("find").expect("order");
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn unknown_order_is_reported() {
        let (service, _) = service_with(&order()).await;
        let missing = OrderId::generate();

        let result = service
            .update_status(&missing, StatusChange::new(OrderStatus::Confirmed, Actor::Admin, at(1)))
            .await;

        assert!(matches!(result, Err(FulfilmentError::OrderNotFound(id)) if id == missing));
    }

    /// Returns a stored order but always loses the version race on write.
    struct RacingRepository {
        order: Order,
    }

    #[async_trait]
    impl OrderRepository for RacingRepository {
        async fn find_by_id(&self, _id: &OrderId) -> Result<Option<Order>, RepositoryError> {
            Ok(Some(self.order.clone()))
        }

        async fn create(
            &self,
            _order: &Order,
            _redeem: Option<&CouponCode>,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn update(&self, order: &Order, _expected: u32) -> Result<(), RepositoryError> {
            Err(RepositoryError::Conflict(format!("order {}", order.id)))
        }

        async fn list_for_agent(&self, _agent: &AgentId) -> Result<Vec<Order>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn lost_version_race_surfaces_as_conflict() {
        let order = order();
        let service = FulfilmentService::new(
            Arc::new(RacingRepository { order: order.clone() }),
            OrderLifecycle::default(),
        );

        let error = service
            .update_status(&order.id, StatusChange::new(OrderStatus::Confirmed, Actor::Admin, at(1)))
            .await
            .expect_err("conflict");

        assert!(matches!(error, FulfilmentError::Conflict(id) if id == order.id));
        assert!(matches!(ApplicationError::from(error), ApplicationError::Conflict(_)));
    }

    #[tokio::test]
    async fn earnings_report_covers_closed_orders_of_the_agent() {
        let order = order();
        let (service, _) = service_with(&order).await;
        service.assign_agent(&order.id, rider(), at(1)).await.expect("assign");
        for target in [OrderStatus::Confirmed, OrderStatus::Preparing, OrderStatus::OutForDelivery] {
            service
                .update_status(&order.id, StatusChange::new(target, Actor::Admin, at(10)))
                .await
                .expect("advance");
        }
        service
            .update_status(
                &order.id,
                StatusChange::new(OrderStatus::Returned, Actor::DeliveryAgent(rider()), at(40)),
            )
            .await
            .expect("return");

        let report = service.earnings_report(&rider()).await.expect("report");

        assert_eq!(report.returned_orders, 1);
        assert_eq!(report.total_commission, Money::from_minor(5_922));
        assert_eq!(report.pending_commission, Money::from_minor(5_922));
        assert_eq!(report.cash_on_delivery_commission, Money::from_minor(5_922));
    }
}
