pub mod commission;
pub mod config;
pub mod domain;
pub mod errors;
pub mod lifecycle;
pub mod pricing;

pub use commission::{CommissionPolicy, EarningsReport};
pub use domain::cart::{Cart, FoodItemId, LineItem};
pub use domain::coupon::{Coupon, CouponCode, DiscountType};
pub use domain::money::{Money, MoneyError};
pub use domain::order::{
    AgentId, CustomerId, Order, OrderId, OrderItem, OrderStatus, PaymentMethod,
};
pub use errors::{ApplicationError, DomainError};
pub use lifecycle::{Actor, ActorRole, OrderLifecycle, OrderTransitionError, StatusChange};
pub use pricing::{
    CouponError, CouponValidator, DeterministicPricingEngine, PriceBreakdown, PricingEngine,
    PricingPolicy, StandardCouponValidator, ValidatedCoupon,
};
