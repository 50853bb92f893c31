pub mod coupon;
pub mod engine;
pub mod policy;

pub use coupon::{CouponError, CouponValidator, StandardCouponValidator, ValidatedCoupon};
pub use engine::{
    DeterministicPricingEngine, PriceBreakdown, PricingEngine, PricingResult, PricingTrace,
    PricingTraceStep,
};
pub use policy::{DiscountTier, PricingPolicy};
