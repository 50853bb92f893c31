use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::cart::Cart;
use crate::domain::money::Money;
use crate::pricing::coupon::ValidatedCoupon;
use crate::pricing::policy::PricingPolicy;

pub const CURRENCY: &str = "INR";

/// Frozen invoice figures for one order.
///
/// `total == subtotal - tier_discount - coupon_discount + tax + delivery_fee`
/// holds exactly for every breakdown produced by [`price`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Money,
    pub tier_discount: Money,
    pub coupon_discount: Money,
    pub taxable_amount: Money,
    pub tax: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl PriceBreakdown {
    pub fn is_consistent(&self) -> bool {
        let discounts = self.tier_discount.add(self.coupon_discount);
        discounts <= self.subtotal
            && self.taxable_amount == self.subtotal.subtract(discounts)
            && self.total == self.taxable_amount.add(self.tax).add(self.delivery_fee)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTraceStep {
    pub stage: String,
    pub detail: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTrace {
    pub currency: String,
    pub tier_rate: Decimal,
    pub steps: Vec<PricingTraceStep>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingResult {
    pub breakdown: PriceBreakdown,
    pub trace: PricingTrace,
}

pub trait PricingEngine: Send + Sync {
    fn price(&self, cart: &Cart, coupon: Option<&ValidatedCoupon>) -> PriceBreakdown;
}

#[derive(Clone, Debug, Default)]
pub struct DeterministicPricingEngine {
    policy: PricingPolicy,
}

impl DeterministicPricingEngine {
    pub fn new(policy: PricingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn price_with_trace(&self, cart: &Cart, coupon: Option<&ValidatedCoupon>) -> PricingResult {
        price_with_trace(&self.policy, cart, coupon)
    }
}

impl PricingEngine for DeterministicPricingEngine {
    fn price(&self, cart: &Cart, coupon: Option<&ValidatedCoupon>) -> PriceBreakdown {
        price(&self.policy, cart, coupon)
    }
}

pub fn price(
    policy: &PricingPolicy,
    cart: &Cart,
    coupon: Option<&ValidatedCoupon>,
) -> PriceBreakdown {
    price_with_trace(policy, cart, coupon).breakdown
}

pub fn price_with_trace(
    policy: &PricingPolicy,
    cart: &Cart,
    coupon: Option<&ValidatedCoupon>,
) -> PricingResult {
    let subtotal = cart.subtotal();
    let tier_rate = policy.tier_discount_rate(subtotal);
    let tier_discount = subtotal.multiply_by_rate(tier_rate);
    // The coupon may only consume what the tier discount left over.
    let coupon_discount = coupon
        .map(|coupon| coupon.discount.min(subtotal.subtract(tier_discount)))
        .unwrap_or(Money::ZERO);
    let taxable_amount = subtotal.subtract(tier_discount).subtract(coupon_discount);
    let tax = policy.gst(taxable_amount);
    let delivery_fee = policy.delivery_fee(subtotal);
    let total = taxable_amount.add(tax).add(delivery_fee);

    let mut steps = vec![
        step("subtotal", "sum(unit_price * quantity)".to_string(), subtotal),
        step("tier_discount", format!("subtotal * {}", tier_rate.normalize()), tier_discount),
    ];
    if let Some(coupon) = coupon {
        steps.push(step("coupon_discount", format!("coupon {}", coupon.code.0), coupon_discount));
    }
    steps.extend([
        step("taxable_amount", "subtotal - discounts".to_string(), taxable_amount),
        step("tax", format!("taxable_amount * {}", policy.gst_rate.normalize()), tax),
        step(
            "delivery_fee",
            format!("subtotal < {}", policy.free_delivery_threshold),
            delivery_fee,
        ),
        step("total", "taxable_amount + tax + delivery_fee".to_string(), total),
    ]);

    PricingResult {
        breakdown: PriceBreakdown {
            subtotal,
            tier_discount,
            coupon_discount,
            taxable_amount,
            tax,
            delivery_fee,
            total,
        },
        trace: PricingTrace { currency: CURRENCY.to_string(), tier_rate, steps },
    }
}

fn step(stage: &str, detail: String, amount: Money) -> PricingTraceStep {
    PricingTraceStep { stage: stage.to_string(), detail, amount }
}

#[cfg(test)]
mod tests {
    use crate::domain::cart::{Cart, FoodItemId, LineItem};
    use crate::domain::coupon::CouponCode;
    use crate::domain::money::Money;
    use crate::pricing::coupon::ValidatedCoupon;
    use crate::pricing::engine::{DeterministicPricingEngine, PricingEngine};

    fn cart(lines: &[(u64, u32)]) -> Cart {
        Cart::new(
            lines
                .iter()
                .enumerate()
                .map(|(index, (paise, quantity))| {
                    LineItem::new(
                        FoodItemId(format!("item-{index}")),
                        Money::from_minor(*paise),
                        *quantity,
                    )
                    .expect("valid line")
                })
                .collect(),
        )
    }

    fn coupon(discount: Money) -> ValidatedCoupon {
        ValidatedCoupon { code: CouponCode("FEAST10".to_string()), discount }
    }

    #[test]
    fn small_order_without_coupon() {
        let engine = DeterministicPricingEngine::default();
        let breakdown = engine.price(&cart(&[(7_500, 2)]), None);

        assert_eq!(breakdown.subtotal, Money::from_major(150));
        assert_eq!(breakdown.tier_discount, Money::from_major(3));
        assert_eq!(breakdown.coupon_discount, Money::ZERO);
        assert_eq!(breakdown.taxable_amount, Money::from_major(147));
        assert_eq!(breakdown.tax, Money::from_minor(735));
        assert_eq!(breakdown.delivery_fee, Money::from_major(30));
        assert_eq!(breakdown.total, Money::from_minor(18_435));
        assert!(breakdown.is_consistent());
    }

    #[test]
    fn large_order_with_capped_percentage_coupon() {
        let engine = DeterministicPricingEngine::default();
        let breakdown =
            engine.price(&cart(&[(40_000, 3)]), Some(&coupon(Money::from_major(50))));

        assert_eq!(breakdown.subtotal, Money::from_major(1200));
        assert_eq!(breakdown.tier_discount, Money::from_major(72));
        assert_eq!(breakdown.coupon_discount, Money::from_major(50));
        assert_eq!(breakdown.taxable_amount, Money::from_major(1078));
        assert_eq!(breakdown.tax, Money::from_minor(5_390));
        assert_eq!(breakdown.delivery_fee, Money::ZERO);
        assert_eq!(breakdown.total, Money::from_minor(113_190));
    }

    #[test]
    fn float_adversarial_amounts_stay_exact() {
        let engine = DeterministicPricingEngine::default();
        let breakdown = engine.price(&cart(&[(10, 1), (20, 1)]), None);

        assert_eq!(breakdown.subtotal, Money::from_minor(30));
        // 0.30 * 2% = 0.006 -> 0.01
        assert_eq!(breakdown.tier_discount, Money::from_minor(1));
        assert_eq!(breakdown.taxable_amount, Money::from_minor(29));
        // 0.29 * 5% = 0.0145 -> 0.01
        assert_eq!(breakdown.tax, Money::from_minor(1));
        assert_eq!(breakdown.total, Money::from_minor(3_030));
        assert!(breakdown.is_consistent());
    }

    #[test]
    fn total_identity_holds_across_many_carts() {
        let engine = DeterministicPricingEngine::default();

        for paise in (1..=250_000u64).step_by(1_337) {
            for discount in [Money::ZERO, Money::from_minor(1_999), Money::from_major(5_000)] {
                let breakdown = engine.price(&cart(&[(paise, 1), (33, 3)]), Some(&coupon(discount)));
                assert!(breakdown.is_consistent(), "inconsistent breakdown {breakdown:?}");

                let recomposed = breakdown
                    .subtotal
                    .subtract(breakdown.tier_discount)
                    .subtract(breakdown.coupon_discount)
                    .add(breakdown.tax)
                    .add(breakdown.delivery_fee);
                assert_eq!(recomposed, breakdown.total);
            }
        }
    }

    #[test]
    fn oversized_coupon_saturates_taxable_amount_at_zero() {
        let engine = DeterministicPricingEngine::default();
        let breakdown = engine.price(&cart(&[(10_000, 1)]), Some(&coupon(Money::from_major(100))));

        assert_eq!(breakdown.tier_discount, Money::from_major(2));
        assert_eq!(breakdown.coupon_discount, Money::from_major(98));
        assert_eq!(breakdown.taxable_amount, Money::ZERO);
        assert_eq!(breakdown.tax, Money::ZERO);
        assert_eq!(breakdown.total, Money::from_major(30));
        assert!(breakdown.is_consistent());
    }

    #[test]
    fn pricing_is_idempotent() {
        let engine = DeterministicPricingEngine::default();
        let cart = cart(&[(12_345, 2), (999, 7)]);
        let coupon = coupon(Money::from_major(25));

        let first = engine.price_with_trace(&cart, Some(&coupon));
        let second = engine.price_with_trace(&cart, Some(&coupon));

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).expect("serialize"),
            serde_json::to_vec(&second).expect("serialize")
        );
    }

    #[test]
    fn trace_records_every_stage_in_order() {
        let engine = DeterministicPricingEngine::default();
        let result = engine.price_with_trace(&cart(&[(7_500, 2)]), Some(&coupon(Money::ZERO)));
        let stages: Vec<&str> = result.trace.steps.iter().map(|step| step.stage.as_str()).collect();

        assert_eq!(
            stages,
            [
                "subtotal",
                "tier_discount",
                "coupon_discount",
                "taxable_amount",
                "tax",
                "delivery_fee",
                "total"
            ]
        );
        assert_eq!(result.trace.currency, "INR");
        assert_eq!(result.trace.steps.last().map(|step| step.amount), Some(result.breakdown.total));
    }
}
