use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::info;

use bhojana_core::domain::coupon::{Coupon, CouponCode, DiscountType};
use bhojana_core::domain::money::Money;

use crate::repositories::{CouponRepository, RepositoryError};

/// Demo coupons covering both discount types, a usage-limited offer and an
/// inactive one.
///
/// Loading is idempotent: coupons are upserted by code, and a reload refreshes
/// their terms while keeping the usage already recorded.
pub struct DemoCoupons;

impl DemoCoupons {
    pub fn all(now: DateTime<Utc>) -> Vec<Coupon> {
        let valid_from = now - Duration::days(1);
        vec![
            Coupon {
                code: CouponCode("WELCOME50".to_string()),
                description: Some("Flat ₹50 off your first order".to_string()),
                discount_type: DiscountType::Fixed,
                discount_value: Decimal::from(50),
                min_order_amount: Money::from_major(199),
                max_discount_amount: None,
                valid_from,
                valid_until: now + Duration::days(90),
                usage_limit: None,
                used_count: 0,
                is_active: true,
            },
            Coupon {
                code: CouponCode("FEAST10".to_string()),
                description: Some("10% off up to ₹50".to_string()),
                discount_type: DiscountType::Percentage,
                discount_value: Decimal::from(10),
                min_order_amount: Money::from_major(300),
                max_discount_amount: Some(Money::from_major(50)),
                valid_from,
                valid_until: now + Duration::days(30),
                usage_limit: Some(100),
                used_count: 0,
                is_active: true,
            },
            Coupon {
                code: CouponCode("MONSOON20".to_string()),
                description: Some("Seasonal 20% off, paused".to_string()),
                discount_type: DiscountType::Percentage,
                discount_value: Decimal::from(20),
                min_order_amount: Money::from_major(500),
                max_discount_amount: Some(Money::from_major(150)),
                valid_from,
                valid_until: now + Duration::days(60),
                usage_limit: Some(50),
                used_count: 0,
                is_active: false,
            },
        ]
    }

    pub async fn load(
        repo: &dyn CouponRepository,
        now: DateTime<Utc>,
    ) -> Result<SeedResult, RepositoryError> {
        let mut coupons_seeded = Vec::new();
        for coupon in Self::all(now) {
            coupons_seeded.push(coupon.code.as_str().to_string());
            repo.save(coupon).await?;
        }

        info!(event_name = "fixtures.coupons.seeded", count = coupons_seeded.len(), "demo coupons loaded");
        Ok(SeedResult { coupons_seeded })
    }
}

#[derive(Debug)]
pub struct SeedResult {
    pub coupons_seeded: Vec<String>,
}
