use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use bhojana_core::domain::coupon::{Coupon, CouponCode, DiscountType};

use super::{
    decode_count, decode_money, decode_timestamp, encode_money, encode_timestamp,
    CouponRepository, RepositoryError,
};
use crate::DbPool;

const COUPON_COLUMNS: &str = "code, description, discount_type, discount_value, min_order_amount,
    max_discount_amount, valid_from, valid_until, usage_limit, used_count, is_active";

pub struct SqlCouponRepository {
    pool: DbPool,
}

impl SqlCouponRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_coupon(row: &SqliteRow) -> Result<Coupon, RepositoryError> {
    let code: String = row.try_get("code")?;
    let discount_type: String = row.try_get("discount_type")?;
    let discount_value: String = row.try_get("discount_value")?;
    let max_discount_amount: Option<i64> = row.try_get("max_discount_amount")?;
    let valid_from: String = row.try_get("valid_from")?;
    let valid_until: String = row.try_get("valid_until")?;
    let usage_limit: Option<i64> = row.try_get("usage_limit")?;

    Ok(Coupon {
        code: CouponCode(code),
        description: row.try_get("description")?,
        discount_type: DiscountType::parse(&discount_type).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown discount type `{discount_type}`"))
        })?,
        discount_value: discount_value.parse::<Decimal>().map_err(|e| {
            RepositoryError::Decode(format!("invalid discount value `{discount_value}`: {e}"))
        })?,
        min_order_amount: decode_money(row.try_get("min_order_amount")?)?,
        max_discount_amount: max_discount_amount.map(decode_money).transpose()?,
        valid_from: decode_timestamp(&valid_from)?,
        valid_until: decode_timestamp(&valid_until)?,
        usage_limit: usage_limit.map(|limit| decode_count("usage_limit", limit)).transpose()?,
        used_count: decode_count("used_count", row.try_get("used_count")?)?,
        is_active: row.try_get("is_active")?,
    })
}

#[async_trait::async_trait]
impl CouponRepository for SqlCouponRepository {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {COUPON_COLUMNS} FROM coupon WHERE code = ?"))
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_coupon).transpose()
    }

    async fn save(&self, coupon: Coupon) -> Result<(), RepositoryError> {
        coupon.check_invariants().map_err(|e| RepositoryError::Decode(e.to_string()))?;
        let max_discount_amount = coupon.max_discount_amount.map(encode_money).transpose()?;

        let result = sqlx::query(
            "INSERT INTO coupon (code, description, discount_type, discount_value, min_order_amount,
                                 max_discount_amount, valid_from, valid_until, usage_limit,
                                 used_count, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(code) DO UPDATE SET
                 description = excluded.description,
                 discount_type = excluded.discount_type,
                 discount_value = excluded.discount_value,
                 min_order_amount = excluded.min_order_amount,
                 max_discount_amount = excluded.max_discount_amount,
                 valid_from = excluded.valid_from,
                 valid_until = excluded.valid_until,
                 usage_limit = excluded.usage_limit,
                 is_active = excluded.is_active
             WHERE excluded.usage_limit IS NULL OR excluded.usage_limit >= coupon.used_count",
        )
        .bind(coupon.code.as_str())
        .bind(&coupon.description)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_value.to_string())
        .bind(encode_money(coupon.min_order_amount)?)
        .bind(max_discount_amount)
        .bind(encode_timestamp(coupon.valid_from))
        .bind(encode_timestamp(coupon.valid_until))
        .bind(coupon.usage_limit.map(i64::from))
        .bind(i64::from(coupon.used_count))
        .bind(coupon.is_active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "coupon `{}` is already used beyond its new usage limit",
                coupon.code.as_str()
            )));
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {COUPON_COLUMNS} FROM coupon ORDER BY code ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_coupon).collect()
    }
}
