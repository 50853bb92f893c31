use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use uuid::Uuid;

use bhojana_core::domain::cart::FoodItemId;
use bhojana_core::domain::coupon::CouponCode;
use bhojana_core::domain::order::{
    AgentId, CustomerId, Order, OrderId, OrderItem, OrderStatus, PaymentMethod,
};
use bhojana_core::pricing::PriceBreakdown;

use super::{
    decode_count, decode_money, decode_optional_timestamp, decode_timestamp, encode_money,
    encode_timestamp, OrderRepository, RepositoryError,
};
use crate::DbPool;

const ORDER_COLUMNS: &str = "id, customer_id, status, payment_method, coupon_code, subtotal,
    discount_amount, coupon_discount, taxable_amount, gst_amount, delivery_charge, total_amount,
    delivery_agent_id, assigned_at, created_at, dispatched_at, delivered_at, closed_at,
    cancel_reason, commission_amount, commission_paid, commission_paid_at, version";

pub struct SqlOrderRepository {
    pool: DbPool,
}

impl SqlOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_id: &str) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT food_item_id, quantity, unit_price FROM order_item
             WHERE order_id = ? ORDER BY position ASC",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<OrderItem, RepositoryError> {
                Ok(OrderItem {
                    food_item_id: FoodItemId(row.try_get("food_item_id")?),
                    quantity: decode_count("quantity", row.try_get("quantity")?)?,
                    unit_price: decode_money(row.try_get("unit_price")?)?,
                })
            })
            .collect()
    }

    async fn hydrate(&self, row: &SqliteRow) -> Result<Order, RepositoryError> {
        let id: String = row.try_get("id")?;
        let items = self.load_items(&id).await?;
        row_to_order(row, items)
    }
}

fn row_to_order(row: &SqliteRow, items: Vec<OrderItem>) -> Result<Order, RepositoryError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let payment_method: String = row.try_get("payment_method")?;
    let created_at: String = row.try_get("created_at")?;
    let commission_amount: Option<i64> = row.try_get("commission_amount")?;
    let version: i64 = row.try_get("version")?;

    Ok(Order {
        id: OrderId(
            Uuid::parse_str(&id)
                .map_err(|e| RepositoryError::Decode(format!("invalid order id `{id}`: {e}")))?,
        ),
        customer_id: CustomerId(row.try_get("customer_id")?),
        status: OrderStatus::parse(&status)
            .ok_or_else(|| RepositoryError::Decode(format!("unknown order status `{status}`")))?,
        payment_method: PaymentMethod::parse(&payment_method).ok_or_else(|| {
            RepositoryError::Decode(format!("unknown payment method `{payment_method}`"))
        })?,
        items,
        pricing: PriceBreakdown {
            subtotal: decode_money(row.try_get("subtotal")?)?,
            tier_discount: decode_money(row.try_get("discount_amount")?)?,
            coupon_discount: decode_money(row.try_get("coupon_discount")?)?,
            taxable_amount: decode_money(row.try_get("taxable_amount")?)?,
            tax: decode_money(row.try_get("gst_amount")?)?,
            delivery_fee: decode_money(row.try_get("delivery_charge")?)?,
            total: decode_money(row.try_get("total_amount")?)?,
        },
        coupon_code: row.try_get::<Option<String>, _>("coupon_code")?.map(CouponCode),
        delivery_agent_id: row.try_get::<Option<String>, _>("delivery_agent_id")?.map(AgentId),
        assigned_at: decode_optional_timestamp(row.try_get("assigned_at")?)?,
        created_at: decode_timestamp(&created_at)?,
        dispatched_at: decode_optional_timestamp(row.try_get("dispatched_at")?)?,
        delivered_at: decode_optional_timestamp(row.try_get("delivered_at")?)?,
        closed_at: decode_optional_timestamp(row.try_get("closed_at")?)?,
        cancel_reason: row.try_get("cancel_reason")?,
        commission_amount: commission_amount.map(decode_money).transpose()?,
        commission_paid: row.try_get("commission_paid")?,
        commission_paid_at: decode_optional_timestamp(row.try_get("commission_paid_at")?)?,
        version: decode_count("version", version)?,
    })
}

async fn redeem_coupon(
    tx: &mut Transaction<'_, Sqlite>,
    code: &CouponCode,
    order: &Order,
) -> Result<(), RepositoryError> {
    let at = encode_timestamp(order.created_at);
    let redeemed = sqlx::query(
        "UPDATE coupon SET used_count = used_count + 1
         WHERE code = ?
           AND is_active = 1
           AND valid_from <= ?
           AND valid_until >= ?
           AND (usage_limit IS NULL OR used_count < usage_limit)",
    )
    .bind(code.as_str())
    .bind(&at)
    .bind(&at)
    .execute(&mut **tx)
    .await?;

    if redeemed.rows_affected() == 0 {
        return Err(RepositoryError::CouponUnavailable(code.as_str().to_string()));
    }
    Ok(())
}

#[async_trait::async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
            .bind(id.0.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn create(
        &self,
        order: &Order,
        redeem: Option<&CouponCode>,
    ) -> Result<(), RepositoryError> {
        let id = order.id.0.to_string();
        let mut tx = self.pool.begin().await?;

        // Dropping `tx` on an early return rolls the redemption back.
        if let Some(code) = redeem {
            redeem_coupon(&mut tx, code, order).await?;
        }

        sqlx::query(
            "INSERT INTO orders (id, customer_id, status, payment_method, coupon_code, subtotal,
                                 discount_amount, coupon_discount, taxable_amount, gst_amount,
                                 delivery_charge, total_amount, delivery_agent_id, assigned_at,
                                 created_at, dispatched_at, delivered_at, closed_at, cancel_reason,
                                 commission_amount, commission_paid, commission_paid_at, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&order.customer_id.0)
        .bind(order.status.as_str())
        .bind(order.payment_method.as_str())
        .bind(order.coupon_code.as_ref().map(CouponCode::as_str))
        .bind(encode_money(order.pricing.subtotal)?)
        .bind(encode_money(order.pricing.tier_discount)?)
        .bind(encode_money(order.pricing.coupon_discount)?)
        .bind(encode_money(order.pricing.taxable_amount)?)
        .bind(encode_money(order.pricing.tax)?)
        .bind(encode_money(order.pricing.delivery_fee)?)
        .bind(encode_money(order.pricing.total)?)
        .bind(order.delivery_agent_id.as_ref().map(|agent| agent.0.as_str()))
        .bind(order.assigned_at.map(encode_timestamp))
        .bind(encode_timestamp(order.created_at))
        .bind(order.dispatched_at.map(encode_timestamp))
        .bind(order.delivered_at.map(encode_timestamp))
        .bind(order.closed_at.map(encode_timestamp))
        .bind(&order.cancel_reason)
        .bind(order.commission_amount.map(encode_money).transpose()?)
        .bind(order.commission_paid)
        .bind(order.commission_paid_at.map(encode_timestamp))
        .bind(i64::from(order.version))
        .execute(&mut *tx)
        .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_item (order_id, position, food_item_id, quantity, unit_price)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(&item.food_item_id.0)
            .bind(i64::from(item.quantity))
            .bind(encode_money(item.unit_price)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, order: &Order, expected_version: u32) -> Result<(), RepositoryError> {
        let updated = sqlx::query(
            "UPDATE orders SET
                 status = ?,
                 delivery_agent_id = ?,
                 assigned_at = ?,
                 dispatched_at = ?,
                 delivered_at = ?,
                 closed_at = ?,
                 cancel_reason = ?,
                 commission_amount = ?,
                 commission_paid = ?,
                 commission_paid_at = ?,
                 version = ?
             WHERE id = ? AND version = ?",
        )
        .bind(order.status.as_str())
        .bind(order.delivery_agent_id.as_ref().map(|agent| agent.0.as_str()))
        .bind(order.assigned_at.map(encode_timestamp))
        .bind(order.dispatched_at.map(encode_timestamp))
        .bind(order.delivered_at.map(encode_timestamp))
        .bind(order.closed_at.map(encode_timestamp))
        .bind(&order.cancel_reason)
        .bind(order.commission_amount.map(encode_money).transpose()?)
        .bind(order.commission_paid)
        .bind(order.commission_paid_at.map(encode_timestamp))
        .bind(i64::from(order.version))
        .bind(order.id.0.to_string())
        .bind(i64::from(expected_version))
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM orders WHERE id = ?)")
                .bind(order.id.0.to_string())
                .fetch_one(&self.pool)
                .await?;
            if exists == 0 {
                return Err(RepositoryError::NotFound(format!("order {}", order.id)));
            }
            return Err(RepositoryError::Conflict(format!("order {}", order.id)));
        }
        Ok(())
    }

    async fn list_for_agent(&self, agent: &AgentId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE delivery_agent_id = ? ORDER BY created_at ASC"
        ))
        .bind(&agent.0)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            orders.push(self.hydrate(row).await?);
        }
        Ok(orders)
    }
}
