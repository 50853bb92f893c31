use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use bhojana_core::domain::coupon::{Coupon, CouponCode};
use bhojana_core::domain::money::Money;
use bhojana_core::domain::order::{AgentId, Order, OrderId};

pub mod coupon;
pub mod memory;
pub mod order;

pub use coupon::SqlCouponRepository;
pub use memory::InMemoryStore;
pub use order::SqlOrderRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("stale write to {0}")]
    Conflict(String),
    #[error("coupon `{0}` can no longer be redeemed")]
    CouponUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    async fn find_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError>;
    /// Inserts or updates a coupon's terms. An existing coupon keeps its stored
    /// `used_count`; only order creation advances it. Lowering `usage_limit`
    /// below the stored count is a `Conflict`.
    async fn save(&self, coupon: Coupon) -> Result<(), RepositoryError>;
    async fn list(&self) -> Result<Vec<Coupon>, RepositoryError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Inserts a new order. With `redeem` set, the coupon's `used_count` is
    /// bumped in the same unit of work, but only while the coupon is active,
    /// inside its window at `order.created_at` and below its usage limit.
    /// Otherwise nothing is written and `CouponUnavailable` is returned.
    async fn create(&self, order: &Order, redeem: Option<&CouponCode>)
        -> Result<(), RepositoryError>;

    /// Overwrites the mutable fields of a stored order when the stored
    /// version still equals `expected_version`; `Conflict` otherwise.
    async fn update(&self, order: &Order, expected_version: u32) -> Result<(), RepositoryError>;

    async fn list_for_agent(&self, agent: &AgentId) -> Result<Vec<Order>, RepositoryError>;
}

pub(crate) fn encode_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn decode_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{value}`: {e}")))
}

pub(crate) fn decode_optional_timestamp(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(decode_timestamp).transpose()
}

pub(crate) fn encode_money(value: Money) -> Result<i64, RepositoryError> {
    i64::try_from(value.minor_units())
        .map_err(|_| RepositoryError::Decode(format!("amount {value} does not fit a column")))
}

pub(crate) fn decode_money(value: i64) -> Result<Money, RepositoryError> {
    u64::try_from(value)
        .map(Money::from_minor)
        .map_err(|_| RepositoryError::Decode(format!("negative amount {value} in column")))
}

pub(crate) fn decode_count(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::Decode(format!("{column} value {value} is out of range")))
}
