use std::sync::Arc;

use anyhow::{anyhow, Context};
use bhojana_core::{Cart, DeterministicPricingEngine, FoodItemId, LineItem, Money};
use bhojana_db::repositories::{SqlCouponRepository, SqlOrderRepository};
use bhojana_db::CheckoutService;
use chrono::Utc;
use serde_json::json;

use crate::commands::{
    load_config, open_database, rejected, runtime, to_json, CommandResult, Failure,
};

pub fn run(items: &[String], coupon: Option<&str>) -> CommandResult {
    let cart = match parse_cart(items) {
        Ok(cart) => cart,
        Err(error) => return CommandResult::failure("quote", "invalid_input", format!("{error:#}"), 6),
    };
    let config = match load_config("quote") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("quote") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let checkout = CheckoutService::new(
            Arc::new(SqlCouponRepository::new(pool.clone())),
            Arc::new(SqlOrderRepository::new(pool.clone())),
            DeterministicPricingEngine::new(config.pricing_policy()),
        );
        let preview = checkout.preview(&cart, coupon, Utc::now()).await;
        pool.close().await;

        let preview = preview.map_err(|error| rejected("quote", error))?;
        let rejection = preview.coupon_rejection.as_ref().map(|reason| reason.user_message());
        let data = json!({
            "breakdown": to_json(&preview.pricing.breakdown)?,
            "trace": to_json(&preview.pricing.trace)?,
            "coupon": to_json(&preview.coupon)?,
            "coupon_rejection": rejection,
        });
        Ok::<_, Failure>((preview.pricing.breakdown.total, rejection, data))
    });

    match result {
        Ok((total, rejection, data)) => {
            let message = match rejection {
                Some(reason) => format!("total {total} INR (coupon not applied: {reason})"),
                None => format!("total {total} INR"),
            };
            CommandResult::success_with_data("quote", message, Some(data))
        }
        Err(failure) => CommandResult::from_failure("quote", failure),
    }
}

fn parse_cart(items: &[String]) -> anyhow::Result<Cart> {
    let lines = items
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_item(index, raw).with_context(|| format!("invalid item `{raw}`")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Cart::new(lines))
}

/// `PRICExQTY`, e.g. `250x2` or `99.50x1`.
fn parse_item(index: usize, raw: &str) -> anyhow::Result<LineItem> {
    let (price, quantity) =
        raw.trim().rsplit_once(['x', 'X']).ok_or_else(|| anyhow!("expected PRICExQTY"))?;
    let unit_price: Money = price.parse().context("unit price")?;
    let quantity: u32 = quantity.trim().parse().context("quantity")?;
    Ok(LineItem::new(FoodItemId(format!("item-{}", index + 1)), unit_price, quantity)?)
}

#[cfg(test)]
mod tests {
    use bhojana_core::Money;

    use super::parse_cart;

    #[test]
    fn items_parse_into_a_cart() {
        let cart = parse_cart(&["250x2".to_string(), "99.50X1".to_string()]).expect("cart");

        assert_eq!(cart.lines().len(), 2);
        assert_eq!(cart.subtotal(), Money::from_minor(59_950));
    }

    #[test]
    fn malformed_items_are_rejected_with_context() {
        let error = parse_cart(&["250".to_string()]).expect_err("missing quantity");
        assert!(format!("{error:#}").contains("invalid item `250`"));

        assert!(parse_cart(&["250x0".to_string()]).is_err());
        assert!(parse_cart(&["-5x1".to_string()]).is_err());
        assert!(parse_cart(&["12.345x1".to_string()]).is_err());
    }
}
