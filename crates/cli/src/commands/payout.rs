use std::sync::Arc;

use anyhow::Context;
use bhojana_core::OrderId;
use bhojana_db::repositories::SqlOrderRepository;
use bhojana_db::FulfilmentService;
use chrono::Utc;
use uuid::Uuid;

use crate::commands::{load_config, open_database, rejected, runtime, CommandResult};

pub fn run(order: &str) -> CommandResult {
    let order_id = match parse_order_id(order) {
        Ok(order_id) => order_id,
        Err(error) => {
            return CommandResult::failure("payout", "invalid_input", format!("{error:#}"), 6)
        }
    };
    let config = match load_config("payout") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("payout") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service =
            FulfilmentService::new(Arc::new(SqlOrderRepository::new(pool.clone())), config.lifecycle());
        let paid = service.pay_commission(&order_id, Utc::now()).await;
        pool.close().await;

        paid.map_err(|error| rejected("payout", error))
    });

    match result {
        Ok(amount) => {
            CommandResult::success("payout", format!("paid {amount} INR commission for order {order_id}"))
        }
        Err(failure) => CommandResult::from_failure("payout", failure),
    }
}

fn parse_order_id(raw: &str) -> anyhow::Result<OrderId> {
    let uuid = Uuid::parse_str(raw.trim()).with_context(|| format!("invalid order id `{raw}`"))?;
    Ok(OrderId(uuid))
}
