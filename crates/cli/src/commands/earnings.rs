use std::sync::Arc;

use bhojana_core::AgentId;
use bhojana_db::repositories::SqlOrderRepository;
use bhojana_db::FulfilmentService;

use crate::commands::{
    load_config, open_database, rejected, runtime, to_json, CommandResult, Failure,
};

pub fn run(agent: &str) -> CommandResult {
    let agent = agent.trim();
    if agent.is_empty() {
        return CommandResult::failure("earnings", "invalid_input", "agent id must not be empty", 6);
    }
    let config = match load_config("earnings") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("earnings") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let service =
            FulfilmentService::new(Arc::new(SqlOrderRepository::new(pool.clone())), config.lifecycle());
        let report = service.earnings_report(&AgentId(agent.to_string())).await;
        pool.close().await;

        let report = report.map_err(|error| rejected("earnings", error))?;
        Ok::<_, Failure>((report.order_count(), report.total_commission, to_json(&report)?))
    });

    match result {
        Ok((orders, total, data)) => CommandResult::success_with_data(
            "earnings",
            format!("{orders} closed orders, {total} INR commission for agent {agent}"),
            Some(data),
        ),
        Err(failure) => CommandResult::from_failure("earnings", failure),
    }
}
