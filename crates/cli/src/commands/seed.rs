use bhojana_db::repositories::SqlCouponRepository;
use bhojana_db::DemoCoupons;
use chrono::Utc;

use crate::commands::{load_config, open_database, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let repo = SqlCouponRepository::new(pool.clone());
        let seeded = DemoCoupons::load(&repo, Utc::now())
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8));
        pool.close().await;
        seeded
    });

    match result {
        Ok(seeded) => CommandResult::success("seed", seed_message(&seeded.coupons_seeded)),
        Err(failure) => CommandResult::from_failure("seed", failure),
    }
}

fn seed_message(codes: &[String]) -> String {
    let lines: Vec<String> = codes.iter().map(|code| format!("  - {code}")).collect();
    format!("demo coupons loaded:\n{}", lines.join("\n"))
}
