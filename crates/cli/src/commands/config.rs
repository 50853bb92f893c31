use std::env;
use std::fs;
use std::path::Path;

use bhojana_core::config::{resolve_config_path, AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let join = |values: Vec<String>| format!("[{}]", values.join(", "));
    let entries = [
        ("database.url", config.database.url.clone(), vec!["BHOJANA_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            vec!["BHOJANA_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            vec!["BHOJANA_DATABASE_TIMEOUT_SECS"],
        ),
        (
            "pricing.gst_rate_pct",
            config.pricing.gst_rate_pct.to_string(),
            vec!["BHOJANA_PRICING_GST_RATE_PCT"],
        ),
        (
            "pricing.delivery_fee",
            config.pricing.delivery_fee.to_string(),
            vec!["BHOJANA_PRICING_DELIVERY_FEE"],
        ),
        (
            "pricing.free_delivery_threshold",
            config.pricing.free_delivery_threshold.to_string(),
            vec!["BHOJANA_PRICING_FREE_DELIVERY_THRESHOLD"],
        ),
        (
            "pricing.tier_thresholds",
            join(config.pricing.tier_thresholds.iter().map(ToString::to_string).collect()),
            vec![],
        ),
        (
            "pricing.tier_rates_pct",
            join(config.pricing.tier_rates_pct.iter().map(ToString::to_string).collect()),
            vec![],
        ),
        (
            "orders.cancellation_window_secs",
            config.orders.cancellation_window_secs.to_string(),
            vec!["BHOJANA_ORDERS_CANCELLATION_WINDOW_SECS"],
        ),
        (
            "commission.delivered_rate_pct",
            config.commission.delivered_rate_pct.to_string(),
            vec!["BHOJANA_COMMISSION_DELIVERED_RATE_PCT"],
        ),
        (
            "commission.undelivered_rate_pct",
            config.commission.undelivered_rate_pct.to_string(),
            vec!["BHOJANA_COMMISSION_UNDELIVERED_RATE_PCT"],
        ),
        (
            "commission.per_order_base",
            config.commission.per_order_base.to_string(),
            vec!["BHOJANA_COMMISSION_PER_ORDER_BASE"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            vec!["BHOJANA_LOGGING_LEVEL", "BHOJANA_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            vec!["BHOJANA_LOGGING_FORMAT", "BHOJANA_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_keys) in entries {
        lines.push(render_line(key_path, &value, source(key_path, &env_keys)));
    }
    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
