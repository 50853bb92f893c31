use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::commission::CommissionPolicy;
use crate::domain::money::{percent, Money};
use crate::lifecycle::engine::DEFAULT_CANCELLATION_WINDOW_SECS;
use crate::lifecycle::OrderLifecycle;
use crate::pricing::{DiscountTier, PricingPolicy};

pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["bhojana.toml", "config/bhojana.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
    pub orders: OrdersConfig,
    pub commission: CommissionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

/// Rates are whole percentages (`5` means 5%). `tier_rates_pct` holds one
/// more entry than `tier_thresholds`: the first rate applies below the first
/// threshold.
#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub gst_rate_pct: Decimal,
    pub delivery_fee: Money,
    pub free_delivery_threshold: Money,
    pub tier_thresholds: Vec<Money>,
    pub tier_rates_pct: Vec<Decimal>,
}

#[derive(Clone, Debug)]
pub struct OrdersConfig {
    pub cancellation_window_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CommissionConfig {
    pub delivered_rate_pct: Decimal,
    pub undelivered_rate_pct: Decimal,
    pub per_order_base: Money,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://bhojana.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            pricing: PricingConfig {
                gst_rate_pct: Decimal::from(5),
                delivery_fee: Money::from_major(30),
                free_delivery_threshold: Money::from_major(200),
                tier_thresholds: vec![Money::from_major(200), Money::from_major(1000)],
                tier_rates_pct: vec![Decimal::from(2), Decimal::from(4), Decimal::from(6)],
            },
            orders: OrdersConfig {
                cancellation_window_secs: DEFAULT_CANCELLATION_WINDOW_SECS.unsigned_abs(),
            },
            commission: CommissionConfig {
                delivered_rate_pct: Decimal::from(12),
                undelivered_rate_pct: Decimal::from(6),
                per_order_base: Money::ZERO,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn pricing_policy(&self) -> PricingPolicy {
        let pricing = &self.pricing;
        let thresholds = std::iter::once(Money::ZERO).chain(pricing.tier_thresholds.iter().copied());
        let tiers = thresholds
            .zip(pricing.tier_rates_pct.iter())
            .map(|(threshold, rate)| DiscountTier { threshold, rate: percent(*rate) })
            .collect();

        PricingPolicy {
            tiers,
            gst_rate: percent(pricing.gst_rate_pct),
            delivery_fee: pricing.delivery_fee,
            free_delivery_threshold: pricing.free_delivery_threshold,
        }
    }

    pub fn commission_policy(&self) -> CommissionPolicy {
        CommissionPolicy {
            delivered_rate: percent(self.commission.delivered_rate_pct),
            undelivered_rate: percent(self.commission.undelivered_rate_pct),
            per_order_base: self.commission.per_order_base,
        }
    }

    pub fn lifecycle(&self) -> OrderLifecycle {
        let window_secs = i64::try_from(self.orders.cancellation_window_secs)
            .unwrap_or(DEFAULT_CANCELLATION_WINDOW_SECS);
        OrderLifecycle::new(Duration::seconds(window_secs), self.commission_policy())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(gst_rate_pct) = pricing.gst_rate_pct {
                self.pricing.gst_rate_pct = gst_rate_pct;
            }
            if let Some(delivery_fee) = pricing.delivery_fee {
                self.pricing.delivery_fee = delivery_fee;
            }
            if let Some(free_delivery_threshold) = pricing.free_delivery_threshold {
                self.pricing.free_delivery_threshold = free_delivery_threshold;
            }
            if let Some(tier_thresholds) = pricing.tier_thresholds {
                self.pricing.tier_thresholds = tier_thresholds;
            }
            if let Some(tier_rates_pct) = pricing.tier_rates_pct {
                self.pricing.tier_rates_pct = tier_rates_pct;
            }
        }

        if let Some(orders) = patch.orders {
            if let Some(cancellation_window_secs) = orders.cancellation_window_secs {
                self.orders.cancellation_window_secs = cancellation_window_secs;
            }
        }

        if let Some(commission) = patch.commission {
            if let Some(delivered_rate_pct) = commission.delivered_rate_pct {
                self.commission.delivered_rate_pct = delivered_rate_pct;
            }
            if let Some(undelivered_rate_pct) = commission.undelivered_rate_pct {
                self.commission.undelivered_rate_pct = undelivered_rate_pct;
            }
            if let Some(per_order_base) = commission.per_order_base {
                self.commission.per_order_base = per_order_base;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("BHOJANA_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("BHOJANA_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_env("BHOJANA_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("BHOJANA_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_env("BHOJANA_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("BHOJANA_PRICING_GST_RATE_PCT") {
            self.pricing.gst_rate_pct = parse_env("BHOJANA_PRICING_GST_RATE_PCT", &value)?;
        }
        if let Some(value) = read_env("BHOJANA_PRICING_DELIVERY_FEE") {
            self.pricing.delivery_fee = parse_env("BHOJANA_PRICING_DELIVERY_FEE", &value)?;
        }
        if let Some(value) = read_env("BHOJANA_PRICING_FREE_DELIVERY_THRESHOLD") {
            self.pricing.free_delivery_threshold =
                parse_env("BHOJANA_PRICING_FREE_DELIVERY_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("BHOJANA_ORDERS_CANCELLATION_WINDOW_SECS") {
            self.orders.cancellation_window_secs =
                parse_env("BHOJANA_ORDERS_CANCELLATION_WINDOW_SECS", &value)?;
        }

        if let Some(value) = read_env("BHOJANA_COMMISSION_DELIVERED_RATE_PCT") {
            self.commission.delivered_rate_pct =
                parse_env("BHOJANA_COMMISSION_DELIVERED_RATE_PCT", &value)?;
        }
        if let Some(value) = read_env("BHOJANA_COMMISSION_UNDELIVERED_RATE_PCT") {
            self.commission.undelivered_rate_pct =
                parse_env("BHOJANA_COMMISSION_UNDELIVERED_RATE_PCT", &value)?;
        }
        if let Some(value) = read_env("BHOJANA_COMMISSION_PER_ORDER_BASE") {
            self.commission.per_order_base =
                parse_env("BHOJANA_COMMISSION_PER_ORDER_BASE", &value)?;
        }

        let log_level = read_env("BHOJANA_LOGGING_LEVEL").or_else(|| read_env("BHOJANA_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("BHOJANA_LOGGING_FORMAT").or_else(|| read_env("BHOJANA_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_pricing(&self.pricing)?;
        validate_orders(&self.orders)?;
        validate_commission(&self.commission)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// The config file `load` would read, if any.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_rate(key: &str, rate_pct: Decimal) -> Result<(), ConfigError> {
    if rate_pct < Decimal::ZERO || rate_pct > Decimal::ONE_HUNDRED {
        return Err(ConfigError::Validation(format!("{key} must be in range 0..=100")));
    }
    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    validate_rate("pricing.gst_rate_pct", pricing.gst_rate_pct)?;
    for rate in &pricing.tier_rates_pct {
        validate_rate("pricing.tier_rates_pct", *rate)?;
    }

    if pricing.tier_rates_pct.len() != pricing.tier_thresholds.len() + 1 {
        return Err(ConfigError::Validation(
            "pricing.tier_rates_pct must have exactly one more entry than pricing.tier_thresholds"
                .to_string(),
        ));
    }

    let mut previous = Money::ZERO;
    for threshold in &pricing.tier_thresholds {
        if *threshold <= previous {
            return Err(ConfigError::Validation(
                "pricing.tier_thresholds must be positive and strictly increasing".to_string(),
            ));
        }
        previous = *threshold;
    }

    if pricing.tier_rates_pct.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(ConfigError::Validation(
            "pricing.tier_rates_pct must not decrease as the subtotal grows".to_string(),
        ));
    }

    Ok(())
}

fn validate_orders(orders: &OrdersConfig) -> Result<(), ConfigError> {
    if orders.cancellation_window_secs == 0 || orders.cancellation_window_secs > 86_400 {
        return Err(ConfigError::Validation(
            "orders.cancellation_window_secs must be in range 1..=86400".to_string(),
        ));
    }
    Ok(())
}

fn validate_commission(commission: &CommissionConfig) -> Result<(), ConfigError> {
    validate_rate("commission.delivered_rate_pct", commission.delivered_rate_pct)?;
    validate_rate("commission.undelivered_rate_pct", commission.undelivered_rate_pct)?;
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    pricing: Option<PricingPatch>,
    orders: Option<OrdersPatch>,
    commission: Option<CommissionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    gst_rate_pct: Option<Decimal>,
    delivery_fee: Option<Money>,
    free_delivery_threshold: Option<Money>,
    tier_thresholds: Option<Vec<Money>>,
    tier_rates_pct: Option<Vec<Decimal>>,
}

#[derive(Debug, Default, Deserialize)]
struct OrdersPatch {
    cancellation_window_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CommissionPatch {
    delivered_rate_pct: Option<Decimal>,
    undelivered_rate_pct: Option<Decimal>,
    per_order_base: Option<Money>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use chrono::Duration;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::commission::CommissionPolicy;
    use crate::domain::money::Money;
    use crate::pricing::PricingPolicy;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(contents: &str) -> Result<(TempDir, std::path::PathBuf), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("bhojana.toml");
        fs::write(&path, contents).map_err(|err| err.to_string())?;
        Ok((dir, path))
    }

    #[test]
    fn defaults_reproduce_the_standard_policies() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(
            config.pricing_policy() == PricingPolicy::default(),
            "default pricing config should match the built-in policy",
        )?;
        ensure(
            config.commission_policy() == CommissionPolicy::default(),
            "default commission config should match the built-in policy",
        )?;
        ensure(
            config.lifecycle().cancellation_window() == Duration::minutes(5),
            "default cancellation window should be five minutes",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_BHOJANA_DB", "sqlite://interpolated.db");

        let result = (|| -> Result<(), String> {
            let (_dir, path) = write_config(
                r#"
[database]
url = "${TEST_BHOJANA_DB}"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://interpolated.db",
                "database url should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_BHOJANA_DB"]);
        result
    }

    #[test]
    fn pricing_and_commission_sections_are_read_from_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let (_dir, path) = write_config(
            r#"
[pricing]
gst_rate_pct = 18
delivery_fee = "40.00"
free_delivery_threshold = "250.00"
tier_thresholds = ["300.00"]
tier_rates_pct = [0, 5]

[orders]
cancellation_window_secs = 600

[commission]
per_order_base = "100.00"
"#,
        )?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let policy = config.pricing_policy();

        ensure(policy.tiers.len() == 2, "two tiers should be configured")?;
        ensure(
            policy.tier_discount_rate(Money::from_major(299)) == Decimal::ZERO,
            "first tier should be zero",
        )?;
        ensure(
            policy.tier_discount_rate(Money::from_major(300)) == Decimal::new(5, 2),
            "second tier should start at 300",
        )?;
        ensure(policy.gst_rate == Decimal::new(18, 2), "gst should be 18%")?;
        ensure(policy.delivery_fee == Money::from_major(40), "delivery fee should be 40")?;
        ensure(
            config.commission_policy().per_order_base == Money::from_major(100),
            "per order base should be 100",
        )?;
        ensure(
            config.lifecycle().cancellation_window() == Duration::minutes(10),
            "cancellation window should be ten minutes",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BHOJANA_LOG_LEVEL", "warn");
        env::set_var("BHOJANA_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["BHOJANA_LOG_LEVEL", "BHOJANA_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BHOJANA_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("BHOJANA_COMMISSION_DELIVERED_RATE_PCT", "15");

        let result = (|| -> Result<(), String> {
            let (_dir, path) = write_config(
                r#"
[database]
url = "sqlite://from-file.db"

[commission]
delivered_rate_pct = 10
undelivered_rate_pct = 4

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.commission.delivered_rate_pct == Decimal::from(15),
                "env delivered rate should win over file",
            )?;
            ensure(
                config.commission.undelivered_rate_pct == Decimal::from(4),
                "file undelivered rate should win over default",
            )
        })();

        clear_vars(&["BHOJANA_DATABASE_URL", "BHOJANA_COMMISSION_DELIVERED_RATE_PCT"]);
        result
    }

    #[test]
    fn invalid_env_value_names_the_variable() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("BHOJANA_PRICING_DELIVERY_FEE", "thirty");

        let result = match AppConfig::load(LoadOptions::default()) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "BHOJANA_PRICING_DELIVERY_FEE", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected env parse failure".to_string()),
        };

        clear_vars(&["BHOJANA_PRICING_DELIVERY_FEE"]);
        result
    }

    #[test]
    fn validation_rejects_unordered_tiers() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let (_dir, path) = write_config(
            r#"
[pricing]
tier_thresholds = ["1000.00", "200.00"]
"#,
        )?;

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("pricing.tier_thresholds")
        );
        ensure(has_message, "validation failure should mention pricing.tier_thresholds")
    }

    #[test]
    fn validation_rejects_decreasing_tier_rates() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let (_dir, path) = write_config(
            r#"
[pricing]
tier_rates_pct = [6, 4, 2]
"#,
        )?;

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("pricing.tier_rates_pct")
        );
        ensure(has_message, "validation failure should mention pricing.tier_rates_pct")
    }

    #[test]
    fn validation_rejects_out_of_range_rates() {
        let mut config = AppConfig::default();
        config.commission.undelivered_rate_pct = Decimal::from(101);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation(message)) if message.contains("commission.undelivered_rate_pct")
        ));
    }

    #[test]
    fn validation_rejects_zero_cancellation_window() {
        let mut config = AppConfig::default();
        config.orders.cancellation_window_secs = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_required_file_is_reported() {
        let result = AppConfig::load(LoadOptions {
            config_path: Some("/nonexistent/bhojana.toml".into()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
