use std::env;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use bhojana_cli::commands::{earnings, migrate, payout, quote, seed};
use bhojana_core::lifecycle::{Actor, OrderLifecycle, StatusChange};
use bhojana_core::{AgentId, Cart, CustomerId, DeterministicPricingEngine, FoodItemId, LineItem};
use bhojana_core::{Money, OrderId, OrderStatus, PaymentMethod};
use bhojana_db::repositories::{InMemoryStore, SqlOrderRepository};
use bhojana_db::{connect_with_settings, migrations, CheckoutRequest, CheckoutService};
use bhojana_db::FulfilmentService;
use chrono::Utc;
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("BHOJANA_DATABASE_URL", "postgres://localhost/bhojana")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_lists_demo_coupons_and_is_repeatable() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let first = seed::run();
        let second = seed::run();
        assert_eq!(first.exit_code, 0, "expected seed success");

        let first_payload = parse_payload(&first.output);
        let message = first_payload["message"].as_str().unwrap_or_default();
        assert!(message.contains("  - WELCOME50"));
        assert!(message.contains("  - FEAST10"));
        assert_eq!(first_payload["message"], parse_payload(&second.output)["message"]);
    });
}

#[test]
fn quote_prices_a_cart_without_coupon() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let result = quote::run(&["75x2".to_string()], None);
        assert_eq!(result.exit_code, 0, "expected quote success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "quote");
        assert_eq!(payload["data"]["breakdown"]["total"], "184.35");
        assert_eq!(payload["data"]["trace"]["currency"], "INR");
    });
}

#[test]
fn quote_reports_unknown_coupon() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let result = quote::run(&["400x3".to_string()], Some("nosuch"));
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "not_found");
        assert_eq!(payload["message"], "Invalid coupon code");
    });
}

#[test]
fn quote_rejects_malformed_items() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let result = quote::run(&["two hundred".to_string()], None);
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
    });
}

#[test]
fn payout_and_earnings_cover_a_delivered_order() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = database_url(dir.path());

    with_env(&[("BHOJANA_DATABASE_URL", url.as_str())], || {
        let order_id = deliver_order(&url);

        let paid = payout::run(&order_id.to_string());
        assert_eq!(paid.exit_code, 0, "expected payout success: {}", paid.output);
        let message = parse_payload(&paid.output)["message"].as_str().unwrap_or_default().to_string();
        assert!(message.contains("118.44"), "unexpected payout message: {message}");

        let repeated = payout::run(&order_id.to_string());
        assert_eq!(repeated.exit_code, 7);
        let repeated_payload = parse_payload(&repeated.output);
        assert_eq!(repeated_payload["error_class"], "domain_rejected");
        assert!(repeated_payload["message"].as_str().unwrap_or_default().contains("already paid"));

        let report = earnings::run("rider-7");
        assert_eq!(report.exit_code, 0);
        let payload = parse_payload(&report.output);
        assert_eq!(payload["data"]["delivered_orders"], 1);
        assert_eq!(payload["data"]["paid_commission"], "118.44");
        assert_eq!(payload["data"]["pending_commission"], "0.00");
    });
}

#[test]
fn payout_of_unknown_order_is_reported() {
    with_env(&[("BHOJANA_DATABASE_URL", "sqlite::memory:")], || {
        let result = payout::run(&OrderId::generate().to_string());
        assert_eq!(result.exit_code, 7);
        assert_eq!(parse_payload(&result.output)["error_class"], "not_found");

        let invalid = payout::run("not-a-uuid");
        assert_eq!(invalid.exit_code, 6);
    });
}

fn database_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("bhojana.db").display())
}

/// Places a 1000.00 cart (total 987.00) and walks it to delivered.
fn deliver_order(url: &str) -> OrderId {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");

    runtime.block_on(async {
        let pool = connect_with_settings(url, 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let orders = Arc::new(SqlOrderRepository::new(pool.clone()));
        let checkout = CheckoutService::new(
            Arc::new(InMemoryStore::default()),
            orders.clone(),
            DeterministicPricingEngine::default(),
        );
        let fulfilment = FulfilmentService::new(orders, OrderLifecycle::default());

        let cart = Cart::new(vec![
            LineItem::new(FoodItemId("thali".to_string()), Money::from_major(500), 2).expect("line"),
        ]);
        let now = Utc::now();
        let order = checkout
            .place_order(
                CheckoutRequest {
                    customer_id: CustomerId("cust-1".to_string()),
                    cart,
                    coupon_code: None,
                    payment_method: PaymentMethod::Online,
                },
                now,
            )
            .await
            .expect("place order");

        let rider = AgentId("rider-7".to_string());
        fulfilment.assign_agent(&order.id, rider.clone(), now).await.expect("assign");
        let steps = [
            (OrderStatus::Confirmed, Actor::Admin),
            (OrderStatus::Preparing, Actor::Admin),
            (OrderStatus::OutForDelivery, Actor::DeliveryAgent(rider.clone())),
            (OrderStatus::Delivered, Actor::DeliveryAgent(rider.clone())),
        ];
        for (target, actor) in steps {
            fulfilment
                .update_status(&order.id, StatusChange::new(target, actor, now))
                .await
                .expect("advance");
        }

        pool.close().await;
        order.id
    })
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "BHOJANA_DATABASE_URL",
        "BHOJANA_DATABASE_MAX_CONNECTIONS",
        "BHOJANA_DATABASE_TIMEOUT_SECS",
        "BHOJANA_PRICING_GST_RATE_PCT",
        "BHOJANA_PRICING_DELIVERY_FEE",
        "BHOJANA_PRICING_FREE_DELIVERY_THRESHOLD",
        "BHOJANA_ORDERS_CANCELLATION_WINDOW_SECS",
        "BHOJANA_COMMISSION_DELIVERED_RATE_PCT",
        "BHOJANA_COMMISSION_UNDELIVERED_RATE_PCT",
        "BHOJANA_COMMISSION_PER_ORDER_BASE",
        "BHOJANA_LOGGING_LEVEL",
        "BHOJANA_LOGGING_FORMAT",
        "BHOJANA_LOG_LEVEL",
        "BHOJANA_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
