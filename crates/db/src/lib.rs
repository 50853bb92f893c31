pub mod checkout;
pub mod connection;
pub mod fixtures;
pub mod fulfilment;
pub mod migrations;
pub mod repositories;

pub use checkout::{CheckoutError, CheckoutPreview, CheckoutRequest, CheckoutService};
pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoCoupons, SeedResult};
pub use fulfilment::{FulfilmentError, FulfilmentService};
