//! Shared fixtures for unit tests.

use chrono::NaiveDate;
use order_api::{OrderStatus, OrderSummary};

pub(crate) fn sample_order(id: i64, status: OrderStatus, customer: &str) -> OrderSummary {
    let stamp = NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    OrderSummary {
        id,
        customer_name: customer.to_string(),
        customer_email: format!("{}@example.com", customer.to_lowercase()),
        product_description: "widget".to_string(),
        quantity: 1,
        total_price: 19.9,
        status,
        created_at: stamp,
        updated_at: stamp,
    }
}
