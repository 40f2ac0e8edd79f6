use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Lifecycle stage of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in lifecycle order, for stable display rows.
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One order as the service reports it.
///
/// Timestamps come from the service without a zone; they are display-only
/// here and never used for ordering decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub product_description: String,
    pub quantity: u32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Aggregate order figures, derived server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAnalytics {
    pub total_orders: u64,
    pub total_revenue: f64,
    #[serde(default)]
    pub orders_by_status: HashMap<OrderStatus, u64>,
    #[serde(default)]
    pub revenue_by_status: HashMap<OrderStatus, f64>,
    pub average_order_value: f64,
}

impl OrderAnalytics {
    pub fn count_for(&self, status: OrderStatus) -> u64 {
        self.orders_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Page envelope the order service wraps listings in.
/// Unknown envelope fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
    pub size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_serde_uses_screaming_case() {
        let json = serde_json::to_value(OrderStatus::Shipped).unwrap();
        assert_eq!(json, "SHIPPED");
        let status: OrderStatus = serde_json::from_value("CANCELLED".into()).unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn order_summary_parses_service_json() {
        let json = r#"{
            "id": 42,
            "customerName": "Ada Lovelace",
            "customerEmail": "ada@example.com",
            "productDescription": "Mechanical engine",
            "quantity": 2,
            "totalPrice": 199.90,
            "status": "CONFIRMED",
            "createdAt": "2025-06-01T09:15:00",
            "updatedAt": "2025-06-01T10:00:00"
        }"#;
        let order: OrderSummary = serde_json::from_str(json).unwrap();
        assert_eq!(order.id, 42);
        assert_eq!(order.customer_name, "Ada Lovelace");
        assert_eq!(order.status, OrderStatus::Confirmed);
        assert_eq!(order.quantity, 2);
    }

    #[test]
    fn analytics_parses_status_keyed_maps() {
        let json = r#"{
            "totalOrders": 12,
            "totalRevenue": 840.5,
            "ordersByStatus": {"PENDING": 3, "DELIVERED": 9},
            "revenueByStatus": {"DELIVERED": 700.0},
            "averageOrderValue": 70.04
        }"#;
        let analytics: OrderAnalytics = serde_json::from_str(json).unwrap();
        assert_eq!(analytics.total_orders, 12);
        assert_eq!(analytics.count_for(OrderStatus::Pending), 3);
        assert_eq!(analytics.count_for(OrderStatus::Delivered), 9);
        assert_eq!(analytics.count_for(OrderStatus::Shipped), 0);
    }

    #[test]
    fn analytics_tolerates_missing_maps() {
        let json = r#"{"totalOrders": 0, "totalRevenue": 0.0, "averageOrderValue": 0.0}"#;
        let analytics: OrderAnalytics = serde_json::from_str(json).unwrap();
        assert!(analytics.orders_by_status.is_empty());
    }

    #[test]
    fn page_ignores_extra_envelope_fields() {
        let json = r#"{
            "content": [],
            "totalElements": 0,
            "totalPages": 0,
            "number": 0,
            "size": 6,
            "first": true,
            "last": true
        }"#;
        let page: Page<OrderSummary> = serde_json::from_str(json).unwrap();
        assert!(page.content.is_empty());
        assert_eq!(page.size, 6);
    }
}
