//! Snapshot source adapter
//!
//! Bridges the order service REST client into the sync core's
//! `SnapshotSource` seam, keeping the core free of HTTP concerns.

use std::future::Future;

use live_sync::{SnapshotError, SnapshotSource};
use order_api::{OrderAnalytics, OrderServiceClient, OrderSummary};

pub struct OrderServiceSource {
    client: OrderServiceClient,
}

impl OrderServiceSource {
    pub fn new(client: OrderServiceClient) -> Self {
        Self { client }
    }
}

impl SnapshotSource for OrderServiceSource {
    fn recent_orders(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<OrderSummary>, SnapshotError>> + Send {
        async move { Ok(self.client.recent_orders(limit).await?) }
    }

    fn order_analytics(
        &self,
    ) -> impl Future<Output = Result<OrderAnalytics, SnapshotError>> + Send {
        async move { Ok(self.client.order_analytics().await?) }
    }
}
