use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::types::{OrderAnalytics, OrderSummary, Page};

/// HTTP client for the order service REST API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct OrderServiceClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

/// Error envelope the service uses for non-success responses.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl OrderServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: normalize_base_url(base_url.into()),
            bearer_token: None,
        }
    }

    /// Attach a bearer token to every request. Obtaining and refreshing
    /// the token is the session provider's business, not ours.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// One page of orders, newest first.
    pub async fn list_orders(&self, page: u32, size: usize) -> Result<Page<OrderSummary>, ApiError> {
        self.get_json(&format!("/api/orders?page={page}&size={size}"))
            .await
    }

    /// First page shortcut used by the dashboard's recent-orders panel.
    pub async fn recent_orders(&self, limit: usize) -> Result<Vec<OrderSummary>, ApiError> {
        Ok(self.list_orders(0, limit).await?.content)
    }

    /// Aggregate figures (totals, revenue, per-status breakdown).
    pub async fn order_analytics(&self) -> Result<OrderAnalytics, ApiError> {
        self.get_json("/api/analytics/orders").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let mut request = self.http.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.as_str()),
            });
        }
        Ok(response.json().await?)
    }
}

/// Trailing slashes would produce `//api/...` when paths are appended.
fn normalize_base_url(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

/// Prefer the service's structured message, fall back to the raw body,
/// then to the bare status code.
fn error_message(body: &str, status: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = parsed.message {
            return message;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}
