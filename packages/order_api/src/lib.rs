//! Order service API - domain types and REST client
//!
//! This crate knows the order service's wire shapes (orders, statuses,
//! aggregate analytics, page envelopes) and how to fetch them over HTTP.
//! It has no push-channel or view-merging knowledge; the live sync core
//! builds on top of these types.

mod client;
mod error;
mod types;

pub use client::OrderServiceClient;
pub use error::ApiError;
pub use types::{OrderAnalytics, OrderStatus, OrderSummary, Page};
