use std::sync::Arc;

use serde::{Deserialize, Serialize};
use storefront_core::{Document, ErpGateway, Filter, GatewayError, ResourceQuery};
use tracing::debug;

use crate::models::OrderType;

pub const DEFAULT_ORDER_LIMIT: usize = 50;
pub const MAX_ORDER_LIMIT: usize = 100;

/// Columns returned for each order in a history listing.
pub const ORDER_SUMMARY_FIELDS: [&str; 11] = [
    "name",
    "creation",
    "modified",
    "customer_name",
    "email_id",
    "phone_number",
    "vat_id",
    "payment_mode",
    "transaction_id",
    "paid_amount",
    "payment_date",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistory {
    pub status: String,
    pub orders: Vec<Document>,
}

/// Read-only access to submitted storefront orders.
pub struct OrderTracker {
    gateway: Arc<dyn ErpGateway>,
    order_type: OrderType,
}

impl OrderTracker {
    pub fn new(gateway: Arc<dyn ErpGateway>) -> Self {
        Self {
            gateway,
            order_type: OrderType::Rfq,
        }
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = order_type;
        self
    }

    /// Most recently modified orders placed with a phone number. `limit` is
    /// capped at [`MAX_ORDER_LIMIT`]; zero means the default.
    pub async fn list_orders_by_phone(&self, phone: &str, limit: usize) -> Result<OrderHistory, TrackingError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(TrackingError::Validation("Phone is required".into()));
        }
        let limit = match limit {
            0 => DEFAULT_ORDER_LIMIT,
            n => n.min(MAX_ORDER_LIMIT),
        };

        let query = ResourceQuery::new()
            .filter(Filter::eq("phone_number", phone))
            .fields(ORDER_SUMMARY_FIELDS)
            .order_by("modified desc")
            .page(0, limit);
        let orders = self.gateway.list_docs(self.order_type.doctype(), &query).await?;
        debug!("Found {} {} orders for phone lookup", orders.len(), self.order_type.doctype());

        Ok(OrderHistory {
            status: "success".to_string(),
            orders,
        })
    }

    pub async fn get_order_detail(&self, order_id: &str) -> Result<Document, TrackingError> {
        match self.gateway.get_doc(self.order_type.doctype(), order_id).await {
            Ok(doc) => Ok(doc),
            Err(GatewayError::NotFound { .. }) => Err(TrackingError::OrderNotFound(order_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("{0}")]
    Validation(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("ERP request failed: {0}")]
    Gateway(#[from] GatewayError),
}
