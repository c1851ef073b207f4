use std::sync::Arc;

use chrono::NaiveDate;
use storefront_catalog::pricing::transform_item_on;
use storefront_catalog::{PricingEngine, RawItem};
use storefront_core::{ErpGateway, GatewayError, SiteControl, SiteControlError, ITEM_DOCTYPE};
use storefront_shared::to_text;
use tracing::{info, warn};

use crate::customer::{CustomerError, CustomerProfile, CustomerService};
use crate::models::{CartLine, CheckoutRequest, OrderDraft, OrderReceipt, OrderType, PricedLine};

pub const MAX_QTY_PER_ITEM: f64 = 1000.0;

const REQUIRED_ADDRESS_FIELDS: [&str; 4] = ["address_line1", "postal_code", "city", "country"];

impl CheckoutRequest {
    pub fn validate(&self, max_qty_per_item: f64) -> Result<(), CheckoutError> {
        if self.cart.is_empty() {
            return Err(CheckoutError::Validation("Cart cannot be empty".into()));
        }
        if self.customer_name.trim().is_empty() {
            return Err(CheckoutError::Validation("Customer name is required".into()));
        }
        if self.phone.expose().trim().is_empty() {
            return Err(CheckoutError::Validation("Phone number is required".into()));
        }

        let address = &self.address;
        let values = [
            &address.address_line1,
            &address.postal_code,
            &address.city,
            &address.country,
        ];
        for (field, value) in REQUIRED_ADDRESS_FIELDS.iter().zip(values) {
            if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
                return Err(CheckoutError::Validation(format!("{} is required", field)));
            }
        }

        for line in &self.cart {
            line.validate(max_qty_per_item)?;
        }
        Ok(())
    }
}

impl CartLine {
    fn validate(&self, max_qty_per_item: f64) -> Result<(), CheckoutError> {
        if self.item_code.trim().is_empty() || !self.qty.is_finite() {
            return Err(CheckoutError::Validation("Invalid cart item".into()));
        }
        if self.qty <= 0.0 {
            return Err(CheckoutError::Validation("Quantity must be greater than zero".into()));
        }
        if self.qty > max_qty_per_item {
            return Err(CheckoutError::Validation("Quantity exceeds allowed limit".into()));
        }
        Ok(())
    }
}

/// Prices carts from ERP item records and submits orders.
pub struct CheckoutService {
    gateway: Arc<dyn ErpGateway>,
    site_control: Arc<SiteControl>,
    engine: Arc<PricingEngine>,
    customers: CustomerService,
    max_qty_per_item: f64,
}

impl CheckoutService {
    pub fn new(
        gateway: Arc<dyn ErpGateway>,
        site_control: Arc<SiteControl>,
        engine: Arc<PricingEngine>,
    ) -> Self {
        Self {
            customers: CustomerService::new(gateway.clone()),
            gateway,
            site_control,
            engine,
            max_qty_per_item: MAX_QTY_PER_ITEM,
        }
    }

    pub fn with_max_qty_per_item(mut self, max_qty_per_item: f64) -> Self {
        self.max_qty_per_item = max_qty_per_item;
        self
    }

    /// Resolves the unit price of every line through the pricing engine.
    /// The first line without a visible, resolvable price rejects the cart.
    pub async fn price_cart(&self, cart: &[CartLine]) -> Result<Vec<PricedLine>, CheckoutError> {
        let today = self.engine.today();
        let mut lines = Vec::with_capacity(cart.len());
        for line in cart {
            lines.push(self.price_line(line, today).await?);
        }
        Ok(lines)
    }

    async fn price_line(&self, line: &CartLine, today: NaiveDate) -> Result<PricedLine, CheckoutError> {
        let doc = match self.gateway.get_doc(ITEM_DOCTYPE, &line.item_code).await {
            Ok(doc) => doc,
            Err(GatewayError::NotFound { .. }) => {
                return Err(CheckoutError::ItemNotFound(line.item_code.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let item = RawItem::new(doc);
        let pricing = transform_item_on(&item, today);

        if !pricing.is_price_visible {
            warn!("Rejected cart line {}: price hidden", line.item_code);
            return Err(CheckoutError::PriceHidden { item_code: line.item_code.clone() });
        }
        let Some(unit_price) = pricing.price else {
            warn!("Rejected cart line {}: no price available", line.item_code);
            return Err(CheckoutError::PriceNotAvailable { item_code: line.item_code.clone() });
        };

        Ok(PricedLine {
            item_code: line.item_code.clone(),
            item_name: to_text(item.raw("item_name")).unwrap_or_else(|| line.item_code.clone()),
            uom: to_text(item.raw("stock_uom")),
            quantity: line.qty,
            unit_price,
            amount: unit_price * line.qty,
        })
    }

    async fn order_settings(&self) -> Result<(OrderType, Option<String>), CheckoutError> {
        let settings = self.site_control.settings().await?;
        if settings.is_site_frozen() {
            return Err(CheckoutError::StoreUnavailable);
        }

        let order_type = OrderType::from_setting(&settings.default_order_type).unwrap_or_else(|| {
            warn!(
                "Unknown default order type {:?}, falling back to RFQ",
                settings.default_order_type
            );
            OrderType::Rfq
        });
        Ok((order_type, settings.default_source_warehouse))
    }

    /// Validates, prices and builds the ERP document for an order without
    /// submitting it or touching customer records.
    pub async fn prepare_order(
        &self,
        request: CheckoutRequest,
        customer_id: &str,
    ) -> Result<OrderDraft, CheckoutError> {
        request.validate(self.max_qty_per_item)?;
        let (order_type, warehouse) = self.order_settings().await?;
        let lines = self.price_cart(&request.cart).await?;

        Ok(OrderDraft::new(
            order_type,
            customer_id.to_string(),
            request,
            lines,
            self.engine.today(),
            warehouse,
        ))
    }

    /// Prices the cart, resolves the buyer's customer record by VAT number
    /// and creates the order document. A cart that fails validation or
    /// pricing leaves customer records untouched.
    pub async fn place_order(&self, request: CheckoutRequest) -> Result<OrderReceipt, CheckoutError> {
        request.validate(self.max_qty_per_item)?;
        let (order_type, warehouse) = self.order_settings().await?;
        let lines = self.price_cart(&request.cart).await?;

        let customer_id = self.customers.get_or_create(&CustomerProfile::from(&request)).await?;
        let draft = OrderDraft::new(order_type, customer_id, request, lines, self.engine.today(), warehouse);
        self.submit(draft).await
    }

    async fn submit(&self, draft: OrderDraft) -> Result<OrderReceipt, CheckoutError> {
        let doctype = draft.order_type.doctype();

        let created = self.gateway.create_doc(doctype, draft.to_payload()).await?;
        let order_id = to_text(created.get("name"))
            .ok_or_else(|| CheckoutError::CreationFailed(format!("{} creation returned no name", doctype)))?;

        info!(
            "{} {} submitted for {} ({} lines, total {})",
            doctype,
            order_id,
            draft.customer_id,
            draft.lines.len(),
            draft.total
        );

        Ok(OrderReceipt {
            status: "submitted".to_string(),
            order_id,
            customer_id: draft.customer_id,
            order_type: draft.order_type,
            total: draft.total,
            created_at: draft.transaction_date,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Price not available for item {item_code}")]
    PriceNotAvailable {
        item_code: String,
    },

    #[error("Price is hidden for item {item_code}")]
    PriceHidden {
        item_code: String,
    },

    #[error("Store is currently unavailable")]
    StoreUnavailable,

    #[error("Order creation failed: {0}")]
    CreationFailed(String),

    #[error(transparent)]
    Customer(#[from] CustomerError),

    #[error(transparent)]
    Settings(#[from] SiteControlError),

    #[error("ERP request failed: {0}")]
    Gateway(#[from] GatewayError),
}

impl CheckoutError {
    /// Caller-side problems (400-class): bad input or merchandising
    /// configuration that makes an item unpurchasable.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CheckoutError::Validation(_)
                | CheckoutError::ItemNotFound(_)
                | CheckoutError::PriceNotAvailable { .. }
                | CheckoutError::PriceHidden { .. }
                | CheckoutError::Customer(CustomerError::Validation(_))
        )
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            CheckoutError::Gateway(e)
            | CheckoutError::Settings(SiteControlError::Unavailable(e))
            | CheckoutError::Customer(CustomerError::Gateway(e)) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Address;
    use serde_json::{json, Value};
    use std::time::Duration;
    use storefront_catalog::{FixedClock, PricingConfig};
    use storefront_core::SETTINGS_DOCTYPE;
    use storefront_shared::Masked;
    use storefront_store::InMemoryGateway;

    fn seeded(order_type: &str) -> Arc<InMemoryGateway> {
        Arc::new(
            InMemoryGateway::new()
                .with_doc(SETTINGS_DOCTYPE, json!({
                    "name": "settings",
                    "enable_price_visibility": 1,
                    "default_order_type": order_type,
                    "default_source_warehouse": "Stores - HQ",
                }))
                .with_doc("Customer", json!({
                    "name": "CUST-0007",
                    "custom_vat_registration_number": "300000000000003",
                }))
                .with_doc("Item", json!({
                    "item_code": "DRILL",
                    "item_name": "Cordless Drill",
                    "stock_uom": "Nos",
                    "custom_ecommerce_price": 100,
                    "custom_enable_promotion": 1,
                    "custom_promotion_start": "2024-06-01",
                    "custom_promotion_end": "2024-06-30",
                    "custom_promotional_rate": 1,
                    "custom_promotional_price": 80,
                    "custom_show_price": 1,
                }))
                .with_doc("Item", json!({
                    "item_code": "SAW",
                    "item_name": "Hand Saw",
                    "custom_fixed_price": 1,
                    "custom_ecommerce_price": 39.5,
                    "custom_show_price": 1,
                }))
                .with_doc("Item", json!({
                    "item_code": "SECRET",
                    "custom_ecommerce_price": 10,
                    "custom_show_price": 0,
                }))
                .with_doc("Item", json!({
                    "item_code": "UNPRICED",
                    "custom_show_price": 1,
                }))
                .with_doc("Item", json!({
                    "item_code": "QUOTE-ONLY",
                    "custom_ecommerce_price": 10,
                    "custom_enable_promotion": 1,
                    "custom_promotion_start": "2024-06-01",
                    "custom_promotion_end": "2024-06-30",
                    "custom_promotional_rate": 0,
                    "custom_show_price": 1,
                })),
        )
    }

    fn service(gateway: Arc<InMemoryGateway>) -> CheckoutService {
        let gateway: Arc<dyn ErpGateway> = gateway;
        let site_control = Arc::new(SiteControl::new(gateway.clone(), "settings", Duration::from_secs(60)));
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let engine = Arc::new(PricingEngine::with_clock(PricingConfig::default(), Arc::new(FixedClock::on(today))));
        CheckoutService::new(gateway, site_control, engine)
    }

    fn request(cart: Vec<(&str, f64)>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Noura Trading".into(),
            customer_type: Some("Company".into()),
            phone: Masked::from("+966500000001"),
            email: Some(Masked::from("buyer@example.com")),
            company_name: None,
            cr_no: None,
            vat_number: Some("300 000 000 000 003".into()),
            address: Address {
                address_line1: Some("King Fahd Rd".into()),
                postal_code: Some("12211".into()),
                city: Some("Riyadh".into()),
                country: Some("Saudi Arabia".into()),
            },
            cart: cart
                .into_iter()
                .map(|(code, qty)| CartLine { item_code: code.into(), qty })
                .collect(),
            notes: "Leave at gate".into(),
        }
    }

    #[test]
    fn test_validation_messages() {
        let message = |req: CheckoutRequest| req.validate(MAX_QTY_PER_ITEM).unwrap_err().to_string();

        assert_eq!(message(request(vec![])), "Cart cannot be empty");

        let mut req = request(vec![("DRILL", 1.0)]);
        req.customer_name = " ".into();
        assert_eq!(message(req), "Customer name is required");

        let mut req = request(vec![("DRILL", 1.0)]);
        req.phone = Masked::from("");
        assert_eq!(message(req), "Phone number is required");

        let mut req = request(vec![("DRILL", 1.0)]);
        req.address.city = None;
        assert_eq!(message(req), "city is required");

        assert_eq!(message(request(vec![("", 1.0)])), "Invalid cart item");
        assert_eq!(message(request(vec![("DRILL", 0.0)])), "Quantity must be greater than zero");
        assert_eq!(message(request(vec![("DRILL", 1000.5)])), "Quantity exceeds allowed limit");

        assert!(request(vec![("DRILL", 1000.0)]).validate(MAX_QTY_PER_ITEM).is_ok());
    }

    #[tokio::test]
    async fn test_price_cart_uses_engine_prices() {
        let checkout = service(seeded("E-Commerce RFQ"));
        let lines = checkout
            .price_cart(&[
                CartLine { item_code: "DRILL".into(), qty: 3.0 },
                CartLine { item_code: "SAW".into(), qty: 2.0 },
            ])
            .await
            .unwrap();

        assert_eq!(lines[0].unit_price, 80.0);
        assert_eq!(lines[0].amount, 240.0);
        assert_eq!(lines[0].uom.as_deref(), Some("Nos"));
        assert_eq!(lines[1].unit_price, 39.5);
        assert_eq!(lines[1].amount, 79.0);
    }

    #[tokio::test]
    async fn test_unpurchasable_lines_are_rejected() {
        let checkout = service(seeded("E-Commerce RFQ"));

        for (code, expected_hidden) in [("SECRET", true), ("UNPRICED", false), ("QUOTE-ONLY", false)] {
            let err = checkout
                .price_cart(&[CartLine { item_code: code.into(), qty: 1.0 }])
                .await
                .unwrap_err();
            assert!(err.is_client_error());
            assert!(!err.is_retryable());
            match err {
                CheckoutError::PriceHidden { item_code } => {
                    assert!(expected_hidden);
                    assert_eq!(item_code, code);
                }
                CheckoutError::PriceNotAvailable { item_code } => {
                    assert!(!expected_hidden);
                    assert_eq!(item_code, code);
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        let err = checkout
            .price_cart(&[CartLine { item_code: "GHOST".into(), qty: 1.0 }])
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::ItemNotFound(code) if code == "GHOST"));
    }

    #[tokio::test]
    async fn test_place_rfq() {
        let gateway = seeded("E-Commerce RFQ");
        let checkout = service(gateway.clone());

        let receipt = checkout
            .place_order(request(vec![("DRILL", 1.0), ("SAW", 2.0)]))
            .await
            .unwrap();

        assert_eq!(receipt.status, "submitted");
        assert_eq!(receipt.order_type, OrderType::Rfq);
        assert_eq!(receipt.customer_id, "CUST-0007");
        assert_eq!(receipt.total, 159.0);
        let customers = gateway.docs("Customer").await;
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0]["custom_email"], json!("buyer@example.com"));
        assert_eq!(receipt.created_at, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());

        let stored = gateway.docs("E-Commerce RFQ").await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["name"], json!(receipt.order_id));
        assert_eq!(stored[0]["email_id"], json!("buyer@example.com"));
        let rows = stored[0]["item_table"].as_array().unwrap();
        assert_eq!(rows[0]["unit_pricex"], json!(80.0));
    }

    #[tokio::test]
    async fn test_place_sales_order() {
        let gateway = seeded("Sales Order");
        let checkout = service(gateway.clone());

        let receipt = checkout
            .place_order(request(vec![("SAW", 1.0)]))
            .await
            .unwrap();
        assert_eq!(receipt.order_type, OrderType::SalesOrder);

        let stored = gateway.docs("Sales Order").await;
        let rows: &Value = &stored[0]["items"];
        assert_eq!(rows[0]["rate"], json!(39.5));
        assert_eq!(rows[0]["warehouse"], json!("Stores - HQ"));
        assert!(gateway.docs("E-Commerce RFQ").await.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_line_creates_nothing() {
        let gateway = seeded("E-Commerce RFQ");
        let checkout = service(gateway.clone());

        let err = checkout
            .place_order(request(vec![("DRILL", 1.0), ("SECRET", 1.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::PriceHidden { .. }));
        assert!(gateway.docs("E-Commerce RFQ").await.is_empty());
    }

    #[tokio::test]
    async fn test_new_buyer_becomes_customer() {
        let gateway = seeded("E-Commerce RFQ");
        let checkout = service(gateway.clone());

        let mut req = request(vec![("SAW", 1.0)]);
        req.vat_number = Some("399999999900003".into());
        let receipt = checkout.place_order(req).await.unwrap();

        let customers = gateway.docs("Customer").await;
        assert_eq!(customers.len(), 2);
        assert_ne!(receipt.customer_id, "CUST-0007");
        assert_eq!(customers[1]["name"], json!(receipt.customer_id));
        assert_eq!(customers[1]["customer_type"], json!("Company"));

        let stored = gateway.docs("E-Commerce RFQ").await;
        assert_eq!(stored[0]["customer"], json!(receipt.customer_id));
    }

    #[tokio::test]
    async fn test_unpriced_cart_registers_no_customer() {
        let gateway = seeded("E-Commerce RFQ");
        let checkout = service(gateway.clone());

        let mut req = request(vec![("UNPRICED", 1.0)]);
        req.vat_number = Some("399999999900003".into());
        let err = checkout.place_order(req).await.unwrap_err();

        assert!(matches!(err, CheckoutError::PriceNotAvailable { .. }));
        assert_eq!(gateway.docs("Customer").await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_vat_is_client_error() {
        let gateway = seeded("E-Commerce RFQ");
        let checkout = service(gateway.clone());

        let mut req = request(vec![("SAW", 1.0)]);
        req.vat_number = None;
        let err = checkout.place_order(req).await.unwrap_err();

        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "VAT number is required");
        assert!(gateway.docs("E-Commerce RFQ").await.is_empty());
    }

    #[tokio::test]
    async fn test_frozen_store_blocks_checkout() {
        let gateway = Arc::new(InMemoryGateway::new().with_doc(
            SETTINGS_DOCTYPE,
            json!({"name": "settings", "e_store_visibility": "Disable"}),
        ));
        let checkout = service(gateway);
        let err = checkout
            .place_order(request(vec![("DRILL", 1.0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::StoreUnavailable));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_retry_classification() {
        assert!(CheckoutError::Gateway(GatewayError::Transport("reset".into())).is_retryable());
        assert!(!CheckoutError::Gateway(GatewayError::Decode("bad".into())).is_retryable());
        assert!(!CheckoutError::PriceHidden { item_code: "X".into() }.is_retryable());
    }
}
