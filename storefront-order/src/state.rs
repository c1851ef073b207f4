use std::sync::Arc;

use storefront_catalog::{CatalogService, PricingConfig, PricingEngine};
use storefront_core::{ErpGateway, SiteControl};
use storefront_store::Config;
use tracing::info;

use crate::checkout::CheckoutService;
use crate::customer::CustomerService;
use crate::tracking::OrderTracker;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn ErpGateway>,
    pub site_control: Arc<SiteControl>,
    pub engine: Arc<PricingEngine>,
    pub catalog: Arc<CatalogService>,
    pub checkout: Arc<CheckoutService>,
    pub customers: Arc<CustomerService>,
    pub tracking: Arc<OrderTracker>,
}

impl AppState {
    pub fn new(config: &Config, gateway: Arc<dyn ErpGateway>) -> Self {
        let engine = Arc::new(PricingEngine::new(PricingConfig {
            business_utc_offset_minutes: config.pricing.business_utc_offset_minutes,
        }));
        Self::with_engine(config, gateway, engine)
    }

    /// Same as [`AppState::new`] with a caller-supplied engine, e.g. one on a fixed clock.
    pub fn with_engine(config: &Config, gateway: Arc<dyn ErpGateway>, engine: Arc<PricingEngine>) -> Self {
        let site_control = Arc::new(SiteControl::new(
            gateway.clone(),
            config.site_control.settings_name.clone(),
            config.site_control.cache_ttl(),
        )
        .with_retry_delay(config.site_control.retry_delay()));

        let catalog = CatalogService::new(gateway.clone(), site_control.clone(), engine.clone())
            .with_default_page_size(config.catalog.default_page_size);
        let checkout = CheckoutService::new(gateway.clone(), site_control.clone(), engine.clone())
            .with_max_qty_per_item(config.checkout.max_qty_per_item);
        let customers = Arc::new(CustomerService::new(gateway.clone()));
        let tracking = Arc::new(OrderTracker::new(gateway.clone()));

        info!(
            "Storefront services ready (business offset {} min, settings {})",
            config.pricing.business_utc_offset_minutes, config.site_control.settings_name
        );

        Self {
            gateway,
            site_control,
            engine,
            catalog: Arc::new(catalog),
            checkout: Arc::new(checkout),
            customers,
            tracking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, CartLine, CheckoutRequest};
    use crate::checkout::CheckoutError;
    use chrono::NaiveDate;
    use serde_json::json;
    use storefront_catalog::{CatalogQuery, FixedClock};
    use storefront_core::SETTINGS_DOCTYPE;
    use storefront_shared::Masked;
    use storefront_store::InMemoryGateway;

    fn gateway() -> Arc<dyn ErpGateway> {
        Arc::new(
            InMemoryGateway::new()
                .with_doc(SETTINGS_DOCTYPE, json!({"name": "web-settings", "enable_price_visibility": 1}))
                .with_doc("Item", json!({"item_code": "A", "custom_ecommerce_price": 5, "custom_show_price": 1}))
                .with_doc("Item", json!({"item_code": "B", "custom_ecommerce_price": 6, "custom_show_price": 1}))
                .with_doc("Item", json!({"item_code": "C", "custom_ecommerce_price": 7, "custom_show_price": 1})),
        )
    }

    fn config() -> Config {
        Config::from_toml_str(
            r#"
            [site_control]
            settings_name = "web-settings"

            [catalog]
            default_page_size = 2

            [checkout]
            max_qty_per_item = 10
            "#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_config_flows_into_services() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let engine = Arc::new(PricingEngine::with_clock(PricingConfig::default(), Arc::new(FixedClock::on(today))));
        let state = AppState::with_engine(&config(), gateway(), engine);

        let page = state.catalog.list_products(CatalogQuery::default()).await.unwrap();
        assert_eq!(page.pagination.page_size, 2);
        assert_eq!(page.pagination.total_pages, 2);

        let request = CheckoutRequest {
            customer_name: "Walk-in".into(),
            customer_type: None,
            phone: Masked::from("0500000000"),
            email: None,
            company_name: None,
            cr_no: None,
            vat_number: Some("300000000000003".into()),
            address: Address {
                address_line1: Some("1 Main St".into()),
                postal_code: Some("11564".into()),
                city: Some("Riyadh".into()),
                country: Some("Saudi Arabia".into()),
            },
            cart: vec![CartLine { item_code: "A".into(), qty: 11.0 }],
            notes: String::new(),
        };
        let err = state.checkout.place_order(request).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Validation(msg) if msg == "Quantity exceeds allowed limit"));
    }

    #[test]
    fn test_engine_takes_business_offset() {
        let config = Config::from_toml_str("[pricing]\nbusiness_utc_offset_minutes = 180\n").unwrap();
        let state = AppState::new(&config, gateway());
        assert_eq!(state.engine.config().business_utc_offset_minutes, 180);
    }
}
