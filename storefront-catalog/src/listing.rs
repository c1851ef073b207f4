use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_core::{
    ErpGateway, Filter, GatewayError, ResourceQuery, SiteControl, SiteControlError, SiteSettings,
    ITEM_DOCTYPE,
};
use storefront_shared::to_text;
use tracing::info;

use crate::item::{ItemField, RawItem};
use crate::pricing::{transform_item_on, PricingEngine, ResolvedPricing};

pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Descriptive fields fetched alongside the pricing attributes.
const CARD_FIELDS: [&str; 7] = [
    "item_code",
    "item_name",
    "custom_subcategory",
    "image",
    "description",
    "standard_rate",
    "item_group",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    #[default]
    Newest,
}

impl SortOrder {
    pub fn erp_order(&self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "standard_rate asc",
            SortOrder::PriceDesc => "standard_rate desc",
            SortOrder::Newest => "modified desc",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub order_by: SortOrder,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

impl CatalogQuery {
    /// Page numbers start at 1; a zero page size means "use the default".
    pub fn normalized(mut self, default_page_size: usize) -> Self {
        self.page = self.page.max(1);
        if self.page_size < 1 {
            self.page_size = default_page_size.max(1);
        }
        self
    }

    pub fn filters(&self) -> Vec<Filter> {
        let mut filters = vec![Filter::eq("disabled", 0)];
        if let Some(category) = self.category.as_deref().filter(|c| !c.is_empty()) {
            filters.push(Filter::eq("item_group", category));
        }
        if let Some(subcategory) = self.subcategory.as_deref().filter(|s| !s.is_empty()) {
            filters.push(Filter::eq("custom_subcategory", subcategory));
        }
        filters
    }

    /// Resource query for one page. Call on a normalized query.
    pub fn to_resource_query(&self) -> ResourceQuery {
        let pricing_fields = ItemField::ALL.iter().filter_map(ItemField::erp_key);
        let mut fields: Vec<&str> = CARD_FIELDS.to_vec();
        fields.extend(pricing_fields);

        ResourceQuery {
            filters: self.filters(),
            fields: fields.into_iter().map(String::from).collect(),
            order_by: Some(self.order_by.erp_order().to_string()),
            limit_start: self.page.saturating_sub(1).saturating_mul(self.page_size),
            limit_page_length: self.page_size,
        }
    }

    fn matches_search(&self, item: &RawItem) -> bool {
        let Some(needle) = self.search.as_deref().map(str::to_lowercase).filter(|s| !s.is_empty()) else {
            return true;
        };
        ["item_name", "item_code"].iter().any(|key| {
            to_text(item.raw(key)).is_some_and(|text| text.to_lowercase().contains(&needle))
        })
    }
}

/// A product card as served to the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub category: String,
    pub subcategory: String,
    #[serde(flatten)]
    pub pricing: ResolvedPricing,
}

impl CatalogItem {
    pub fn new(item: &RawItem, pricing: ResolvedPricing) -> Self {
        let text = |key: &str| to_text(item.raw(key));
        Self {
            item_code: item.item_code().unwrap_or_default(),
            item_name: text("item_name").unwrap_or_default(),
            description: text("description").unwrap_or_default(),
            category: text("item_group").unwrap_or_else(|| "Uncategorized".to_string()),
            subcategory: text("custom_subcategory").unwrap_or_else(|| "Other".to_string()),
            pricing,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogPage {
    pub status: String,
    pub items: Vec<CatalogItem>,
    pub pagination: Pagination,
    pub last_sync: DateTime<Utc>,
}

/// Lists catalog items with server-resolved pricing.
pub struct CatalogService {
    gateway: Arc<dyn ErpGateway>,
    site_control: Arc<SiteControl>,
    engine: Arc<PricingEngine>,
    default_page_size: usize,
}

impl CatalogService {
    pub fn new(
        gateway: Arc<dyn ErpGateway>,
        site_control: Arc<SiteControl>,
        engine: Arc<PricingEngine>,
    ) -> Self {
        Self {
            gateway,
            site_control,
            engine,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size.max(1);
        self
    }

    pub async fn list_products(&self, query: CatalogQuery) -> Result<CatalogPage, CatalogError> {
        let settings = self.open_store().await?;
        let query = query.normalized(self.default_page_size);
        let filters = query.filters();

        let total_items = self.gateway.count_docs(ITEM_DOCTYPE, &filters).await?;
        let total_pages = total_items.div_ceil(query.page_size);

        let docs = self
            .gateway
            .list_docs(ITEM_DOCTYPE, &query.to_resource_query())
            .await?;

        // One notion of "today" for the whole page.
        let today = self.engine.today();
        let items: Vec<CatalogItem> = docs
            .into_iter()
            .map(RawItem::new)
            .filter(|item| query.matches_search(item))
            .map(|item| {
                let pricing = present(&settings, transform_item_on(&item, today));
                CatalogItem::new(&item, pricing)
            })
            .collect();

        info!(
            "Catalog page {} served: {} items of {}",
            query.page,
            items.len(),
            total_items
        );

        Ok(CatalogPage {
            status: "success".to_string(),
            items,
            pagination: Pagination {
                page: query.page,
                page_size: query.page_size,
                total_items,
                total_pages,
            },
            last_sync: self.engine.now(),
        })
    }

    pub async fn get_product(&self, item_code: &str) -> Result<CatalogItem, CatalogError> {
        let settings = self.open_store().await?;
        let item = RawItem::new(self.gateway.get_doc(ITEM_DOCTYPE, item_code).await?);
        let pricing = present(&settings, self.engine.transform_item(&item));
        Ok(CatalogItem::new(&item, pricing))
    }

    async fn open_store(&self) -> Result<SiteSettings, CatalogError> {
        let settings = self.site_control.settings().await?;
        if settings.is_site_frozen() {
            return Err(CatalogError::StoreUnavailable);
        }
        Ok(settings)
    }
}

/// Applies the store-wide price switch on top of the per-item projection.
fn present(settings: &SiteSettings, mut pricing: ResolvedPricing) -> ResolvedPricing {
    if !settings.price_visibility {
        pricing.hide_price();
    }
    pricing
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Store is currently unavailable")]
    StoreUnavailable,

    #[error(transparent)]
    Settings(#[from] SiteControlError),

    #[error("Catalog lookup failed: {0}")]
    Gateway(#[from] GatewayError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::pricing::{PricingConfig, StockStatus};
    use chrono::{NaiveDate, TimeZone};
    use serde_json::{json, Value};
    use std::time::Duration;
    use storefront_core::SETTINGS_DOCTYPE;
    use storefront_store::InMemoryGateway;

    fn engine() -> Arc<PricingEngine> {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        Arc::new(PricingEngine::with_clock(PricingConfig::default(), Arc::new(FixedClock::on(today))))
    }

    fn settings(price_visibility: i64, visibility: &str) -> Value {
        json!({
            "name": "settings",
            "e_store_visibility": visibility,
            "enable_price_visibility": price_visibility,
        })
    }

    fn catalog_gateway(settings_doc: Value) -> InMemoryGateway {
        InMemoryGateway::new()
            .with_doc(SETTINGS_DOCTYPE, settings_doc)
            .with_doc("Item", json!({
                "item_code": "DRILL-18V",
                "item_name": "Cordless Drill",
                "item_group": "Tools",
                "custom_subcategory": "Power Tools",
                "standard_rate": 100,
                "modified": "2024-06-01",
                "custom_ecommerce_price": 100,
                "custom_enable_promotion": 1,
                "custom_promotion_start": "2024-06-01",
                "custom_promotion_end": "2024-06-30",
                "custom_promotional_rate": 1,
                "custom_promotion_type": "Percentage",
                "custom_promotional_price": 85,
                "custom_promotion_discount_": 15,
                "custom_show_price": 1,
                "custom_show_strike_price": 1,
                "custom_show_stock": 1,
                "custom_show_image": 1,
                "image": "/files/drill.png",
            }))
            .with_doc("Item", json!({
                "item_code": "SAW-01",
                "item_name": "Hand Saw",
                "item_group": "Tools",
                "standard_rate": 40,
                "modified": "2024-05-01",
                "custom_fixed_price": 1,
                "custom_ecommerce_price": 39.5,
                "custom_show_price": 1,
            }))
            .with_doc("Item", json!({
                "item_code": "PAINT-W",
                "item_name": "White Paint",
                "item_group": "Paint",
                "standard_rate": 20,
                "modified": "2024-04-01",
                "custom_ecommerce_price": 20,
                "custom_show_price": 0,
            }))
            .with_doc("Item", json!({
                "item_code": "OLD-1",
                "item_name": "Retired",
                "disabled": 1,
            }))
    }

    fn service(gateway: InMemoryGateway) -> CatalogService {
        let gateway: Arc<dyn ErpGateway> = Arc::new(gateway);
        let site_control = Arc::new(SiteControl::new(gateway.clone(), "settings", Duration::from_secs(60)));
        CatalogService::new(gateway, site_control, engine())
    }

    #[test]
    fn test_query_normalization_and_params() {
        let query = CatalogQuery {
            category: Some("Tools".into()),
            order_by: SortOrder::PriceDesc,
            page: 0,
            page_size: 0,
            ..Default::default()
        }
        .normalized(25);

        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 25);

        let resource = CatalogQuery { page: 3, ..query }.to_resource_query();
        assert_eq!(resource.limit_start, 50);
        assert_eq!(resource.limit_page_length, 25);
        assert_eq!(resource.order_by.as_deref(), Some("standard_rate desc"));
        assert_eq!(resource.filters.len(), 2);
        assert!(resource.fields.iter().any(|f| f == "custom_promotional_price"));
        assert!(resource.fields.iter().any(|f| f == "image"));
    }

    #[tokio::test]
    async fn test_listing_resolves_pricing() {
        let catalog = service(catalog_gateway(settings(1, "Enable")));
        let page = catalog.list_products(CatalogQuery::default()).await.unwrap();

        assert_eq!(page.status, "success");
        assert_eq!(page.pagination, Pagination { page: 1, page_size: 100, total_items: 3, total_pages: 1 });
        assert_eq!(page.last_sync, Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap());

        let codes: Vec<&str> = page.items.iter().map(|i| i.item_code.as_str()).collect();
        assert_eq!(codes, vec!["DRILL-18V", "SAW-01", "PAINT-W"]);

        let drill = &page.items[0];
        assert_eq!(drill.pricing.price, Some(85.0));
        assert!(drill.pricing.is_on_sale);
        assert_eq!(drill.pricing.original_price, Some(100.0));
        assert_eq!(drill.pricing.discount_percentage, 15.0);
        assert_eq!(drill.pricing.stock_status, StockStatus::InStock);
        assert_eq!(drill.pricing.image.as_deref(), Some("/files/drill.png"));
        assert_eq!(drill.subcategory, "Power Tools");

        let saw = &page.items[1];
        assert_eq!(saw.pricing.price, Some(39.5));
        assert_eq!(saw.subcategory, "Other");

        let paint = &page.items[2];
        assert_eq!(paint.pricing.price, None);
        assert!(!paint.pricing.is_price_visible);
    }

    #[tokio::test]
    async fn test_global_price_switch_hides_everything() {
        let catalog = service(catalog_gateway(settings(0, "Enable")));
        let page = catalog.list_products(CatalogQuery::default()).await.unwrap();

        for item in &page.items {
            assert_eq!(item.pricing.price, None);
            assert_eq!(item.pricing.original_price, None);
            assert_eq!(item.pricing.discount_percentage, 0.0);
            assert!(!item.pricing.is_price_visible);
        }
        // Sale badge is independent of price display.
        assert!(page.items[0].pricing.is_on_sale);
    }

    #[tokio::test]
    async fn test_filters_search_and_pages() {
        let catalog = service(catalog_gateway(settings(1, "Enable")));

        let tools = catalog
            .list_products(CatalogQuery {
                category: Some("Tools".into()),
                order_by: SortOrder::PriceAsc,
                ..Default::default()
            })
            .await
            .unwrap();
        let codes: Vec<&str> = tools.items.iter().map(|i| i.item_code.as_str()).collect();
        assert_eq!(codes, vec!["SAW-01", "DRILL-18V"]);

        let search = catalog
            .list_products(CatalogQuery { search: Some("drill".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(search.items.len(), 1);
        assert_eq!(search.items[0].item_name, "Cordless Drill");

        let paged = catalog
            .list_products(CatalogQuery { page: 2, page_size: 2, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(paged.pagination.total_pages, 2);
        assert_eq!(paged.items.len(), 1);
        assert_eq!(paged.items[0].item_code, "PAINT-W");
    }

    #[tokio::test]
    async fn test_page_far_past_the_end_is_empty() {
        let catalog = service(catalog_gateway(settings(1, "Enable")));

        for (page, page_size) in [(usize::MAX, 100), (usize::MAX / 2, usize::MAX)] {
            let query = CatalogQuery { page, page_size, ..Default::default() };
            assert_eq!(query.clone().normalized(100).to_resource_query().limit_start, usize::MAX);

            let result = catalog.list_products(query).await.unwrap();
            assert!(result.items.is_empty());
            assert_eq!(result.pagination.page, page);
            assert_eq!(result.pagination.total_items, 3);
            assert_eq!(result.pagination.total_pages, 1);
        }
    }

    #[tokio::test]
    async fn test_frozen_store() {
        let catalog = service(catalog_gateway(settings(1, "Maintenance")));
        let result = catalog.list_products(CatalogQuery::default()).await;
        assert!(matches!(result, Err(CatalogError::StoreUnavailable)));
    }

    #[tokio::test]
    async fn test_get_product() {
        let catalog = service(catalog_gateway(settings(1, "Enable")));
        let item = catalog.get_product("SAW-01").await.unwrap();
        assert_eq!(item.pricing.price, Some(39.5));

        let missing = catalog.get_product("NOPE").await;
        assert!(matches!(missing, Err(CatalogError::Gateway(GatewayError::NotFound { .. }))));
    }

    #[test]
    fn test_card_serializes_flat() {
        let item = RawItem::from_json(json!({"item_code": "X", "custom_show_price": 1, "custom_ecommerce_price": 5}));
        let card = CatalogItem::new(&item, transform_item_on(&item, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()));
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["item_code"], json!("X"));
        assert_eq!(value["price"], json!(5.0));
        assert_eq!(value["category"], json!("Uncategorized"));
        assert_eq!(value["stock_status"], json!("Out of Stock"));
    }
}
