pub mod gateway;
pub mod query;
pub mod site_control;

pub use gateway::{Document, ErpGateway, GatewayError, GatewayResult};
pub use query::{Filter, FilterOp, ResourceQuery};
pub use site_control::{SiteControl, SiteControlError, SiteSettings, StoreVisibility};

/// ERP doctype holding catalog items.
pub const ITEM_DOCTYPE: &str = "Item";

/// ERP doctype holding storefront-wide settings.
pub const SETTINGS_DOCTYPE: &str = "E-Commerce Settings";
