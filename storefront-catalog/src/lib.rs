pub mod clock;
pub mod item;
pub mod promotion;
pub mod pricing;
pub mod listing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use item::{ItemField, RawItem};
pub use pricing::{
    PriceOutcome, PriceResolution, PricingConfig, PricingEngine, PricingMode, ResolvedPricing,
    StockStatus,
};
pub use promotion::{BasePriceSource, PromotionType};
pub use listing::{CatalogError, CatalogItem, CatalogPage, CatalogQuery, CatalogService, SortOrder};
