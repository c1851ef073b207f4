use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::item::{ItemField, RawItem};
use crate::promotion::{is_promotion_active, BasePriceSource, PromotionType};

/// Pricing engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Business timezone as an offset from UTC. "Today" for promotion windows
    /// is evaluated here, never in the caller's local time.
    #[serde(default)]
    pub business_utc_offset_minutes: i32,
}

impl PricingConfig {
    pub fn business_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.business_utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix())
    }
}

/// Pricing source, listed in priority order. Exactly one applies per item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Merchandiser-set e-commerce price.
    FixedPrice,
    /// Maximum retail price.
    Mrp,
    /// Active, date-windowed promotion.
    Promotion,
    Default,
}

impl PricingMode {
    pub fn select(item: &RawItem, today: NaiveDate) -> Self {
        if item.flag(ItemField::FixedPriceEnabled) {
            PricingMode::FixedPrice
        } else if item.flag(ItemField::MrpModeEnabled) {
            PricingMode::Mrp
        } else if is_promotion_active(item, today) {
            PricingMode::Promotion
        } else {
            PricingMode::Default
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceOutcome {
    Priced(f64),
    /// The selected mode has no price on record.
    Missing,
    /// A promotion is running but its rate is not to be shown.
    HiddenByPromotion,
}

impl PriceOutcome {
    fn from_number(price: Option<f64>) -> Self {
        price.map_or(PriceOutcome::Missing, PriceOutcome::Priced)
    }
}

/// Which mode won and what it produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceResolution {
    pub mode: PricingMode,
    pub outcome: PriceOutcome,
}

impl PriceResolution {
    pub fn resolve(item: &RawItem, today: NaiveDate) -> Self {
        let mode = PricingMode::select(item, today);
        let outcome = match mode {
            PricingMode::FixedPrice => PriceOutcome::from_number(item.number(ItemField::EcommercePrice)),
            PricingMode::Mrp => PriceOutcome::from_number(item.number(ItemField::MrpPrice)),
            PricingMode::Promotion => {
                if !item.flag(ItemField::PromotionRateVisible) {
                    debug!(
                        "Promotional rate hidden for {}",
                        item.item_code().unwrap_or_default()
                    );
                    PriceOutcome::HiddenByPromotion
                } else {
                    let field = match PromotionType::of(item) {
                        PromotionType::ManualPricing => ItemField::PromotionPriceManual,
                        PromotionType::Percentage => ItemField::PromotionalPrice,
                    };
                    PriceOutcome::from_number(item.number(field))
                }
            }
            PricingMode::Default => PriceOutcome::from_number(item.number(ItemField::EcommercePrice)),
        };

        Self { mode, outcome }
    }

    pub fn price(&self) -> Option<f64> {
        match self.outcome {
            PriceOutcome::Priced(price) => Some(price),
            PriceOutcome::Missing | PriceOutcome::HiddenByPromotion => None,
        }
    }

    /// A promotional price was actually selected.
    pub fn is_promotional(&self) -> bool {
        self.mode == PricingMode::Promotion && self.price().is_some()
    }
}

/// Manually curated stock label; not a live inventory level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StockStatus {
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

/// Display-ready pricing and visibility for one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolvedPricing {
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount_percentage: f64,
    pub is_on_sale: bool,
    pub is_price_visible: bool,
    pub is_image_visible: bool,
    pub stock_status: StockStatus,
    pub image: Option<String>,
}

impl ResolvedPricing {
    /// Suppresses every price figure, e.g. under a store-wide price switch.
    pub fn hide_price(&mut self) {
        self.price = None;
        self.original_price = None;
        self.discount_percentage = 0.0;
        self.is_price_visible = false;
    }
}

/// Price resolution: fixed > MRP > promotion > e-commerce price.
pub fn resolve_price(item: &RawItem, today: NaiveDate) -> Option<f64> {
    PriceResolution::resolve(item, today).price()
}

/// Projects an item to what the shopper may see on `today`.
pub fn transform_item_on(item: &RawItem, today: NaiveDate) -> ResolvedPricing {
    let resolution = PriceResolution::resolve(item, today);
    let price = resolution.price();

    let is_price_visible = item.flag(ItemField::ShowPrice);
    let is_image_visible = item.flag(ItemField::ShowImage);
    let stock_status = if item.flag(ItemField::ShowStock) {
        StockStatus::InStock
    } else {
        StockStatus::OutOfStock
    };

    let mut original_price = None;
    let mut discount_percentage = 0.0;
    let is_on_sale = resolution.is_promotional();

    if is_on_sale && item.flag(ItemField::ShowStrikePrice) {
        original_price = item.number(BasePriceSource::of(item).price_field());
        if PromotionType::of(item) == PromotionType::Percentage {
            discount_percentage = item.number(ItemField::PromotionDiscountPercent).unwrap_or(0.0);
        }
    }

    ResolvedPricing {
        price: price.filter(|_| is_price_visible),
        original_price,
        discount_percentage,
        is_on_sale,
        is_price_visible,
        is_image_visible,
        stock_status,
        image: item.text(ItemField::Image).filter(|_| is_image_visible),
    }
}

/// Pricing & visibility engine bound to a clock and business timezone.
///
/// Stateless apart from configuration; share it freely across tasks.
#[derive(Clone)]
pub struct PricingEngine {
    config: PricingConfig,
    clock: Arc<dyn Clock>,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PricingConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current date in the business timezone.
    pub fn today(&self) -> NaiveDate {
        self.clock
            .now()
            .with_timezone(&self.config.business_offset())
            .date_naive()
    }

    pub fn is_promotion_active(&self, item: &RawItem) -> bool {
        is_promotion_active(item, self.today())
    }

    pub fn resolve(&self, item: &RawItem) -> PriceResolution {
        PriceResolution::resolve(item, self.today())
    }

    pub fn resolve_price(&self, item: &RawItem) -> Option<f64> {
        resolve_price(item, self.today())
    }

    pub fn transform_item(&self, item: &RawItem) -> ResolvedPricing {
        transform_item_on(item, self.today())
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
