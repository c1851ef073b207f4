use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::item::{ItemField, RawItem};

pub const MANUAL_PRICING: &str = "Manual Pricing";
pub const STANDARD_BASE_PRICE: &str = "Standard";

/// How the promotional price was produced upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PromotionType {
    /// Merchandiser typed the promotional price.
    ManualPricing,
    /// ERP derived the price from a discount percentage.
    Percentage,
}

impl PromotionType {
    pub fn of(item: &RawItem) -> Self {
        match item.text(ItemField::PromotionType).as_deref() {
            Some(MANUAL_PRICING) => PromotionType::ManualPricing,
            _ => PromotionType::Percentage,
        }
    }
}

/// Reference price shown struck through during a promotion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BasePriceSource {
    Standard,
    Ecommerce,
}

impl BasePriceSource {
    pub fn of(item: &RawItem) -> Self {
        match item.text(ItemField::PromotionBasePriceSource).as_deref() {
            Some(STANDARD_BASE_PRICE) => BasePriceSource::Standard,
            _ => BasePriceSource::Ecommerce,
        }
    }

    pub fn price_field(&self) -> ItemField {
        match self {
            BasePriceSource::Standard => ItemField::StandardSellingPrice,
            BasePriceSource::Ecommerce => ItemField::EcommercePrice,
        }
    }
}

/// True when the promotion is enabled and `today` falls inside
/// `[promotion_start, promotion_end]`. A missing or unparseable bound makes
/// the promotion inactive.
pub fn is_promotion_active(item: &RawItem, today: NaiveDate) -> bool {
    if !item.flag(ItemField::PromotionEnabled) {
        return false;
    }

    let (Some(start), Some(end)) = (
        item.date(ItemField::PromotionStart),
        item.date(ItemField::PromotionEnd),
    ) else {
        debug!(
            "Promotion on {} ignored, window bounds missing or unparseable",
            item.item_code().unwrap_or_default()
        );
        return false;
    };

    start <= today && today <= end
}
