use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storefront_core::Document;
use storefront_shared::{to_date, to_flag, to_number, to_text};

/// Attributes of an ERP item that drive pricing and visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemField {
    FixedPriceEnabled,
    MrpModeEnabled,
    EcommercePrice,
    MrpPrice,
    StandardSellingPrice,
    PromotionalPrice,
    PromotionPriceManual,
    PromotionEnabled,
    PromotionStart,
    PromotionEnd,
    PromotionType,
    PromotionRateVisible,
    PromotionDiscountPercent,
    PromotionBasePriceSource,
    ShowPrice,
    ShowImage,
    ShowStock,
    ShowStrikePrice,
    Image,
}

impl ItemField {
    pub const ALL: [ItemField; 19] = [
        ItemField::FixedPriceEnabled,
        ItemField::MrpModeEnabled,
        ItemField::EcommercePrice,
        ItemField::MrpPrice,
        ItemField::StandardSellingPrice,
        ItemField::PromotionalPrice,
        ItemField::PromotionPriceManual,
        ItemField::PromotionEnabled,
        ItemField::PromotionStart,
        ItemField::PromotionEnd,
        ItemField::PromotionType,
        ItemField::PromotionRateVisible,
        ItemField::PromotionDiscountPercent,
        ItemField::PromotionBasePriceSource,
        ItemField::ShowPrice,
        ItemField::ShowImage,
        ItemField::ShowStock,
        ItemField::ShowStrikePrice,
        ItemField::Image,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ItemField::FixedPriceEnabled => "fixed_price_enabled",
            ItemField::MrpModeEnabled => "mrp_mode_enabled",
            ItemField::EcommercePrice => "ecommerce_price",
            ItemField::MrpPrice => "mrp_price",
            ItemField::StandardSellingPrice => "standard_selling_price",
            ItemField::PromotionalPrice => "promotional_price",
            ItemField::PromotionPriceManual => "promotion_price_manual",
            ItemField::PromotionEnabled => "promotion_enabled",
            ItemField::PromotionStart => "promotion_start",
            ItemField::PromotionEnd => "promotion_end",
            ItemField::PromotionType => "promotion_type",
            ItemField::PromotionRateVisible => "promotion_rate_visible",
            ItemField::PromotionDiscountPercent => "promotion_discount_percent",
            ItemField::PromotionBasePriceSource => "promotion_base_price_source",
            ItemField::ShowPrice => "show_price",
            ItemField::ShowImage => "show_image",
            ItemField::ShowStock => "show_stock",
            ItemField::ShowStrikePrice => "show_strike_price",
            ItemField::Image => "image",
        }
    }

    /// Custom-field name on the ERP Item doctype, when it differs from [`key`](Self::key).
    pub fn erp_key(&self) -> Option<&'static str> {
        let key = match self {
            ItemField::FixedPriceEnabled => "custom_fixed_price",
            ItemField::MrpModeEnabled => "custom_mrp_rate",
            ItemField::EcommercePrice => "custom_ecommerce_price",
            ItemField::MrpPrice => "custom_mrp_price",
            ItemField::StandardSellingPrice => "custom_standard_selling_price",
            ItemField::PromotionalPrice => "custom_promotional_price",
            ItemField::PromotionPriceManual => "custom_promotion_price_manual",
            ItemField::PromotionEnabled => "custom_enable_promotion",
            ItemField::PromotionStart => "custom_promotion_start",
            ItemField::PromotionEnd => "custom_promotion_end",
            ItemField::PromotionType => "custom_promotion_type",
            ItemField::PromotionRateVisible => "custom_promotional_rate",
            ItemField::PromotionDiscountPercent => "custom_promotion_discount_",
            ItemField::PromotionBasePriceSource => "custom_promotion_base_price",
            ItemField::ShowPrice => "custom_show_price",
            ItemField::ShowImage => "custom_show_image",
            ItemField::ShowStock => "custom_show_stock",
            ItemField::ShowStrikePrice => "custom_show_strike_price",
            ItemField::Image => return None,
        };
        Some(key)
    }
}

/// Read-only snapshot of one ERP item record.
///
/// Lookups accept either the canonical attribute name or the ERP custom-field
/// name; a non-null canonical value wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawItem(Document);

impl RawItem {
    pub fn new(doc: Document) -> Self {
        Self(doc)
    }

    /// Builds an item from a JSON object; anything else yields an empty item.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(doc) => Self(doc),
            _ => Self::default(),
        }
    }

    pub fn get(&self, field: ItemField) -> Option<&Value> {
        match self.0.get(field.key()) {
            Some(value) if !value.is_null() => Some(value),
            _ => field.erp_key().and_then(|key| self.0.get(key)),
        }
    }

    /// Attribute outside the pricing set, e.g. `item_name`.
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn flag(&self, field: ItemField) -> bool {
        to_flag(self.get(field))
    }

    pub fn number(&self, field: ItemField) -> Option<f64> {
        to_number(self.get(field))
    }

    pub fn date(&self, field: ItemField) -> Option<NaiveDate> {
        to_date(self.get(field))
    }

    pub fn text(&self, field: ItemField) -> Option<String> {
        to_text(self.get(field))
    }

    pub fn item_code(&self) -> Option<String> {
        to_text(self.raw("item_code")).or_else(|| to_text(self.raw("name")))
    }

    pub fn as_document(&self) -> &Document {
        &self.0
    }
}

impl From<Document> for RawItem {
    fn from(doc: Document) -> Self {
        Self(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_and_erp_names() {
        let item = RawItem::from_json(json!({
            "custom_fixed_price": 1,
            "ecommerce_price": 120,
            "custom_ecommerce_price": 99,
            "mrp_price": null,
            "custom_mrp_price": "150",
        }));

        assert!(item.flag(ItemField::FixedPriceEnabled));
        assert_eq!(item.number(ItemField::EcommercePrice), Some(120.0));
        assert_eq!(item.number(ItemField::MrpPrice), Some(150.0));
        assert_eq!(item.number(ItemField::PromotionalPrice), None);
    }

    #[test]
    fn test_keys_are_unique() {
        let mut keys: Vec<&str> = ItemField::ALL.iter().map(|f| f.key()).collect();
        keys.extend(ItemField::ALL.iter().filter_map(|f| f.erp_key()));
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
    }

    #[test]
    fn test_item_code_falls_back_to_name() {
        assert_eq!(RawItem::from_json(json!({"name": "SKU-9"})).item_code().as_deref(), Some("SKU-9"));
        assert_eq!(RawItem::from_json(json!([1, 2])).item_code(), None);
    }
}
