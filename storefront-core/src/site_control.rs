use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use storefront_shared::{to_flag, to_text};
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::gateway::{Document, ErpGateway, GatewayError};
use crate::SETTINGS_DOCTYPE;

pub const DEFAULT_ORDER_TYPE: &str = "E-Commerce RFQ";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);
/// How long a stale copy is served after a failed refresh before the ERP is
/// asked again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Storefront availability as configured in the ERP.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum StoreVisibility {
    #[default]
    Enable,
    Maintenance,
    Disable,
}

impl StoreVisibility {
    fn parse(value: Option<String>) -> Self {
        match value.as_deref() {
            Some("Maintenance") => StoreVisibility::Maintenance,
            Some("Disable") => StoreVisibility::Disable,
            _ => StoreVisibility::Enable,
        }
    }
}

/// Storefront-wide feature flags read from the ERP settings document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteSettings {
    pub store_visibility: StoreVisibility,
    pub website_integration: bool,
    pub item_sync: bool,
    pub customer_sync: bool,
    /// Global price switch. When off, every catalog price is hidden.
    pub price_visibility: bool,
    pub default_order_type: String,
    pub default_source_warehouse: Option<String>,
}

impl SiteSettings {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            store_visibility: StoreVisibility::parse(to_text(doc.get("e_store_visibility"))),
            website_integration: to_flag(doc.get("website_integration")),
            item_sync: to_flag(doc.get("enable_item_sync")),
            customer_sync: to_flag(doc.get("enable_customer_sync")),
            price_visibility: to_flag(doc.get("enable_price_visibility")),
            default_order_type: to_text(doc.get("default_order_type"))
                .unwrap_or_else(|| DEFAULT_ORDER_TYPE.to_string()),
            default_source_warehouse: to_text(doc.get("default_source_warehouse")),
        }
    }

    pub fn is_site_frozen(&self) -> bool {
        matches!(self.store_visibility, StoreVisibility::Maintenance | StoreVisibility::Disable)
    }
}

struct CachedSettings {
    settings: SiteSettings,
    refresh_at: Instant,
}

impl CachedSettings {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

fn deadline(after: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(after).unwrap_or(now)
}

/// Time-bounded cache over the ERP settings document.
pub struct SiteControl {
    gateway: Arc<dyn ErpGateway>,
    settings_name: String,
    ttl: Duration,
    retry_delay: Duration,
    cache: RwLock<Option<CachedSettings>>,
}

impl SiteControl {
    pub fn new(gateway: Arc<dyn ErpGateway>, settings_name: impl Into<String>, ttl: Duration) -> Self {
        Self {
            gateway,
            settings_name: settings_name.into(),
            ttl,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache: RwLock::new(None),
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Current settings, refreshed from the ERP once the TTL has elapsed.
    /// A failed refresh falls back to the stale copy when there is one, and
    /// the ERP is not retried until the retry delay has passed.
    pub async fn settings(&self) -> Result<SiteSettings, SiteControlError> {
        if let Some(cached) = self.cache.read().await.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.settings.clone());
        }

        let mut cache = self.cache.write().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.settings.clone());
        }

        match self.gateway.get_doc(SETTINGS_DOCTYPE, &self.settings_name).await {
            Ok(doc) => {
                let settings = SiteSettings::from_document(&doc);
                info!("Site settings refreshed from {}", self.settings_name);
                *cache = Some(CachedSettings {
                    settings: settings.clone(),
                    refresh_at: deadline(self.ttl),
                });
                Ok(settings)
            }
            Err(e) => match cache.as_mut() {
                Some(stale) => {
                    warn!(
                        "Site settings refresh failed, serving stale copy for {:?}: {}",
                        self.retry_delay, e
                    );
                    stale.refresh_at = deadline(self.retry_delay);
                    Ok(stale.settings.clone())
                }
                None => Err(SiteControlError::Unavailable(e)),
            },
        }
    }

    pub async fn is_site_frozen(&self) -> Result<bool, SiteControlError> {
        Ok(self.settings().await?.is_site_frozen())
    }

    pub async fn is_price_visibility_enabled(&self) -> Result<bool, SiteControlError> {
        Ok(self.settings().await?.price_visibility)
    }

    pub async fn default_order_type(&self) -> Result<String, SiteControlError> {
        Ok(self.settings().await?.default_order_type)
    }

    pub async fn default_source_warehouse(&self) -> Result<Option<String>, SiteControlError> {
        Ok(self.settings().await?.default_source_warehouse)
    }

    /// Forces the next read to go to the ERP.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SiteControlError {
    #[error("Site settings unavailable: {0}")]
    Unavailable(#[from] GatewayError),
}
