use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub pricing: PricingSettings,
    pub site_control: SiteControlConfig,
    pub catalog: CatalogConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PricingSettings {
    /// Minutes east of UTC for the business timezone.
    pub business_utc_offset_minutes: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteControlConfig {
    pub settings_name: String,
    pub cache_ttl_seconds: u64,
    /// Seconds a stale copy is served after a failed refresh.
    pub retry_delay_seconds: u64,
}

impl SiteControlConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    pub default_page_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    pub max_qty_per_item: f64,
}

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

fn with_defaults() -> Result<Builder, config::ConfigError> {
    config::Config::builder()
        .set_default("pricing.business_utc_offset_minutes", 0_i64)?
        .set_default("site_control.settings_name", "E-Commerce Settings")?
        .set_default("site_control.cache_ttl_seconds", 60_i64)?
        .set_default("site_control.retry_delay_seconds", 5_i64)?
        .set_default("catalog.default_page_size", 100_i64)?
        .set_default("checkout.max_qty_per_item", 1000.0_f64)
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = with_defaults()?
            .add_source(config::File::with_name("config/default").required(false))
            // Per-environment overrides, e.g. config/production.toml
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. STOREFRONT__CATALOG__DEFAULT_PAGE_SIZE=50
            .add_source(config::Environment::with_prefix("STOREFRONT").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Defaults overlaid with an inline TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        with_defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
