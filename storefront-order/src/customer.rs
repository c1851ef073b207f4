use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::{Document, ErpGateway, Filter, GatewayError, ResourceQuery};
use storefront_shared::{to_text, Masked};
use tracing::{debug, info};

use crate::models::CheckoutRequest;

pub const CUSTOMER_DOCTYPE: &str = "Customer";
pub const CONTACT_DOCTYPE: &str = "Contact";

const VAT_FIELD: &str = "custom_vat_registration_number";
const DEFAULT_CUSTOMER_GROUP: &str = "Individual";
const DEFAULT_TERRITORY: &str = "All Territories";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CustomerType {
    #[default]
    Individual,
    Company,
    Partnership,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerType::Individual => "Individual",
            CustomerType::Company => "Company",
            CustomerType::Partnership => "Partnership",
        }
    }

    /// Case-insensitive; anything unrecognised is an individual.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("company") => CustomerType::Company,
            Some("partnership") => CustomerType::Partnership,
            _ => CustomerType::Individual,
        }
    }
}

/// Buyer details used to find or register the ERP customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_name: String,
    pub customer_type: Option<String>,
    pub vat_number: Option<String>,
    pub email: Option<Masked<String>>,
    pub phone: Option<Masked<String>>,
    pub customer_group: Option<String>,
    pub territory: Option<String>,
}

impl From<&CheckoutRequest> for CustomerProfile {
    fn from(request: &CheckoutRequest) -> Self {
        Self {
            customer_name: request.customer_name.clone(),
            customer_type: request.customer_type.clone(),
            vat_number: request.vat_number.clone(),
            email: request.email.clone(),
            phone: Some(request.phone.clone()),
            customer_group: None,
            territory: None,
        }
    }
}

/// Result of looking a customer up by phone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CustomerLookup {
    pub exists: bool,
    /// `None` when a contact matched but is not linked to a customer.
    pub customer_id: Option<String>,
}

/// Trims, drops inner spaces and uppercases a VAT registration number.
pub fn normalize_vat(vat: Option<&str>) -> Result<String, CustomerError> {
    let vat: String = vat
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if vat.is_empty() {
        return Err(CustomerError::Validation("VAT number is required".into()));
    }
    Ok(vat)
}

/// Finds or registers ERP customers. Customers are keyed by VAT number.
pub struct CustomerService {
    gateway: Arc<dyn ErpGateway>,
}

impl CustomerService {
    pub fn new(gateway: Arc<dyn ErpGateway>) -> Self {
        Self { gateway }
    }

    pub async fn find_by_vat(&self, vat_number: &str) -> Result<Option<String>, CustomerError> {
        let query = ResourceQuery::new()
            .filter(Filter::eq(VAT_FIELD, vat_number))
            .fields(["name"])
            .page(0, 1);
        let rows = self.gateway.list_docs(CUSTOMER_DOCTYPE, &query).await?;
        Ok(rows.first().and_then(|row| to_text(row.get("name"))))
    }

    /// Searches contact phone numbers and follows the contact's customer link.
    pub async fn find_by_phone(&self, phone: &str) -> Result<CustomerLookup, CustomerError> {
        let phone = phone.trim();
        if phone.is_empty() {
            return Err(CustomerError::Validation("Phone is required".into()));
        }

        let query = ResourceQuery::new()
            .filter(Filter::eq("phone_nos.phone", phone))
            .fields(["name", "links"]);
        let contacts = self.gateway.list_docs(CONTACT_DOCTYPE, &query).await?;

        let customer_id = contacts
            .iter()
            .filter_map(|contact| contact.get("links").and_then(Value::as_array))
            .flatten()
            .find(|link| link.get("link_doctype").and_then(Value::as_str) == Some(CUSTOMER_DOCTYPE))
            .and_then(|link| to_text(link.get("link_name")));

        Ok(CustomerLookup {
            exists: !contacts.is_empty(),
            customer_id,
        })
    }

    pub async fn create(&self, profile: &CustomerProfile) -> Result<String, CustomerError> {
        let vat_number = normalize_vat(profile.vat_number.as_deref())?;
        require_name(profile)?;
        self.insert(profile, vat_number).await
    }

    /// Returns the customer holding the profile's VAT number, refreshing its
    /// contact details, or registers a new one.
    pub async fn get_or_create(&self, profile: &CustomerProfile) -> Result<String, CustomerError> {
        let vat_number = normalize_vat(profile.vat_number.as_deref())?;
        require_name(profile)?;

        match self.find_by_vat(&vat_number).await? {
            Some(customer_id) => {
                self.update_contact(&customer_id, profile).await?;
                debug!("Reusing customer {} for VAT {}", customer_id, vat_number);
                Ok(customer_id)
            }
            None => self.insert(profile, vat_number).await,
        }
    }

    async fn update_contact(&self, customer_id: &str, profile: &CustomerProfile) -> Result<(), CustomerError> {
        let mut fields = Document::new();
        if let Some(email) = non_blank(&profile.email) {
            fields.insert("custom_email".into(), json!(email));
        }
        if let Some(phone) = non_blank(&profile.phone) {
            fields.insert("custom_phone_number".into(), json!(phone));
        }
        if fields.is_empty() {
            return Ok(());
        }
        self.gateway.update_doc(CUSTOMER_DOCTYPE, customer_id, fields).await?;
        Ok(())
    }

    async fn insert(&self, profile: &CustomerProfile, vat_number: String) -> Result<String, CustomerError> {
        let payload = json!({
            "doctype": CUSTOMER_DOCTYPE,
            "customer_name": profile.customer_name.trim(),
            "customer_type": CustomerType::parse(profile.customer_type.as_deref()).as_str(),
            "customer_group": profile.customer_group.as_deref().unwrap_or(DEFAULT_CUSTOMER_GROUP),
            "territory": profile.territory.as_deref().unwrap_or(DEFAULT_TERRITORY),
            VAT_FIELD: vat_number,
            "custom_email": non_blank(&profile.email),
            "custom_phone_number": non_blank(&profile.phone),
        });
        let Value::Object(payload) = payload else {
            return Err(CustomerError::CreationFailed);
        };

        let created = self.gateway.create_doc(CUSTOMER_DOCTYPE, payload).await?;
        let customer_id = to_text(created.get("name")).ok_or(CustomerError::CreationFailed)?;
        info!("Created customer {} for VAT {}", customer_id, vat_number);
        Ok(customer_id)
    }
}

fn require_name(profile: &CustomerProfile) -> Result<(), CustomerError> {
    if profile.customer_name.trim().is_empty() {
        return Err(CustomerError::Validation("Customer name is required".into()));
    }
    Ok(())
}

fn non_blank(value: &Option<Masked<String>>) -> Option<&str> {
    value
        .as_ref()
        .map(|v| v.expose().trim())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum CustomerError {
    #[error("{0}")]
    Validation(String),

    #[error("Customer creation failed")]
    CreationFailed,

    #[error("ERP request failed: {0}")]
    Gateway(#[from] GatewayError),
}
