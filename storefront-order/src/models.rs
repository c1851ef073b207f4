use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use storefront_core::Document;
use storefront_shared::Masked;

/// ERP document type created at checkout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderType {
    /// Request for quotation; the merchant confirms prices later.
    Rfq,
    SalesOrder,
}

impl OrderType {
    pub fn doctype(&self) -> &'static str {
        match self {
            OrderType::Rfq => "E-Commerce RFQ",
            OrderType::SalesOrder => "Sales Order",
        }
    }

    /// Child table holding the order lines.
    pub fn item_table(&self) -> &'static str {
        match self {
            OrderType::Rfq => "item_table",
            OrderType::SalesOrder => "items",
        }
    }

    /// Maps the site-control default order type to a document type.
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim() {
            "E-Commerce RFQ" | "RFQ" => Some(OrderType::Rfq),
            "Sales Order" => Some(OrderType::SalesOrder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Address {
    pub address_line1: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Client-side cart entry. Only code and quantity are accepted; prices are
/// always resolved on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub item_code: String,
    pub qty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub customer_name: String,
    /// Individual, Company or Partnership.
    #[serde(default)]
    pub customer_type: Option<String>,
    pub phone: Masked<String>,
    pub email: Option<Masked<String>>,
    pub company_name: Option<String>,
    pub cr_no: Option<String>,
    pub vat_number: Option<String>,
    #[serde(default)]
    pub address: Address,
    pub cart: Vec<CartLine>,
    #[serde(default)]
    pub notes: String,
}

/// A cart line with its authoritative unit price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricedLine {
    pub item_code: String,
    pub item_name: String,
    pub uom: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
}

impl PricedLine {
    fn to_row(&self, order_type: OrderType, warehouse: Option<&str>, delivery_date: NaiveDate) -> Value {
        match order_type {
            OrderType::Rfq => json!({
                "item_code": self.item_code,
                "item_name": self.item_name,
                "quantity": self.quantity,
                "unit_pricex": self.unit_price,
                "uom": self.uom,
                "amount": self.amount,
            }),
            OrderType::SalesOrder => json!({
                "item_code": self.item_code,
                "item_name": self.item_name,
                "qty": self.quantity,
                "rate": self.unit_price,
                "uom": self.uom,
                "amount": self.amount,
                "delivery_date": delivery_date,
                "warehouse": warehouse,
            }),
        }
    }
}

/// Everything needed to create the ERP order document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    pub order_type: OrderType,
    pub customer_id: String,
    pub request: CheckoutRequest,
    pub lines: Vec<PricedLine>,
    pub total: f64,
    pub transaction_date: NaiveDate,
    pub source_warehouse: Option<String>,
}

impl OrderDraft {
    pub fn new(
        order_type: OrderType,
        customer_id: String,
        request: CheckoutRequest,
        lines: Vec<PricedLine>,
        transaction_date: NaiveDate,
        source_warehouse: Option<String>,
    ) -> Self {
        let total = lines.iter().map(|line| line.amount).sum();
        Self {
            order_type,
            customer_id,
            request,
            lines,
            total,
            transaction_date,
            source_warehouse,
        }
    }

    /// ERP document body. Null fields are dropped.
    pub fn to_payload(&self) -> Document {
        let request = &self.request;
        let warehouse = self.source_warehouse.as_deref();
        let rows: Vec<Value> = self
            .lines
            .iter()
            .map(|line| line.to_row(self.order_type, warehouse, self.transaction_date))
            .map(strip_nulls)
            .collect();

        let mut payload = json!({
            "doctype": self.order_type.doctype(),
            "customer": self.customer_id,
            "customer_name": request.customer_name,
            "email_id": request.email,
            "company_name": request.company_name,
            "phone_number": request.phone,
            "cr_no": request.cr_no,
            "vat_id": request.vat_number,
            "address_line1": request.address.address_line1,
            "postal_code": request.address.postal_code,
            "city": request.address.city,
            "country": request.address.country,
            "transaction_date": self.transaction_date,
            "notes": request.notes,
            "total_amount": self.total,
        });

        if self.order_type == OrderType::SalesOrder {
            payload["delivery_date"] = json!(self.transaction_date);
            payload["set_warehouse"] = json!(warehouse);
        }
        payload[self.order_type.item_table()] = Value::Array(rows);

        match strip_nulls(payload) {
            Value::Object(doc) => doc,
            _ => Document::new(),
        }
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
        other => other,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderReceipt {
    pub status: String,
    pub order_id: String,
    pub customer_id: String,
    pub order_type: OrderType,
    pub total: f64,
    pub created_at: NaiveDate,
}
