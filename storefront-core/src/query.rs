use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Comparison operators understood by the resource API.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FilterOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
    #[serde(rename = "like")]
    Like,
    #[serde(rename = "in")]
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::NotEq => "!=",
            FilterOp::Like => "like",
            FilterOp::In => "in",
        }
    }
}

/// One `[field, op, value]` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op: FilterOp::Eq, value: value.into() }
    }

    pub fn not_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op: FilterOp::NotEq, value: value.into() }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self { field: field.into(), op: FilterOp::Like, value: Value::String(pattern.into()) }
    }

    pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self { field: field.into(), op: FilterOp::In, value: Value::Array(values) }
    }

    /// Wire form: `["field", "=", value]`.
    pub fn to_json(&self) -> Value {
        json!([self.field, self.op.as_str(), self.value])
    }
}

/// List request against a doctype.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceQuery {
    pub filters: Vec<Filter>,
    /// Empty means the gateway's default field set.
    pub fields: Vec<String>,
    /// e.g. `"modified desc"`.
    pub order_by: Option<String>,
    pub limit_start: usize,
    /// `0` returns every matching document.
    pub limit_page_length: usize,
}

impl ResourceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn order_by(mut self, order_by: impl Into<String>) -> Self {
        self.order_by = Some(order_by.into());
        self
    }

    pub fn page(mut self, limit_start: usize, limit_page_length: usize) -> Self {
        self.limit_start = limit_start;
        self.limit_page_length = limit_page_length;
        self
    }

    /// Query-string parameters for the resource API; filters and fields are
    /// JSON encoded.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let filters: Vec<Value> = self.filters.iter().map(Filter::to_json).collect();
        let mut params = vec![
            ("filters".to_string(), Value::Array(filters).to_string()),
        ];

        if !self.fields.is_empty() {
            params.push(("fields".to_string(), json!(self.fields).to_string()));
        }
        if let Some(order_by) = &self.order_by {
            params.push(("order_by".to_string(), order_by.clone()));
        }
        params.push(("limit_start".to_string(), self.limit_start.to_string()));
        params.push(("limit_page_length".to_string(), self.limit_page_length.to_string()));

        params
    }
}
