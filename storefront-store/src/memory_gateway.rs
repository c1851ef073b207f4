use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::Value;
use storefront_core::{Document, ErpGateway, Filter, FilterOp, GatewayError, GatewayResult, ResourceQuery};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory stand-in for the ERP resource API.
///
/// Mirrors the resource API closely enough for catalog and checkout flows:
/// `=`, `!=`, `like` and `in` filters (including `table.field` child-table
/// filters), field projection, ordering and pagination. Missing fields compare equal to `0` / `""`, as ERP column
/// defaults do.
pub struct InMemoryGateway {
    docs: RwLock<HashMap<String, Vec<Document>>>,
    next_name: AtomicU64,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            next_name: AtomicU64::new(1),
        }
    }

    /// Seeds a document. Non-object values are ignored.
    pub fn with_doc(mut self, doctype: &str, doc: Value) -> Self {
        if let Value::Object(mut doc) = doc {
            if !doc.contains_key("name") {
                let name = doc
                    .get("item_code")
                    .cloned()
                    .unwrap_or_else(|| Value::String(self.generate_name(doctype)));
                doc.insert("name".to_string(), name);
            }
            self.docs.get_mut().entry(doctype.to_string()).or_default().push(doc);
        }
        self
    }

    /// Snapshot of every stored document of a doctype.
    pub async fn docs(&self, doctype: &str) -> Vec<Document> {
        self.docs.read().await.get(doctype).cloned().unwrap_or_default()
    }

    fn generate_name(&self, doctype: &str) -> String {
        let prefix: Vec<String> = doctype
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|part| !part.is_empty())
            .map(|part| part.to_ascii_uppercase())
            .collect();
        let n = self.next_name.fetch_add(1, AtomicOrdering::SeqCst);
        format!("{}-{:05}", prefix.join("-"), n)
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ErpGateway for InMemoryGateway {
    async fn get_doc(&self, doctype: &str, name: &str) -> GatewayResult<Document> {
        let docs = self.docs.read().await;
        docs.get(doctype)
            .and_then(|docs| docs.iter().find(|doc| doc_name(doc) == Some(name)))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            })
    }

    async fn list_docs(&self, doctype: &str, query: &ResourceQuery) -> GatewayResult<Vec<Document>> {
        let docs = self.docs.read().await;
        let mut matched: Vec<&Document> = docs
            .get(doctype)
            .map(|docs| docs.iter().filter(|doc| matches_all(doc, &query.filters)).collect())
            .unwrap_or_default();

        if let Some(order_by) = &query.order_by {
            let mut parts = order_by.split_whitespace();
            let field = parts.next().unwrap_or_default();
            let descending = parts.next().is_some_and(|dir| dir.eq_ignore_ascii_case("desc"));
            matched.sort_by(|a, b| {
                let ord = compare(&scalar(a.get(field)), &scalar(b.get(field)));
                if descending { ord.reverse() } else { ord }
            });
        }

        let take = if query.limit_page_length == 0 { usize::MAX } else { query.limit_page_length };
        let page = matched
            .into_iter()
            .skip(query.limit_start)
            .take(take)
            .map(|doc| project(doc, &query.fields))
            .collect::<Vec<_>>();

        debug!("list {} -> {} docs", doctype, page.len());
        Ok(page)
    }

    async fn count_docs(&self, doctype: &str, filters: &[Filter]) -> GatewayResult<usize> {
        let docs = self.docs.read().await;
        Ok(docs
            .get(doctype)
            .map(|docs| docs.iter().filter(|doc| matches_all(doc, filters)).count())
            .unwrap_or(0))
    }

    async fn create_doc(&self, doctype: &str, mut payload: Document) -> GatewayResult<Document> {
        let mut docs = self.docs.write().await;
        let stored = docs.entry(doctype.to_string()).or_default();

        let name = match doc_name(&payload) {
            Some(name) => {
                if stored.iter().any(|doc| doc_name(doc) == Some(name)) {
                    return Err(GatewayError::Rejected {
                        status: 409,
                        message: format!("{} {} already exists", doctype, name),
                    });
                }
                name.to_string()
            }
            None => self.generate_name(doctype),
        };

        payload.insert("name".to_string(), Value::String(name));
        payload.insert("doctype".to_string(), Value::String(doctype.to_string()));
        stored.push(payload.clone());
        Ok(payload)
    }

    async fn update_doc(&self, doctype: &str, name: &str, payload: Document) -> GatewayResult<Document> {
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(doctype)
            .and_then(|docs| docs.iter_mut().find(|doc| doc_name(doc) == Some(name)))
            .ok_or_else(|| GatewayError::NotFound {
                doctype: doctype.to_string(),
                name: name.to_string(),
            })?;

        for (key, value) in payload {
            if key != "name" {
                doc.insert(key, value);
            }
        }
        Ok(doc.clone())
    }
}

fn doc_name(doc: &Document) -> Option<&str> {
    doc.get("name").and_then(Value::as_str)
}

fn project(doc: &Document, fields: &[String]) -> Document {
    if fields.is_empty() {
        return doc.clone();
    }
    fields
        .iter()
        .filter_map(|field| doc.get(field).map(|value| (field.clone(), value.clone())))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Scalar {
    Null,
    Num(f64),
    Text(String),
}

fn scalar(value: Option<&Value>) -> Scalar {
    match value {
        None | Some(Value::Null) => Scalar::Null,
        Some(Value::Bool(b)) => Scalar::Num(if *b { 1.0 } else { 0.0 }),
        Some(Value::Number(n)) => n.as_f64().map_or(Scalar::Null, Scalar::Num),
        Some(Value::String(s)) => Scalar::Text(s.clone()),
        Some(other) => Scalar::Text(other.to_string()),
    }
}

fn loosely_equal(a: &Scalar, b: &Scalar) -> bool {
    match (a, b) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Null, Scalar::Num(n)) | (Scalar::Num(n), Scalar::Null) => *n == 0.0,
        (Scalar::Null, Scalar::Text(s)) | (Scalar::Text(s), Scalar::Null) => s.is_empty(),
        (Scalar::Num(x), Scalar::Num(y)) => x == y,
        (Scalar::Num(n), Scalar::Text(s)) | (Scalar::Text(s), Scalar::Num(n)) => {
            s.trim().parse::<f64>().is_ok_and(|parsed| parsed == *n)
        }
        (Scalar::Text(x), Scalar::Text(y)) => x == y,
    }
}

fn compare(a: &Scalar, b: &Scalar) -> Ordering {
    match (a, b) {
        (Scalar::Num(x), Scalar::Num(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Scalar::Text(x), Scalar::Text(y)) => x.cmp(y),
        (Scalar::Null, Scalar::Null) => Ordering::Equal,
        (Scalar::Null, _) => Ordering::Less,
        (_, Scalar::Null) => Ordering::Greater,
        (Scalar::Num(_), Scalar::Text(_)) => Ordering::Less,
        (Scalar::Text(_), Scalar::Num(_)) => Ordering::Greater,
    }
}

/// SQL `LIKE` with `%` wildcards, case-insensitive.
fn like(text: &str, pattern: &str) -> bool {
    let text = text.to_lowercase();
    let pattern = pattern.to_lowercase();
    let segments: Vec<&str> = pattern.split('%').collect();

    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return text.is_empty(),
    };
    if !text.starts_with(first) {
        return false;
    }
    if rest.is_empty() {
        return text == *first;
    }

    let mut cursor = first.len();
    for (i, segment) in rest.iter().enumerate() {
        let is_last = i == rest.len() - 1;
        if is_last {
            return text.len() >= cursor + segment.len() && text[cursor..].ends_with(segment);
        }
        match text[cursor..].find(segment) {
            Some(pos) => cursor += pos + segment.len(),
            None => return false,
        }
    }
    true
}

/// `table.field` filters address child-table rows and match when any row does.
fn matches(doc: &Document, filter: &Filter) -> bool {
    match filter.field.split_once('.') {
        Some((table, field)) => doc
            .get(table)
            .and_then(Value::as_array)
            .is_some_and(|rows| {
                rows.iter()
                    .filter_map(Value::as_object)
                    .any(|row| matches_value(row.get(field), filter))
            }),
        None => matches_value(doc.get(&filter.field), filter),
    }
}

fn matches_value(value: Option<&Value>, filter: &Filter) -> bool {
    let actual = scalar(value);
    match filter.op {
        FilterOp::Eq => loosely_equal(&actual, &scalar(Some(&filter.value))),
        FilterOp::NotEq => !loosely_equal(&actual, &scalar(Some(&filter.value))),
        FilterOp::Like => match (&actual, filter.value.as_str()) {
            (Scalar::Text(text), Some(pattern)) => like(text, pattern),
            _ => false,
        },
        FilterOp::In => filter
            .value
            .as_array()
            .is_some_and(|values| values.iter().any(|v| loosely_equal(&actual, &scalar(Some(v))))),
    }
}

fn matches_all(doc: &Document, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| matches(doc, filter))
}
