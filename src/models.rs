use chrono::{SecondsFormat, Utc};
use serde::Serialize;

pub const SOURCE_TAG: &str = "carsensor.net";

/// A single used-car listing as it appears in the output report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub title: String,
    pub price_yen: Option<u64>,
    pub price_label: String,
    pub location: String,
    pub image_url: String,
    pub detail_url: String,
    pub source: String,
}

impl Listing {
    /// Minimal listing recovered from raw markup: a title and a detail link.
    pub fn from_link(title: String, detail_url: String) -> Self {
        Self {
            title,
            price_yen: None,
            price_label: String::new(),
            location: String::new(),
            image_url: String::new(),
            detail_url,
            source: SOURCE_TAG.to_string(),
        }
    }

    /// Key used to decide whether two listings describe the same car.
    pub fn natural_key(&self) -> String {
        if self.detail_url.is_empty() {
            format!("{}|{}|{}", self.title, self.price_label, self.location)
        } else {
            self.detail_url.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub model: String,
    pub color: String,
    pub feature: String,
    pub max_price: Option<i64>,
    pub region: Option<String>,
}

impl SearchQuery {
    pub fn new(max_price: Option<i64>, region: Option<String>) -> Self {
        Self {
            model: "Honda N-VAN".to_string(),
            color: "white".to_string(),
            feature: "turbo".to_string(),
            max_price,
            region,
        }
    }
}

/// Top-level document written once per run.
#[derive(Debug, Clone, Serialize)]
pub struct ListingsReport {
    pub generated_at: String,
    pub source: String,
    pub query: SearchQuery,
    pub error: Option<String>,
    pub count: usize,
    pub items: Vec<Listing>,
}

impl ListingsReport {
    pub fn new(
        source: &str,
        query: SearchQuery,
        items: Vec<Listing>,
        error: Option<String>,
    ) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            source: source.to_string(),
            query,
            error,
            count: items.len(),
            items,
        }
    }
}
