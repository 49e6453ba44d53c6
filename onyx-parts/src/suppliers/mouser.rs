use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::json;

use super::client::REQUEST_TIMEOUT;
use super::{check_request, PartLookup, PriceQuote, SecureClient, SupplierError, SupplierKind};
use crate::security::mask_sensitive_data;

pub const MOUSER_API_URL: &str = "https://api.mouser.com/api/v1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResponse {
    #[serde(default)]
    errors: Vec<ApiMessage>,
    search_results: Option<SearchResults>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SearchResults {
    #[serde(default)]
    parts: Vec<MouserPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MouserPart {
    mouser_part_number: Option<String>,
    availability: Option<String>,
    #[serde(default)]
    price_breaks: Vec<PriceBreak>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PriceBreak {
    quantity: i64,
    price: String,
}

/// Mouser part-number search client.
pub struct MouserClient {
    api_key: Option<String>,
    base_url: String,
    http: OnceCell<SecureClient>,
}

impl MouserClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: MOUSER_API_URL.to_string(),
            http: OnceCell::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// HTTP client, built on first use so a construction failure surfaces
    /// as a lookup error.
    fn http(&self) -> Result<&SecureClient, SupplierError> {
        self.http.get_or_try_init(|| SecureClient::new(REQUEST_TIMEOUT))
    }
}

#[async_trait]
impl PartLookup for MouserClient {
    fn kind(&self) -> SupplierKind {
        SupplierKind::Mouser
    }

    fn is_configured(&self) -> bool {
        super::manager::is_usable_key(self.api_key.as_deref())
    }

    async fn lookup(&self, part_number: &str) -> Result<Option<PriceQuote>, SupplierError> {
        check_request(self.kind(), self.api_key.as_deref(), part_number)?;
        let api_key = self.api_key.as_deref().unwrap_or_default();
        tracing::debug!(
            "Mouser lookup for {} (key {})",
            part_number,
            mask_sensitive_data(api_key, 4)
        );

        let url = format!("{}/search/partnumber", self.base_url);
        let body = json!({
            "SearchByPartRequest": {
                "mouserPartNumber": part_number,
                "partSearchOptions": "Exact",
            }
        });
        let response: serde_json::Value = self
            .http()?
            .post_json(&url, &[("apiKey", api_key)], &body)
            .await?;

        parse_search_response(&response)
    }
}

/// Map a Mouser search response to a quote for the first matching part.
pub fn parse_search_response(response: &serde_json::Value) -> Result<Option<PriceQuote>, SupplierError> {
    let parsed: SearchResponse = serde_json::from_value(response.clone())
        .map_err(|e| SupplierError::Parse(e.to_string()))?;

    if let Some(err) = parsed.errors.first() {
        return Err(SupplierError::Api {
            status: 200,
            message: err.message.clone(),
        });
    }

    let Some(part) = parsed.search_results.and_then(|r| r.parts.into_iter().next()) else {
        return Ok(None);
    };

    let unit_price = part
        .price_breaks
        .iter()
        .min_by_key(|b| b.quantity)
        .and_then(|b| parse_money(&b.price));
    let stock = part.availability.as_deref().and_then(parse_availability);

    Ok(Some(PriceQuote {
        supplier_part_number: part.mouser_part_number,
        unit_price,
        stock,
    }))
}

/// "$1,234.50" or "0,10 €" -> 1234.5 / 0.1
fn parse_money(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    let normalized = if digits.contains('.') {
        digits.replace(',', "")
    } else {
        digits.replace(',', ".")
    };
    normalized.parse().ok()
}

/// "5000 In Stock" -> 5000; "None" -> None
fn parse_availability(raw: &str) -> Option<i64> {
    let digits: String = raw
        .split_whitespace()
        .next()?
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
