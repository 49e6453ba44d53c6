use async_trait::async_trait;

use super::{check_request, PartLookup, PriceQuote, SupplierError, SupplierKind};
use crate::security::mask_sensitive_data;

pub const LCSC_API_URL: &str = "https://wmsc.lcsc.com/wmsc";

/// LCSC client. LCSC has no public pricing API, so after the shared
/// validation and key checks every part is reported as not listed.
pub struct LcscClient {
    api_key: Option<String>,
    base_url: String,
}

impl LcscClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: LCSC_API_URL.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PartLookup for LcscClient {
    fn kind(&self) -> SupplierKind {
        SupplierKind::Lcsc
    }

    fn is_configured(&self) -> bool {
        super::manager::is_usable_key(self.api_key.as_deref())
    }

    async fn lookup(&self, part_number: &str) -> Result<Option<PriceQuote>, SupplierError> {
        check_request(self.kind(), self.api_key.as_deref(), part_number)?;
        tracing::info!(
            "LCSC lookup for {} with key {}",
            part_number,
            mask_sensitive_data(self.api_key.as_deref().unwrap_or_default(), 4)
        );
        Ok(None)
    }
}
