//! Distributor price and stock lookups
//!
//! Each supported distributor implements [`PartLookup`]. The set of
//! distributors is closed ([`SupplierKind`]); [`SupplierManager`] owns one
//! client per kind plus the [`RateLimiter`] that throttles them.

pub mod client;
pub mod digikey;
pub mod lcsc;
pub mod manager;
pub mod mouser;
pub mod rate_limit;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use client::SecureClient;
pub use digikey::DigiKeyClient;
pub use lcsc::LcscClient;
pub use manager::{validate_api_keys, SupplierManager};
pub use mouser::MouserClient;
pub use rate_limit::RateLimiter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplierKind {
    DigiKey,
    Mouser,
    Lcsc,
}

impl SupplierKind {
    pub const ALL: [SupplierKind; 3] = [SupplierKind::DigiKey, SupplierKind::Mouser, SupplierKind::Lcsc];

    /// Name stored in the `supplier` column of quotes.
    pub fn name(&self) -> &'static str {
        match self {
            SupplierKind::DigiKey => "digikey",
            SupplierKind::Mouser => "mouser",
            SupplierKind::Lcsc => "lcsc",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            SupplierKind::DigiKey => "DIGIKEY_API_KEY",
            SupplierKind::Mouser => "MOUSER_API_KEY",
            SupplierKind::Lcsc => "LCSC_API_KEY",
        }
    }
}

impl fmt::Display for SupplierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SupplierKind {
    type Err = SupplierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "digikey" | "digi-key" => Ok(SupplierKind::DigiKey),
            "mouser" => Ok(SupplierKind::Mouser),
            "lcsc" => Ok(SupplierKind::Lcsc),
            other => Err(SupplierError::UnknownSupplier(other.to_string())),
        }
    }
}

/// A distributor's price and availability for one part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub supplier_part_number: Option<String>,
    pub unit_price: Option<f64>,
    pub stock: Option<i64>,
}

#[derive(Debug, Error)]
pub enum SupplierError {
    #[error("Invalid part number: {0}")]
    InvalidPartNumber(String),
    #[error("API key for {0} is not configured")]
    MissingApiKey(SupplierKind),
    #[error("Rate limited. Retry after {} seconds", .retry_after.as_secs_f64().ceil())]
    RateLimited { retry_after: Duration },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Only HTTPS URLs are allowed: {0}")]
    InsecureUrl(String),
    #[error("Unknown supplier: {0}")]
    UnknownSupplier(String),
}

/// Common contract for distributor clients.
///
/// `Ok(None)` means the distributor does not list the part.
#[async_trait]
pub trait PartLookup: Send + Sync {
    fn kind(&self) -> SupplierKind;

    /// Whether credentials are present.
    fn is_configured(&self) -> bool;

    async fn lookup(&self, part_number: &str) -> Result<Option<PriceQuote>, SupplierError>;
}

/// Shared guard run by every client before doing any work.
pub(crate) fn check_request(
    kind: SupplierKind,
    api_key: Option<&str>,
    part_number: &str,
) -> Result<(), SupplierError> {
    if !crate::security::validate_identifier(part_number) {
        tracing::error!("Invalid part number format for {}: {:?}", kind, part_number);
        return Err(SupplierError::InvalidPartNumber(part_number.to_string()));
    }
    if !manager::is_usable_key(api_key) {
        tracing::error!("{} API key not configured", kind);
        return Err(SupplierError::MissingApiKey(kind));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_kind_parse() {
        assert_eq!("Mouser".parse::<SupplierKind>().unwrap(), SupplierKind::Mouser);
        assert_eq!("digi-key".parse::<SupplierKind>().unwrap(), SupplierKind::DigiKey);
        assert_eq!(" LCSC ".parse::<SupplierKind>().unwrap(), SupplierKind::Lcsc);
        assert!(matches!(
            "arrow".parse::<SupplierKind>(),
            Err(SupplierError::UnknownSupplier(_))
        ));
    }

    #[test]
    fn test_check_request() {
        let key = Some("k3y-abcdefghijklmnopqrstuvwxyz");
        assert!(check_request(SupplierKind::Lcsc, key, "C14663").is_ok());
        assert!(matches!(
            check_request(SupplierKind::Lcsc, key, "DROP TABLE"),
            Err(SupplierError::InvalidPartNumber(_))
        ));
        assert!(matches!(
            check_request(SupplierKind::Lcsc, None, "C14663"),
            Err(SupplierError::MissingApiKey(SupplierKind::Lcsc))
        ));
        assert!(matches!(
            check_request(SupplierKind::Lcsc, Some("your_api_key_here_please_1234"), "C14663"),
            Err(SupplierError::MissingApiKey(_))
        ));
    }
}
