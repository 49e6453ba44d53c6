use std::collections::BTreeMap;

use super::{
    DigiKeyClient, LcscClient, MouserClient, PartLookup, PriceQuote, RateLimiter, SupplierError,
    SupplierKind,
};
use crate::config::ApiKeys;

const MIN_KEY_LENGTH: usize = 20;
const PLACEHOLDER_MARKERS: &[&str] = &["your_", "placeholder", "api_key_here"];

/// A key is usable when present, long enough, and not a template value.
pub(crate) fn is_usable_key(api_key: Option<&str>) -> bool {
    let Some(key) = api_key.map(str::trim) else {
        return false;
    };
    if key.is_empty() {
        return false;
    }
    let lower = key.to_lowercase();
    if PLACEHOLDER_MARKERS.iter().any(|m| lower.contains(m)) {
        return false;
    }
    key.chars().count() >= MIN_KEY_LENGTH
}

/// Which suppliers have a usable API key.
pub fn validate_api_keys(keys: &ApiKeys) -> BTreeMap<SupplierKind, bool> {
    SupplierKind::ALL
        .iter()
        .map(|kind| {
            let usable = is_usable_key(keys.get(*kind));
            if keys.get(*kind).is_some() && !usable {
                tracing::warn!("{} API key looks like a placeholder or is too short", kind);
            }
            (*kind, usable)
        })
        .collect()
}

/// Routes lookups to the distributor clients through a shared rate limiter.
pub struct SupplierManager {
    clients: Vec<Box<dyn PartLookup>>,
    limiter: RateLimiter,
}

impl SupplierManager {
    pub fn new(keys: &ApiKeys) -> Self {
        let clients: Vec<Box<dyn PartLookup>> = vec![
            Box::new(DigiKeyClient::new(keys.digikey.clone())),
            Box::new(MouserClient::new(keys.mouser.clone())),
            Box::new(LcscClient::new(keys.lcsc.clone())),
        ];
        Self::with_clients(clients)
    }

    pub fn with_clients(clients: Vec<Box<dyn PartLookup>>) -> Self {
        Self {
            clients,
            limiter: RateLimiter::default(),
        }
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn suppliers(&self) -> Vec<SupplierKind> {
        self.clients.iter().map(|c| c.kind()).collect()
    }

    pub fn configured(&self) -> Vec<SupplierKind> {
        self.clients
            .iter()
            .filter(|c| c.is_configured())
            .map(|c| c.kind())
            .collect()
    }

    /// Look a part up at one distributor, subject to its rate limit.
    pub async fn lookup(
        &mut self,
        kind: SupplierKind,
        part_number: &str,
    ) -> Result<Option<PriceQuote>, SupplierError> {
        let client = self
            .clients
            .iter()
            .find(|c| c.kind() == kind)
            .ok_or_else(|| SupplierError::UnknownSupplier(kind.to_string()))?;

        if !self.limiter.allow_request(kind) {
            return Err(SupplierError::RateLimited {
                retry_after: self.limiter.wait_time(kind),
            });
        }

        client.lookup(part_number).await
    }

    /// Query every distributor in turn; one failing does not stop the rest.
    pub async fn get_all_prices(
        &mut self,
        part_number: &str,
    ) -> Vec<(SupplierKind, Result<Option<PriceQuote>, SupplierError>)> {
        let mut results = Vec::with_capacity(self.clients.len());
        for kind in self.suppliers() {
            let result = self.lookup(kind, part_number).await;
            if let Err(e) = &result {
                tracing::warn!("{} lookup for {} failed: {}", kind, part_number, e);
            }
            results.push((kind, result));
        }
        results
    }
}
