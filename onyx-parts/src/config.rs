//! Runtime configuration resolved from the environment.
//!
//! | Variable                | Default                                   |
//! |-------------------------|-------------------------------------------|
//! | `ONYX_PARTS_DATA_DIR`   | `<platform data dir>/OnyxIndustries/PartsManager` |
//! | `ONYX_PARTS_DB`         | `<data dir>/parts.db`                     |
//! | `ONYX_PARTS_DATASHEETS` | `<data dir>/datasheets`                   |
//! | `DIGIKEY_API_KEY`       | unset                                     |
//! | `MOUSER_API_KEY`        | unset                                     |
//! | `LCSC_API_KEY`          | unset                                     |
//!
//! A `.env` file in the working directory is loaded first when present.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::security::mask_sensitive_data;
use crate::suppliers::SupplierKind;

pub const DATA_DIR_ENV: &str = "ONYX_PARTS_DATA_DIR";
pub const DATABASE_ENV: &str = "ONYX_PARTS_DB";
pub const DATASHEETS_ENV: &str = "ONYX_PARTS_DATASHEETS";

const APP_DIR: &str = "OnyxIndustries/PartsManager";
const DATABASE_FILE: &str = "parts.db";
const DATASHEETS_DIR: &str = "datasheets";

/// Distributor credentials. `Debug` output is masked.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ApiKeys {
    pub digikey: Option<String>,
    pub mouser: Option<String>,
    pub lcsc: Option<String>,
}

impl ApiKeys {
    pub fn get(&self, kind: SupplierKind) -> Option<&str> {
        match kind {
            SupplierKind::DigiKey => self.digikey.as_deref(),
            SupplierKind::Mouser => self.mouser.as_deref(),
            SupplierKind::Lcsc => self.lcsc.as_deref(),
        }
    }

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let read = |kind: SupplierKind| {
            lookup(kind.api_key_env())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            digikey: read(SupplierKind::DigiKey),
            mouser: read(SupplierKind::Mouser),
            lcsc: read(SupplierKind::Lcsc),
        }
    }
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |key: &Option<String>| key.as_deref().map(|k| mask_sensitive_data(k, 4));
        f.debug_struct("ApiKeys")
            .field("digikey", &mask(&self.digikey))
            .field("mouser", &mask(&self.mouser))
            .field("lcsc", &mask(&self.lcsc))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub database_path: PathBuf,
    pub datasheet_dir: PathBuf,
    pub api_keys: ApiKeys,
}

impl Config {
    /// Resolve configuration from the process environment and `.env`.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let mut config = Self::with_data_dir(data_dir);
        if let Some(db) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            config.database_path = PathBuf::from(db);
        }
        if let Some(dir) = lookup(DATASHEETS_ENV).filter(|v| !v.trim().is_empty()) {
            config.datasheet_dir = PathBuf::from(dir);
        }
        config.api_keys = ApiKeys::from_lookup(&lookup);
        config
    }

    /// Everything under one directory, no API keys.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            database_path: data_dir.join(DATABASE_FILE),
            datasheet_dir: data_dir.join(DATASHEETS_DIR),
            data_dir,
            api_keys: ApiKeys::default(),
        }
    }

    pub fn with_api_keys(mut self, api_keys: ApiKeys) -> Self {
        self.api_keys = api_keys;
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_with_data_dir() {
        let config = Config::with_data_dir("/tmp/onyx");
        assert_eq!(config.database_path, PathBuf::from("/tmp/onyx/parts.db"));
        assert_eq!(config.datasheet_dir, PathBuf::from("/tmp/onyx/datasheets"));
        assert_eq!(config.api_keys, ApiKeys::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (DATA_DIR_ENV, "/srv/parts"),
            (DATABASE_ENV, "/srv/db/inventory.db"),
            ("MOUSER_API_KEY", "  m0user-abcdefghijklmnopqrstu  "),
            ("LCSC_API_KEY", ""),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/srv/parts"));
        assert_eq!(config.database_path, PathBuf::from("/srv/db/inventory.db"));
        assert_eq!(config.datasheet_dir, PathBuf::from("/srv/parts/datasheets"));
        assert_eq!(config.api_keys.get(SupplierKind::Mouser), Some("m0user-abcdefghijklmnopqrstu"));
        assert_eq!(config.api_keys.lcsc, None);
        assert_eq!(config.api_keys.digikey, None);
    }

    #[test]
    fn test_default_data_dir() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert!(config.data_dir.ends_with("PartsManager") || config.data_dir == PathBuf::from("data"));
    }

    #[test]
    fn test_debug_masks_keys() {
        let keys = ApiKeys {
            mouser: Some("m0user-abcdefghijklmnopqrstu".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", keys);
        assert!(!rendered.contains("abcdefghijklmnop"));
        assert!(rendered.contains("rstu"));
    }
}
