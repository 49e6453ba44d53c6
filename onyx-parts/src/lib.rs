//! Onyx Parts - electronic component inventory library
//!
//! Keeps a local SQLite catalog of components, files their PDF datasheets,
//! normalizes free-text values ("100n", "4.7µ", "10k") for display, and asks
//! distributors for current prices.
//!
//! # Quick Start
//!
//! ```no_run
//! use onyx_parts::{ComponentInput, Config, Inventory, NewComponent, SearchFilter};
//!
//! let inventory = Inventory::open(&Config::from_env()).unwrap();
//!
//! let part = NewComponent::try_from(ComponentInput {
//!     identifier: "ONX-CAP-001".to_string(),
//!     category: "Capacitor".to_string(),
//!     value: Some("100n".to_string()),
//!     ..Default::default()
//! })
//! .unwrap();
//! inventory.add_component(part).unwrap();
//!
//! for component in inventory.search(&SearchFilter::default().category("Capacitor")).unwrap() {
//!     println!("{}: {}", component.identifier, Inventory::render_value(&component));
//! }
//! ```
//!
//! # Features
//!
//! - **Catalog**: validated inserts, filtered search, stock tracking
//! - **Datasheets**: per-component PDF storage with replacement backups
//! - **Suppliers**: DigiKey, Mouser and LCSC lookups behind one rate limiter
//! - **Import**: bulk load from a CSV master parts list

pub mod config;
pub mod core;
pub mod datasheets;
pub mod db;
pub mod import;
pub mod security;
pub mod suppliers;
pub mod value;

// Re-export main types
pub use crate::config::{ApiKeys, Config};
pub use crate::core::{Inventory, PartsError, QuoteRefresh, RefreshStatus};
pub use datasheets::{DatasheetError, DatasheetStore};
pub use db::{
    Component, ComponentInput, Database, DatabaseError, NewComponent, SearchFilter, SupplierQuote,
};
pub use import::{import_csv, ImportError, ImportReport};
pub use suppliers::{PartLookup, PriceQuote, SupplierError, SupplierKind, SupplierManager};
pub use value::{normalize_value, Category, NormalizedValue};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Category, Component, ComponentInput, Config, Inventory, NewComponent, PartsError,
        SearchFilter,
    };
}
