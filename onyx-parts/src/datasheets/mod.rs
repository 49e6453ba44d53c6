//! Datasheet storage
//!
//! PDF datasheets are copied into a per-installation directory, one
//! subdirectory per component identifier (`.`, `/` and spaces become `_`,
//! see [`component_dir_name`]):
//!
//! ```text
//! <base>/
//! └── ONX-CAP-001/
//!     ├── GRM21BR71H104KA01.pdf
//!     └── backups/
//!         └── 20250101_120000_GRM21BR71H104KA01.pdf
//! ```
//!
//! A datasheet that gets replaced is first copied into `backups/` with a
//! timestamp prefix. The database only records the path `store` returns.
//!
//! # Usage
//!
//! ```rust,ignore
//! use onyx_parts::datasheets::DatasheetStore;
//!
//! let store = DatasheetStore::new("data/datasheets")?;
//! let stored = store.store("ONX-CAP-001", Path::new("~/Downloads/cap.pdf"))?;
//! db.set_datasheet_path("ONX-CAP-001", &stored.to_string_lossy())?;
//! ```

pub mod store;

pub use store::{component_dir_name, DatasheetError, DatasheetStore, BACKUP_DIR};
