//! Inventory facade shared by the CLI and any other front end.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::datasheets::{component_dir_name, DatasheetError, DatasheetStore};
use crate::db::{Component, Database, DatabaseError, NewComponent, SearchFilter, SupplierQuote};
use crate::import::{self, ImportError, ImportReport};
use crate::suppliers::{validate_api_keys, PriceQuote, SupplierError, SupplierKind, SupplierManager};
use crate::value::NormalizedValue;

#[derive(Debug, thiserror::Error)]
pub enum PartsError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("component '{0}' already exists")]
    UniquenessViolation(String),
    #[error("Type coercion error: {0}")]
    TypeCoercion(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Database error: {0}")]
    Database(DatabaseError),
    #[error("Datasheet error: {0}")]
    Datasheet(DatasheetError),
    #[error("Supplier error: {0}")]
    Supplier(#[from] SupplierError),
    #[error("Import error: {0}")]
    Import(ImportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl From<DatabaseError> for PartsError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::UniquenessViolation(id) => PartsError::UniquenessViolation(id),
            DatabaseError::Validation(msg) | DatabaseError::InvalidValue(msg) => {
                PartsError::Validation(msg)
            }
            DatabaseError::TypeCoercion(msg) => PartsError::TypeCoercion(msg),
            DatabaseError::NotFound(what) => PartsError::NotFound(what),
            other => PartsError::Database(other),
        }
    }
}

impl From<DatasheetError> for PartsError {
    fn from(e: DatasheetError) -> Self {
        match e {
            DatasheetError::Validation(msg) => PartsError::Validation(msg),
            DatasheetError::NotFound(path) => {
                PartsError::NotFound(format!("file {}", path.display()))
            }
            other @ DatasheetError::Storage { .. } => {
                tracing::error!("{}", other);
                PartsError::Storage(other.to_string())
            }
        }
    }
}

impl From<ImportError> for PartsError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::Io(io) => PartsError::Io(io),
            other => PartsError::Import(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, PartsError>;

/// What happened at one supplier during a quote refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshStatus {
    Updated { quote: PriceQuote },
    NotListed,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct QuoteRefresh {
    pub supplier: SupplierKind,
    #[serde(flatten)]
    pub status: RefreshStatus,
}

/// Owns the database, datasheet store and supplier clients for one data
/// directory.
pub struct Inventory {
    db: Database,
    datasheets: DatasheetStore,
    suppliers: SupplierManager,
    config: Config,
}

impl Inventory {
    pub fn open(config: &Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = Database::new(&config.database_path)?;
        let datasheets = DatasheetStore::new(&config.datasheet_dir)?;
        let suppliers = SupplierManager::new(&config.api_keys);

        tracing::info!("Opened inventory at {}", config.database_path.display());
        Ok(Self {
            db,
            datasheets,
            suppliers,
            config: config.clone(),
        })
    }

    /// Swap the supplier clients, e.g. for tests.
    pub fn with_suppliers(mut self, suppliers: SupplierManager) -> Self {
        self.suppliers = suppliers;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn datasheets(&self) -> &DatasheetStore {
        &self.datasheets
    }

    pub fn add_component(&self, component: NewComponent) -> Result<i64> {
        Ok(self.db.add_component(&component)?)
    }

    pub fn search(&self, filter: &SearchFilter) -> Result<Vec<Component>> {
        Ok(self.db.search_components(filter)?)
    }

    pub fn component(&self, identifier: &str) -> Result<Component> {
        self.db
            .find_component(identifier)?
            .ok_or_else(|| PartsError::NotFound(format!("component '{}'", identifier)))
    }

    pub fn attach_datasheet(&self, identifier: &str, source: &Path) -> Result<PathBuf> {
        let component = self.component(identifier)?;
        let dir_name = component_dir_name(&component.identifier)?;
        let stored = self.datasheets.store(&dir_name, source)?;
        self.db
            .set_datasheet_path(&component.identifier, &stored.to_string_lossy())?;
        Ok(stored)
    }

    /// Ask every supplier about the component and store what they return.
    pub async fn refresh_quotes(&mut self, identifier: &str) -> Result<Vec<QuoteRefresh>> {
        let component = self.component(identifier)?;
        let part_number = component
            .manufacturer_part_number
            .clone()
            .filter(|pn| !pn.trim().is_empty())
            .unwrap_or_else(|| component.identifier.clone());

        let mut refreshed = Vec::new();
        for (supplier, result) in self.suppliers.get_all_prices(&part_number).await {
            let status = match result {
                Ok(Some(quote)) => {
                    match self.db.upsert_supplier_quote(
                        component.id,
                        supplier.name(),
                        quote.supplier_part_number.as_deref(),
                        quote.unit_price,
                        quote.stock,
                    ) {
                        Ok(()) => RefreshStatus::Updated { quote },
                        Err(e) => RefreshStatus::Failed {
                            error: e.to_string(),
                        },
                    }
                }
                Ok(None) => RefreshStatus::NotListed,
                Err(e) => RefreshStatus::Failed {
                    error: e.to_string(),
                },
            };
            refreshed.push(QuoteRefresh { supplier, status });
        }
        Ok(refreshed)
    }

    /// Record a quote typed in by hand; `supplier` need not be a known
    /// distributor.
    pub fn record_quote(
        &self,
        identifier: &str,
        supplier: &str,
        supplier_part_number: Option<&str>,
        price: &str,
        stock: &str,
    ) -> Result<()> {
        let component = self.component(identifier)?;
        self.db.upsert_supplier_quote_text(
            &component.id.to_string(),
            supplier,
            supplier_part_number,
            price,
            stock,
        )?;
        Ok(())
    }

    pub fn quotes(&self, identifier: &str) -> Result<Vec<SupplierQuote>> {
        let component = self.component(identifier)?;
        Ok(self.db.supplier_quotes(component.id)?)
    }

    pub fn adjust_stock(&self, identifier: &str, delta: i64) -> Result<i64> {
        Ok(self.db.adjust_stock(identifier, delta)?)
    }

    pub fn low_stock(&self) -> Result<Vec<Component>> {
        Ok(self.db.low_stock_components()?)
    }

    pub fn import_csv<R: Read>(&self, reader: R) -> Result<ImportReport> {
        Ok(import::import_csv(&self.db, reader)?)
    }

    pub fn import_csv_file(&self, path: &Path) -> Result<ImportReport> {
        let file = fs::File::open(path)?;
        self.import_csv(file)
    }

    pub fn api_key_status(&self) -> BTreeMap<SupplierKind, bool> {
        validate_api_keys(&self.config.api_keys)
    }

    pub fn render_value(component: &Component) -> NormalizedValue {
        NormalizedValue::new(
            component.value.as_deref().unwrap_or_default(),
            &component.category,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ComponentInput;
    use crate::suppliers::PartLookup;
    use async_trait::async_trait;
    use tempfile::TempDir;

    fn setup() -> (Inventory, TempDir) {
        let temp = TempDir::new().unwrap();
        let inventory = Inventory::open(&Config::with_data_dir(temp.path().join("data"))).unwrap();
        (inventory, temp)
    }

    fn new_part(identifier: &str, category: &str, value: &str) -> NewComponent {
        NewComponent::try_from(ComponentInput {
            identifier: identifier.to_string(),
            category: category.to_string(),
            value: Some(value.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    struct StubSupplier {
        kind: SupplierKind,
        response: fn(&str) -> std::result::Result<Option<PriceQuote>, SupplierError>,
    }

    #[async_trait]
    impl PartLookup for StubSupplier {
        fn kind(&self) -> SupplierKind {
            self.kind
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn lookup(
            &self,
            part_number: &str,
        ) -> std::result::Result<Option<PriceQuote>, SupplierError> {
            (self.response)(part_number)
        }
    }

    #[test]
    fn test_duplicate_maps_to_uniqueness_violation() {
        let (inventory, _temp) = setup();
        inventory
            .add_component(new_part("ONX-RES-001", "Resistor", "10k"))
            .unwrap();
        let err = inventory
            .add_component(new_part("ONX-RES-001", "Resistor", "22k"))
            .unwrap_err();
        assert!(matches!(err, PartsError::UniquenessViolation(ref id) if id == "ONX-RES-001"));
        assert_eq!(err.to_string(), "component 'ONX-RES-001' already exists");
        assert_eq!(
            inventory.component("ONX-RES-001").unwrap().value.as_deref(),
            Some("10k")
        );
    }

    #[test]
    fn test_error_mapping() {
        let (inventory, _temp) = setup();
        assert!(matches!(
            inventory.component("ONX-NOPE-001"),
            Err(PartsError::NotFound(_))
        ));
        assert!(matches!(
            inventory.adjust_stock("ONX-NOPE-001", 1),
            Err(PartsError::NotFound(_))
        ));
        assert!(matches!(
            inventory.import_csv("Type\nResistor\n".as_bytes()),
            Err(PartsError::Import(ImportError::MissingColumn(_)))
        ));
    }

    #[test]
    fn test_attach_datasheet() {
        let (inventory, temp) = setup();
        inventory
            .add_component(new_part("ONX-IC-001", "IC", "LM358"))
            .unwrap();
        let pdf = temp.path().join("lm358.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();

        let stored = inventory.attach_datasheet("ONX-IC-001", &pdf).unwrap();
        assert!(stored.starts_with(inventory.datasheets().base_path()));
        let row = inventory.component("ONX-IC-001").unwrap();
        assert_eq!(row.datasheet_path, Some(stored.to_string_lossy().into_owned()));

        assert!(matches!(
            inventory.attach_datasheet("ONX-IC-404", &pdf),
            Err(PartsError::NotFound(_))
        ));
        let txt = temp.path().join("notes.txt");
        fs::write(&txt, b"x").unwrap();
        assert!(matches!(
            inventory.attach_datasheet("ONX-IC-001", &txt),
            Err(PartsError::Validation(_))
        ));
    }

    #[test]
    fn test_attach_datasheet_to_dotted_identifier() {
        let (inventory, temp) = setup();
        inventory
            .add_component(new_part("LM317.T", "IC", "LM317"))
            .unwrap();
        inventory
            .add_component(new_part("ABC 1", "IC", "ABC"))
            .unwrap();
        let pdf = temp.path().join("lm317.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();

        let stored = inventory.attach_datasheet("LM317.T", &pdf).unwrap();
        let base = inventory.datasheets().base_path();
        assert_eq!(stored, base.join("LM317_T").join("lm317.pdf"));
        assert_eq!(
            inventory.component("LM317.T").unwrap().datasheet_path,
            Some(stored.to_string_lossy().into_owned())
        );

        let stored = inventory.attach_datasheet("ABC 1", &pdf).unwrap();
        assert_eq!(stored, base.join("ABC_1").join("lm317.pdf"));
    }

    #[tokio::test]
    async fn test_refresh_quotes_stores_hits() {
        let (inventory, _temp) = setup();
        inventory
            .add_component(
                NewComponent::try_from(ComponentInput {
                    identifier: "ONX-RES-010".to_string(),
                    category: "Resistor".to_string(),
                    manufacturer_part_number: Some("RC0603FR-0710KL".to_string()),
                    ..Default::default()
                })
                .unwrap(),
            )
            .unwrap();

        let manager = SupplierManager::with_clients(vec![
            Box::new(StubSupplier {
                kind: SupplierKind::Mouser,
                response: |pn| {
                    assert_eq!(pn, "RC0603FR-0710KL");
                    Ok(Some(PriceQuote {
                        supplier_part_number: Some("603-RC0603FR-0710KL".to_string()),
                        unit_price: Some(0.1),
                        stock: Some(5000),
                    }))
                },
            }),
            Box::new(StubSupplier {
                kind: SupplierKind::Lcsc,
                response: |_| Ok(None),
            }),
            Box::new(StubSupplier {
                kind: SupplierKind::DigiKey,
                response: |pn| Err(SupplierError::InvalidPartNumber(pn.to_string())),
            }),
        ]);
        let mut inventory = inventory.with_suppliers(manager);

        let refreshed = inventory.refresh_quotes("ONX-RES-010").await.unwrap();
        assert_eq!(refreshed.len(), 3);
        assert!(matches!(refreshed[0].status, RefreshStatus::Updated { .. }));
        assert!(matches!(refreshed[1].status, RefreshStatus::NotListed));
        assert!(matches!(refreshed[2].status, RefreshStatus::Failed { .. }));

        let quotes = inventory.quotes("ONX-RES-010").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].supplier, "mouser");
        assert_eq!(quotes[0].price, Some(0.1));
        assert_eq!(quotes[0].stock, Some(5000));
    }

    #[test]
    fn test_record_quote() {
        let (inventory, _temp) = setup();
        inventory
            .add_component(new_part("ONX-LED-001", "LED", "Red"))
            .unwrap();
        inventory
            .record_quote("ONX-LED-001", "arrow", Some("ARW-1"), "0.12", "")
            .unwrap();

        let quotes = inventory.quotes("ONX-LED-001").unwrap();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].supplier, "arrow");
        assert_eq!(quotes[0].stock, None);
        assert!(matches!(
            inventory.record_quote("ONX-LED-001", "arrow", None, "free", ""),
            Err(PartsError::TypeCoercion(_))
        ));
        assert!(matches!(
            inventory.record_quote("ONX-LED-404", "arrow", None, "1", ""),
            Err(PartsError::NotFound(_))
        ));
    }

    #[test]
    fn test_render_value() {
        let (inventory, _temp) = setup();
        inventory
            .add_component(new_part("ONX-CAP-001", "Capacitor", "100n"))
            .unwrap();
        let row = inventory.component("ONX-CAP-001").unwrap();
        assert_eq!(Inventory::render_value(&row).to_string(), "100 nF");
    }
}
