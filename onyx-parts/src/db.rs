//! SQLite persistence for components and supplier quotes.
//!
//! Every statement is static SQL with bound parameters. Optional search terms
//! are expressed as `?n IS NULL OR ...` so no query text is ever assembled
//! from caller input.

use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

use crate::security::{self, limits};
use crate::value::Category;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("component '{0}' already exists")]
    UniquenessViolation(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Type coercion error: {0}")]
    TypeCoercion(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Lock error: {0}")]
    Lock(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

/// One catalog entry as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub identifier: String,
    pub category: String,
    pub value: Option<String>,
    pub package_type: Option<String>,
    pub footprint_size: Option<String>,
    pub voltage_rating: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub datasheet_path: Option<String>,
    pub stock: i64,
    pub minimum_stock: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Component {
    pub fn category(&self) -> Category {
        Category::from(self.category.as_str())
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock < self.minimum_stock
    }
}

/// Raw, unvalidated component fields as entered by a user or read from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentInput {
    pub identifier: String,
    pub category: String,
    pub value: Option<String>,
    pub package_type: Option<String>,
    pub footprint_size: Option<String>,
    pub voltage_rating: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub manufacturer_part_number: Option<String>,
    pub datasheet_path: Option<String>,
    pub stock: i64,
    pub minimum_stock: i64,
}

/// A component that passed validation and is ready to insert.
///
/// Only obtainable through `TryFrom<ComponentInput>`, so holding one means the
/// identifier was accepted and every text field was sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewComponent {
    identifier: String,
    category: String,
    value: Option<String>,
    package_type: Option<String>,
    footprint_size: Option<String>,
    voltage_rating: Option<String>,
    description: Option<String>,
    manufacturer: Option<String>,
    manufacturer_part_number: Option<String>,
    datasheet_path: Option<String>,
    stock: i64,
    minimum_stock: i64,
}

impl TryFrom<ComponentInput> for NewComponent {
    type Error = DatabaseError;

    fn try_from(input: ComponentInput) -> Result<Self> {
        // Validate what the caller sent; sanitizing only trims what was accepted.
        let identifier = security::sanitize_text(&input.identifier, limits::IDENTIFIER);
        if !security::validate_identifier(&input.identifier) || identifier.is_empty() {
            return Err(DatabaseError::Validation(format!(
                "invalid component identifier: {:?}",
                input.identifier
            )));
        }

        let category = security::sanitize_text(&input.category, limits::CATEGORY);
        if category.is_empty() {
            return Err(DatabaseError::Validation(
                "component category is required".to_string(),
            ));
        }

        let stock = non_negative(input.stock, "stock")?;
        let minimum_stock = non_negative(input.minimum_stock, "minimum_stock")?;

        Ok(Self {
            identifier,
            category,
            value: security::sanitize_optional(input.value.as_deref(), limits::VALUE),
            package_type: security::sanitize_optional(input.package_type.as_deref(), limits::PACKAGE),
            footprint_size: security::sanitize_optional(
                input.footprint_size.as_deref(),
                limits::FOOTPRINT,
            ),
            voltage_rating: security::sanitize_optional(
                input.voltage_rating.as_deref(),
                limits::VOLTAGE,
            ),
            description: security::sanitize_optional(
                input.description.as_deref(),
                limits::DESCRIPTION,
            ),
            manufacturer: security::sanitize_optional(
                input.manufacturer.as_deref(),
                limits::MANUFACTURER,
            ),
            manufacturer_part_number: security::sanitize_optional(
                input.manufacturer_part_number.as_deref(),
                limits::MANUFACTURER_PART_NUMBER,
            ),
            datasheet_path: security::sanitize_optional(
                input.datasheet_path.as_deref(),
                limits::DATASHEET_PATH,
            ),
            stock,
            minimum_stock,
        })
    }
}

impl NewComponent {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn manufacturer_part_number(&self) -> Option<&str> {
        self.manufacturer_part_number.as_deref()
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn minimum_stock(&self) -> i64 {
        self.minimum_stock
    }
}

fn non_negative(value: i64, field: &str) -> Result<i64> {
    if value < 0 {
        return Err(DatabaseError::Validation(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    Ok(value)
}

/// Coerce a textual count (stock, minimum stock) into a non-negative integer.
pub fn parse_count(raw: &str, field: &str) -> Result<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let value = trimmed.parse::<i64>().or_else(|_| {
        // Spreadsheet exports often write whole numbers as "100.0".
        trimmed
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
            .ok_or_else(|| {
                DatabaseError::TypeCoercion(format!("{} is not an integer: {:?}", field, raw))
            })
    })?;
    non_negative(value, field)
}

/// Coerce a textual component id into the internal integer key.
pub fn parse_component_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| DatabaseError::TypeCoercion(format!("component id is not an integer: {:?}", raw)))
}

/// Coerce a textual price; blank means "no price".
pub fn parse_price(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite())
        .map(Some)
        .ok_or_else(|| DatabaseError::TypeCoercion(format!("price is not a number: {:?}", raw)))
}

/// Optional search terms; blank terms are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    pub identifier: Option<String>,
    pub category: Option<String>,
    pub value: Option<String>,
}

impl SearchFilter {
    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Bound parameters for the search statement: identifier pattern,
    /// category, value pattern.
    fn bindings(&self) -> (Option<String>, Option<String>, Option<String>) {
        let identifier = self
            .identifier
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| {
                // Validate the raw term; sanitizing only trims what was accepted.
                if security::validate_identifier(s) {
                    Some(like_pattern(&security::sanitize_text(s, limits::IDENTIFIER)))
                } else {
                    tracing::warn!("Ignoring invalid identifier filter: {:?}", s);
                    None
                }
            });

        let category = self
            .category
            .as_deref()
            .map(|s| security::sanitize_text(s, limits::CATEGORY))
            .filter(|s| !s.is_empty() && s != Category::ALL_FILTER);

        let value = self
            .value
            .as_deref()
            .map(|s| security::sanitize_text(s, limits::VALUE))
            .filter(|s| !s.is_empty())
            .map(|s| like_pattern(&s));

        (identifier, category, value)
    }
}

/// Substring LIKE pattern with the wildcards of the term itself escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Latest price/stock observation for a (component, supplier) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierQuote {
    pub id: i64,
    pub component_id: i64,
    pub supplier: String,
    pub supplier_part_number: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i64>,
    pub last_updated: String,
}

macro_rules! component_columns {
    () => {
        "id, identifier, category, value, package_type, footprint_size, voltage_rating, \
         description, manufacturer, manufacturer_part_number, datasheet_path, stock, \
         minimum_stock, created_at, updated_at"
    };
}

fn component_from_row(row: &Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        id: row.get(0)?,
        identifier: row.get(1)?,
        category: row.get(2)?,
        value: row.get(3)?,
        package_type: row.get(4)?,
        footprint_size: row.get(5)?,
        voltage_rating: row.get(6)?,
        description: row.get(7)?,
        manufacturer: row.get(8)?,
        manufacturer_part_number: row.get(9)?,
        datasheet_path: row.get(10)?,
        stock: row.get(11)?,
        minimum_stock: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

fn quote_from_row(row: &Row<'_>) -> rusqlite::Result<SupplierQuote> {
    Ok(SupplierQuote {
        id: row.get(0)?,
        component_id: row.get(1)?,
        supplier: row.get(2)?,
        supplier_part_number: row.get(3)?,
        price: row.get(4)?,
        stock: row.get(5)?,
        last_updated: row.get(6)?,
    })
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Database {
            conn: Mutex::new(conn),
        };
        db.initialize()?;
        Ok(db)
    }

    fn get_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DatabaseError::Lock(e.to_string()))
    }

    pub fn initialize(&self) -> Result<()> {
        let conn = self.get_conn()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS components (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                identifier TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL,
                value TEXT,
                package_type TEXT,
                footprint_size TEXT,
                voltage_rating TEXT,
                description TEXT,
                manufacturer TEXT,
                manufacturer_part_number TEXT,
                datasheet_path TEXT,
                stock INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
                minimum_stock INTEGER NOT NULL DEFAULT 0 CHECK (minimum_stock >= 0),
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS supplier_parts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                component_id INTEGER NOT NULL REFERENCES components(id),
                supplier TEXT NOT NULL,
                supplier_part_number TEXT,
                price REAL,
                stock INTEGER,
                last_updated TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(component_id, supplier)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_supplier_parts_component_id
             ON supplier_parts(component_id)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        Ok(())
    }

    // Component methods

    pub fn add_component(&self, component: &NewComponent) -> Result<i64> {
        if !security::validate_identifier(&component.identifier) {
            return Err(DatabaseError::Validation(format!(
                "invalid component identifier: {:?}",
                component.identifier
            )));
        }

        let conn = self.get_conn()?;
        let now = timestamp();
        let inserted = conn.execute(
            "INSERT INTO components (
                identifier, category, value, package_type, footprint_size, voltage_rating,
                description, manufacturer, manufacturer_part_number, datasheet_path,
                stock, minimum_stock, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                component.identifier,
                component.category,
                component.value,
                component.package_type,
                component.footprint_size,
                component.voltage_rating,
                component.description,
                component.manufacturer,
                component.manufacturer_part_number,
                component.datasheet_path,
                component.stock,
                component.minimum_stock,
                now,
            ],
        );

        match inserted {
            Ok(_) => {
                let id = conn.last_insert_rowid();
                tracing::info!("Added component {} (id {})", component.identifier, id);
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => Err(DatabaseError::UniquenessViolation(
                component.identifier.clone(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub fn search_components(&self, filter: &SearchFilter) -> Result<Vec<Component>> {
        let (identifier, category, value) = filter.bindings();

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(concat!(
            "SELECT ",
            component_columns!(),
            " FROM components
             WHERE (?1 IS NULL OR identifier LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR category = ?2)
               AND (?3 IS NULL OR value LIKE ?3 ESCAPE '\\')
             ORDER BY identifier ASC"
        ))?;

        let components = stmt
            .query_map(params![identifier, category, value], component_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(components)
    }

    pub fn find_component(&self, identifier: &str) -> Result<Option<Component>> {
        let conn = self.get_conn()?;
        let component = conn
            .query_row(
                concat!(
                    "SELECT ",
                    component_columns!(),
                    " FROM components WHERE identifier = ?1"
                ),
                params![identifier],
                component_from_row,
            )
            .optional()?;
        Ok(component)
    }

    pub fn get_component(&self, id: i64) -> Result<Option<Component>> {
        let conn = self.get_conn()?;
        let component = conn
            .query_row(
                concat!("SELECT ", component_columns!(), " FROM components WHERE id = ?1"),
                params![id],
                component_from_row,
            )
            .optional()?;
        Ok(component)
    }

    pub fn component_count(&self) -> Result<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM components", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn set_datasheet_path(&self, identifier: &str, path: &str) -> Result<()> {
        let path = security::sanitize_text(path, limits::DATASHEET_PATH);
        let conn = self.get_conn()?;
        let updated = conn.execute(
            "UPDATE components SET datasheet_path = ?1, updated_at = ?2 WHERE identifier = ?3",
            params![path, timestamp(), identifier],
        )?;
        if updated == 0 {
            return Err(DatabaseError::NotFound(format!("component '{}'", identifier)));
        }
        tracing::info!("Recorded datasheet for {}: {}", identifier, path);
        Ok(())
    }

    /// Apply a signed stock change and return the new on-hand count.
    pub fn adjust_stock(&self, identifier: &str, delta: i64) -> Result<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let current: i64 = tx
            .query_row(
                "SELECT stock FROM components WHERE identifier = ?1",
                params![identifier],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| DatabaseError::NotFound(format!("component '{}'", identifier)))?;

        let updated = current.checked_add(delta).filter(|s| *s >= 0).ok_or_else(|| {
            DatabaseError::InvalidValue(format!(
                "stock for '{}' cannot go from {} by {}",
                identifier, current, delta
            ))
        })?;

        tx.execute(
            "UPDATE components SET stock = ?1, updated_at = ?2 WHERE identifier = ?3",
            params![updated, timestamp(), identifier],
        )?;
        tx.commit()?;

        tracing::info!("Stock for {}: {} -> {}", identifier, current, updated);
        Ok(updated)
    }

    pub fn low_stock_components(&self) -> Result<Vec<Component>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(concat!(
            "SELECT ",
            component_columns!(),
            " FROM components WHERE stock < minimum_stock ORDER BY identifier ASC"
        ))?;
        let components = stmt
            .query_map([], component_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(components)
    }

    // Supplier quote methods

    /// Insert or replace the quote for `(component_id, supplier)`.
    pub fn upsert_supplier_quote(
        &self,
        component_id: i64,
        supplier: &str,
        supplier_part_number: Option<&str>,
        price: Option<f64>,
        stock: Option<i64>,
    ) -> Result<()> {
        let supplier = security::sanitize_text(supplier, limits::SUPPLIER);
        if supplier.is_empty() {
            return Err(DatabaseError::Validation("supplier name is required".to_string()));
        }
        let supplier_part_number =
            security::sanitize_optional(supplier_part_number, limits::SUPPLIER_PART_NUMBER);

        if let Some(p) = price {
            if !p.is_finite() {
                return Err(DatabaseError::TypeCoercion(format!("price is not a number: {}", p)));
            }
        }
        if let Some(s) = stock {
            if s < 0 {
                return Err(DatabaseError::InvalidValue(format!(
                    "supplier stock must be non-negative, got {}",
                    s
                )));
            }
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM components WHERE id = ?1",
                params![component_id],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(DatabaseError::NotFound(format!("component id {}", component_id)));
        }

        tx.execute(
            "INSERT OR REPLACE INTO supplier_parts (
                component_id, supplier, supplier_part_number, price, stock, last_updated
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![component_id, supplier, supplier_part_number, price, stock, timestamp()],
        )?;
        tx.commit()?;

        tracing::info!("Updated {} quote for component {}", supplier, component_id);
        Ok(())
    }

    /// Text-entry variant of [`Database::upsert_supplier_quote`]: the id,
    /// price and stock are coerced first and blank price/stock mean "unknown".
    pub fn upsert_supplier_quote_text(
        &self,
        component_id: &str,
        supplier: &str,
        supplier_part_number: Option<&str>,
        price: &str,
        stock: &str,
    ) -> Result<()> {
        let component_id = parse_component_id(component_id)?;
        let price = parse_price(price)?;
        let stock = if stock.trim().is_empty() {
            None
        } else {
            Some(parse_count(stock, "supplier stock")?)
        };
        self.upsert_supplier_quote(component_id, supplier, supplier_part_number, price, stock)
    }

    pub fn supplier_quotes(&self, component_id: i64) -> Result<Vec<SupplierQuote>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, component_id, supplier, supplier_part_number, price, stock, last_updated
             FROM supplier_parts
             WHERE component_id = ?1
             ORDER BY supplier ASC",
        )?;
        let quotes = stmt
            .query_map(params![component_id], quote_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(quotes)
    }

    // Settings methods

    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, timestamp()],
        )?;
        Ok(())
    }
}
