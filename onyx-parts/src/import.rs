//! Bulk import of a master parts list exported as CSV.
//!
//! Only `Company P/N` and `Type` are required; other recognised columns are
//! optional and may appear in any order. Unknown columns are ignored.

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::io::Read;
use thiserror::Error;

use crate::db::{parse_count, ComponentInput, Database, DatabaseError, NewComponent};

pub const COL_IDENTIFIER: &str = "Company P/N";
pub const COL_CATEGORY: &str = "Type";
pub const COL_VALUE: &str = "Value";
pub const COL_PACKAGE: &str = "Package";
pub const COL_FOOTPRINT: &str = "Footprint";
pub const COL_VOLTAGE: &str = "Voltage";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_MANUFACTURER: &str = "Manufacturer";
pub const COL_MANUFACTURER_PN: &str = "Manufacturer P/N";
pub const COL_DATASHEET: &str = "Datasheet Path";
pub const COL_STOCK: &str = "Stock";
pub const COL_MINIMUM_STOCK: &str = "Minimum Stock";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
}

/// Outcome of an import: how many rows landed and which did not.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    /// `(line number, reason)` for every rejected row.
    pub failures: Vec<(u64, String)>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

struct Columns {
    identifier: usize,
    category: usize,
    value: Option<usize>,
    package: Option<usize>,
    footprint: Option<usize>,
    voltage: Option<usize>,
    description: Option<usize>,
    manufacturer: Option<usize>,
    manufacturer_pn: Option<usize>,
    datasheet: Option<usize>,
    stock: Option<usize>,
    minimum_stock: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, ImportError> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let require = |name: &'static str| find(name).ok_or(ImportError::MissingColumn(name));

        Ok(Self {
            identifier: require(COL_IDENTIFIER)?,
            category: require(COL_CATEGORY)?,
            value: find(COL_VALUE),
            package: find(COL_PACKAGE),
            footprint: find(COL_FOOTPRINT),
            voltage: find(COL_VOLTAGE),
            description: find(COL_DESCRIPTION),
            manufacturer: find(COL_MANUFACTURER),
            manufacturer_pn: find(COL_MANUFACTURER_PN),
            datasheet: find(COL_DATASHEET),
            stock: find(COL_STOCK),
            minimum_stock: find(COL_MINIMUM_STOCK),
        })
    }

    fn to_input(&self, record: &StringRecord) -> Result<ComponentInput, DatabaseError> {
        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let count = |idx: Option<usize>, field: &str| {
            parse_count(idx.and_then(|i| record.get(i)).unwrap_or_default(), field)
        };

        Ok(ComponentInput {
            identifier: record.get(self.identifier).unwrap_or_default().to_string(),
            category: record.get(self.category).unwrap_or_default().to_string(),
            value: text(self.value),
            package_type: text(self.package),
            footprint_size: text(self.footprint),
            voltage_rating: text(self.voltage),
            description: text(self.description),
            manufacturer: text(self.manufacturer),
            manufacturer_part_number: text(self.manufacturer_pn),
            datasheet_path: text(self.datasheet),
            stock: count(self.stock, "stock")?,
            minimum_stock: count(self.minimum_stock, "minimum_stock")?,
        })
    }
}

/// Import every row of `reader` into `db`.
///
/// A row that fails validation or collides with an existing identifier is
/// recorded in the report and skipped; a missing required header aborts.
pub fn import_csv<R: Read>(db: &Database, reader: R) -> Result<ImportReport, ImportError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut report = ImportReport::default();

    for (index, result) in rdr.records().enumerate() {
        // Header is line 1.
        let mut line = index as u64 + 2;
        let outcome = result.map_err(|e| e.to_string()).and_then(|record| {
            if let Some(pos) = record.position() {
                line = pos.line();
            }
            columns
                .to_input(&record)
                .and_then(NewComponent::try_from)
                .and_then(|component| db.add_component(&component))
                .map_err(|e| e.to_string())
        });

        match outcome {
            Ok(_) => report.imported += 1,
            Err(message) => {
                tracing::warn!("Skipping CSV line {}: {}", line, message);
                report.failures.push((line, message));
            }
        }
    }

    tracing::info!(
        "Imported {} components ({} rows skipped)",
        report.imported,
        report.failures.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SearchFilter;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_import_minimal_columns() {
        let db = setup();
        let csv = "Company P/N,Type\nONX-RES-001,Resistor\nONX-CAP-001,Capacitor\n";
        let report = import_csv(&db, csv.as_bytes()).unwrap();

        assert_eq!(report.imported, 2);
        assert!(report.is_clean());
        assert_eq!(db.component_count().unwrap(), 2);
    }

    #[test]
    fn test_import_full_row() {
        let db = setup();
        let csv = "\
Company P/N,Type,Value,Package,Footprint,Voltage,Description,Manufacturer,Manufacturer P/N,Datasheet Path,Stock,Minimum Stock
ONX-CAP-010, Capacitor ,100n,SMD,0603,50V,MLCC X7R,Yageo,CC0603KRX7R9BB104,,250,100.0
";
        let report = import_csv(&db, csv.as_bytes()).unwrap();
        assert_eq!(report.imported, 1);

        let row = db.find_component("ONX-CAP-010").unwrap().unwrap();
        assert_eq!(row.category, "Capacitor");
        assert_eq!(row.value.as_deref(), Some("100n"));
        assert_eq!(row.footprint_size.as_deref(), Some("0603"));
        assert_eq!(row.manufacturer_part_number.as_deref(), Some("CC0603KRX7R9BB104"));
        assert_eq!(row.datasheet_path, None);
        assert_eq!(row.stock, 250);
        assert_eq!(row.minimum_stock, 100);
    }

    #[test]
    fn test_bad_rows_are_reported_not_fatal() {
        let db = setup();
        let csv = "\
Company P/N,Type,Stock
ONX-RES-001,Resistor,10
; DROP TABLE components--,Resistor,1
ONX-RES-002,Resistor,many
ONX-RES-001,Resistor,5
ONX-RES-003,,1
ONX-RES-004,Resistor,-3
ONX-RES-005,Resistor,7
";
        let report = import_csv(&db, csv.as_bytes()).unwrap();

        assert_eq!(report.imported, 2);
        let lines: Vec<u64> = report.failures.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6, 7]);
        assert!(report.failures[2].1.contains("already exists"));

        let all = db.search_components(&SearchFilter::default()).unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.identifier.as_str()).collect();
        assert_eq!(ids, vec!["ONX-RES-001", "ONX-RES-005"]);
        assert_eq!(all[0].stock, 10);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let db = setup();
        let csv = "Part,Type\nONX-RES-001,Resistor\n";
        assert!(matches!(
            import_csv(&db, csv.as_bytes()),
            Err(ImportError::MissingColumn(COL_IDENTIFIER))
        ));
        assert_eq!(db.component_count().unwrap(), 0);
    }
}
