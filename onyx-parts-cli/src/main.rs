//! Onyx Parts CLI - manage the electronics parts inventory from the command line.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use onyx_parts::db::parse_count;
use onyx_parts::{
    Category, Component, ComponentInput, Config, ImportReport, Inventory, NewComponent,
    NormalizedValue, QuoteRefresh, RefreshStatus, SearchFilter, SupplierQuote,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "onyx-parts")]
#[command(about = "Electronics parts inventory: catalog, datasheets and supplier quotes", long_about = None)]
#[command(version)]
struct Cli {
    /// Directory holding the database and datasheets (overrides ONYX_PARTS_DATA_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "human")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a component to the catalog
    Add {
        /// Company part number, e.g. ONX-CAP-001
        #[arg(value_name = "ID")]
        id: String,

        /// Component category (Resistor, Capacitor, IC, ...)
        #[arg(short, long)]
        category: String,

        /// Raw value, e.g. 100n or 4.7k
        #[arg(short, long)]
        value: Option<String>,

        #[arg(long)]
        package: Option<String>,

        #[arg(long)]
        footprint: Option<String>,

        #[arg(long)]
        voltage: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        manufacturer: Option<String>,

        /// Manufacturer part number
        #[arg(long)]
        mpn: Option<String>,

        /// Units on hand
        #[arg(long, default_value = "0")]
        stock: String,

        /// Reorder threshold
        #[arg(long, default_value = "0")]
        min_stock: String,
    },

    /// Search the catalog
    Search {
        /// Identifier substring
        #[arg(long)]
        id: Option<String>,

        /// Exact category ("All" for any)
        #[arg(short, long)]
        category: Option<String>,

        /// Value substring
        #[arg(short, long)]
        value: Option<String>,
    },

    /// Show one component with its stored quotes
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Attach a PDF datasheet to a component
    Attach {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(value_name = "PDF")]
        pdf: PathBuf,
    },

    /// Change stock by a signed amount
    Stock {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(value_name = "DELTA", allow_negative_numbers = true)]
        delta: i64,
    },

    /// List components below their minimum stock
    LowStock,

    /// Show supplier quotes for a component
    Quotes {
        #[arg(value_name = "ID")]
        id: String,

        /// Query suppliers before listing
        #[arg(long)]
        refresh: bool,
    },

    /// Record a supplier quote by hand
    Quote {
        #[arg(value_name = "ID")]
        id: String,

        /// Supplier name, e.g. mouser or a local distributor
        #[arg(value_name = "SUPPLIER")]
        supplier: String,

        /// Unit price (blank for unknown)
        #[arg(long, default_value = "")]
        price: String,

        /// Supplier stock (blank for unknown)
        #[arg(long, default_value = "")]
        stock: String,

        /// Supplier's own part number
        #[arg(long)]
        spn: Option<String>,
    },

    /// Import a master parts list from CSV
    Import {
        #[arg(value_name = "CSV")]
        csv: PathBuf,
    },

    /// Report which supplier API keys are usable
    Keys,

    /// Normalize a raw value without touching the catalog
    Normalize {
        #[arg(value_name = "VALUE")]
        value: String,

        #[arg(short, long)]
        category: String,
    },

    /// List known categories and their units
    Categories,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(data_dir: Option<&Path>) -> Config {
    let config = Config::from_env();
    match data_dir {
        Some(dir) => Config::with_data_dir(dir).with_api_keys(config.api_keys),
        None => config,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;

    // Commands that never touch the catalog.
    match &cli.command {
        Commands::Normalize { value, category } => {
            handle_normalize(value, category, format)?;
            return Ok(());
        }
        Commands::Categories => {
            handle_categories(format)?;
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(cli.data_dir.as_deref());
    let mut inventory = Inventory::open(&config)?;

    match cli.command {
        Commands::Add {
            id,
            category,
            value,
            package,
            footprint,
            voltage,
            description,
            manufacturer,
            mpn,
            stock,
            min_stock,
        } => {
            let input = ComponentInput {
                identifier: id,
                category,
                value,
                package_type: package,
                footprint_size: footprint,
                voltage_rating: voltage,
                description,
                manufacturer,
                manufacturer_part_number: mpn,
                datasheet_path: None,
                stock: parse_count(&stock, "stock")?,
                minimum_stock: parse_count(&min_stock, "minimum_stock")?,
            };
            handle_add(&inventory, input, format)
        }
        Commands::Search {
            id,
            category,
            value,
        } => {
            let filter = SearchFilter {
                identifier: id,
                category,
                value,
            };
            let components = inventory.search(&filter)?;
            output_components(&components, format)
        }
        Commands::Show { id } => handle_show(&inventory, &id, format),
        Commands::Attach { id, pdf } => {
            let stored = inventory.attach_datasheet(&id, &pdf)?;
            match format {
                OutputFormat::Human => println!("Stored datasheet for {}: {}", id, stored.display()),
                OutputFormat::Json => print_json(&serde_json::json!({
                    "identifier": id,
                    "datasheet_path": stored.display().to_string(),
                }))?,
            }
            Ok(())
        }
        Commands::Stock { id, delta } => {
            let stock = inventory.adjust_stock(&id, delta)?;
            match format {
                OutputFormat::Human => println!("{}: {} in stock", id, stock),
                OutputFormat::Json => {
                    print_json(&serde_json::json!({ "identifier": id, "stock": stock }))?
                }
            }
            Ok(())
        }
        Commands::LowStock => {
            let components = inventory.low_stock()?;
            output_components(&components, format)
        }
        Commands::Quotes { id, refresh } => handle_quotes(&mut inventory, &id, refresh, format),
        Commands::Quote {
            id,
            supplier,
            price,
            stock,
            spn,
        } => {
            inventory.record_quote(&id, &supplier, spn.as_deref(), &price, &stock)?;
            let quotes = inventory.quotes(&id)?;
            match format {
                OutputFormat::Human => output_quote_lines(&quotes),
                OutputFormat::Json => print_json(&quotes)?,
            }
            Ok(())
        }
        Commands::Import { csv } => {
            let report = inventory.import_csv_file(&csv)?;
            output_import(&report, format)
        }
        Commands::Keys => {
            let status = inventory.api_key_status();
            match format {
                OutputFormat::Human => {
                    for (supplier, usable) in &status {
                        let label = if *usable { "configured" } else { "missing" };
                        println!("{:<8} {:<10} ({})", supplier, label, supplier.api_key_env());
                    }
                }
                OutputFormat::Json => print_json(&status)?,
            }
            Ok(())
        }
        Commands::Normalize { .. } | Commands::Categories => Ok(()),
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_add(inventory: &Inventory, input: ComponentInput, format: OutputFormat) -> anyhow::Result<()> {
    let component = NewComponent::try_from(input)?;
    let identifier = component.identifier().to_string();
    let id = inventory.add_component(component)?;
    match format {
        OutputFormat::Human => println!("Added {} (id {})", identifier, id),
        OutputFormat::Json => print_json(&serde_json::json!({ "id": id, "identifier": identifier }))?,
    }
    Ok(())
}

fn handle_show(inventory: &Inventory, identifier: &str, format: OutputFormat) -> anyhow::Result<()> {
    let component = inventory.component(identifier)?;
    let quotes = inventory.quotes(identifier)?;
    let normalized = Inventory::render_value(&component);

    match format {
        OutputFormat::Human => {
            println!("{}", component.identifier);
            println!("{}", "─".repeat(40));
            println!("  Category:     {}", component.category);
            println!(
                "  Value:        {} ({})",
                component.value.as_deref().unwrap_or("-"),
                display_normalized(&normalized)
            );
            let optional = [
                ("Package", &component.package_type),
                ("Footprint", &component.footprint_size),
                ("Voltage", &component.voltage_rating),
                ("Description", &component.description),
                ("Manufacturer", &component.manufacturer),
                ("MPN", &component.manufacturer_part_number),
                ("Datasheet", &component.datasheet_path),
            ];
            for (label, value) in optional {
                if let Some(value) = value {
                    println!("  {:<13} {}", format!("{}:", label), value);
                }
            }
            println!(
                "  Stock:        {} (min {}){}",
                component.stock,
                component.minimum_stock,
                if component.is_low_stock() { "  LOW" } else { "" }
            );
            if !quotes.is_empty() {
                println!("\n  Quotes:");
                output_quote_lines(&quotes);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "component": component,
            "normalized_value": normalized,
            "quotes": quotes,
        }))?,
    }
    Ok(())
}

fn handle_quotes(
    inventory: &mut Inventory,
    identifier: &str,
    refresh: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let refreshed: Vec<QuoteRefresh> = if refresh {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("starting async runtime")?;
        runtime.block_on(inventory.refresh_quotes(identifier))?
    } else {
        Vec::new()
    };
    let quotes = inventory.quotes(identifier)?;

    match format {
        OutputFormat::Human => {
            for r in &refreshed {
                match &r.status {
                    RefreshStatus::Updated { .. } => println!("{:<8} updated", r.supplier),
                    RefreshStatus::NotListed => println!("{:<8} not listed", r.supplier),
                    RefreshStatus::Failed { error } => println!("{:<8} failed: {}", r.supplier, error),
                }
            }
            if quotes.is_empty() {
                println!("No quotes stored for {}", identifier);
            } else {
                output_quote_lines(&quotes);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "refreshed": refreshed,
            "quotes": quotes,
        }))?,
    }
    Ok(())
}

fn handle_normalize(value: &str, category: &str, format: OutputFormat) -> anyhow::Result<()> {
    let normalized = NormalizedValue::new(value, category);
    match format {
        OutputFormat::Human => println!("{}", display_normalized(&normalized)),
        OutputFormat::Json => print_json(&normalized)?,
    }
    Ok(())
}

fn handle_categories(format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            for category in Category::KNOWN.iter() {
                let units = category.unit_choices();
                if units.is_empty() {
                    println!("{}", category);
                } else {
                    println!("{:<20} {}", category.as_str(), units.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let categories: Vec<_> = Category::KNOWN
                .iter()
                .map(|c| serde_json::json!({ "name": c.as_str(), "units": c.unit_choices() }))
                .collect();
            print_json(&categories)?;
        }
    }
    Ok(())
}

fn display_normalized(value: &NormalizedValue) -> String {
    if value.is_normalized() {
        value.to_string()
    } else {
        "unparsed".to_string()
    }
}

fn output_components(components: &[Component], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            if components.is_empty() {
                println!("No components found");
                return Ok(());
            }
            println!(
                "{:<16} {:<20} {:<12} {:>8} {:>8}",
                "ID", "Category", "Value", "Stock", "Min"
            );
            println!("{}", "─".repeat(68));
            for c in components {
                let normalized = Inventory::render_value(c);
                let value = if normalized.is_normalized() {
                    normalized.to_string()
                } else {
                    c.value.clone().unwrap_or_default()
                };
                println!(
                    "{:<16} {:<20} {:<12} {:>8} {:>8}",
                    c.identifier, c.category, value, c.stock, c.minimum_stock
                );
            }
        }
        OutputFormat::Json => print_json(components)?,
    }
    Ok(())
}

fn output_quote_lines(quotes: &[SupplierQuote]) {
    for q in quotes {
        let price = q
            .price
            .map(|p| format!("{:.4}", p))
            .unwrap_or_else(|| "-".to_string());
        let stock = q
            .stock
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "    {:<8} {:<24} price {:>10}  stock {:>8}  ({})",
            q.supplier,
            q.supplier_part_number.as_deref().unwrap_or("-"),
            price,
            stock,
            q.last_updated
        );
    }
}

fn output_import(report: &ImportReport, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Human => {
            println!("Imported {} components", report.imported);
            if !report.failures.is_empty() {
                println!("Skipped {} rows:", report.failures.len());
                for (line, message) in &report.failures {
                    println!("  line {}: {}", line, message);
                }
            }
        }
        OutputFormat::Json => print_json(report)?,
    }
    Ok(())
}
