use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use property_etl::logging::{init_logging, DEFAULT_FILTER};
use property_etl::{run, EtlConfig, EtlError, RunSummary, VERSION};

#[derive(Debug, Parser)]
#[command(name = "property-etl")]
#[command(about = "Load a JSON file of property listings into the property database")]
#[command(version)]
struct Cli {
    /// JSON file to load (overrides PROPERTY_ETL_INPUT / config file)
    input: Option<PathBuf>,

    /// SQLite database file
    #[arg(long)]
    database: Option<PathBuf>,

    /// How long to wait for a locked database, in milliseconds
    #[arg(long)]
    busy_timeout_ms: Option<u64>,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_logging(DEFAULT_FILTER);
    let cli = Cli::parse();

    let mut config = EtlConfig::load()?;
    if let Some(input) = cli.input {
        config.input_path = Some(input);
    }
    if let Some(database) = cli.database {
        config.store.database_path = database;
    }
    if let Some(timeout) = cli.busy_timeout_ms {
        config.store.busy_timeout_ms = timeout;
    }
    let input = config.input_path()?.to_path_buf();

    println!("🏠 Property ETL v{VERSION}");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:    {}", input.display());
    println!("🗄️  Database: {}", config.store.database_path.display());

    match run(&input, &config) {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(err) => {
            eprintln!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            eprintln!("❌ ETL failed [{}]: {}", err.phase(), err);
            match err {
                EtlError::Load(_) => {
                    eprintln!("   Rolled back; nothing after the last flush was committed.")
                }
                EtlError::Connection { .. } | EtlError::Extract(_) => {
                    eprintln!("   Nothing was written to the database.")
                }
                EtlError::Schema(_) => {}
            }
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &RunSummary) {
    let load = &summary.load;

    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ All data loaded successfully (run {})", load.run.run_id);
    println!("✓ Source records:       {}", summary.normalize.records);
    println!("✓ Duplicates collapsed: {}", summary.normalize.duplicates_collapsed);
    if summary.normalize.records_without_address > 0 {
        println!("⚠️  Records without address: {}", summary.normalize.records_without_address);
    }
    if load.unresolved_records > 0 {
        println!("⚠️  Records with unresolved address: {}", load.unresolved_records);
    }

    for (table, counts) in [
        ("properties", load.properties),
        ("valuations", load.valuations),
        ("hoa", load.hoa),
        ("rehab", load.rehab),
    ] {
        println!(
            "✓ {:<11} inserted {:>6}, skipped {:>6}",
            table,
            counts.inserted,
            counts.skipped()
        );
    }

    if let Some(counts) = summary.counts {
        println!(
            "\n🔍 Database now holds {} properties, {} valuations, {} hoa, {} rehab rows",
            counts.properties, counts.valuations, counts.hoa, counts.rehab
        );
    }
}
