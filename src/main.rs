// ABOUTME: CLI entry point for sqlite-lake-loader
// ABOUTME: Parses commands, resolves settings and routes to the command handlers

use clap::{Parser, Subcommand};
use sqlite_lake_loader::commands;
use sqlite_lake_loader::config::{resolve_layers, ConfigLayer, MigrationSettings};
use sqlite_lake_loader::lake::parquet::ParquetCompression;

#[derive(Parser)]
#[command(name = "sqlite-lake-loader")]
#[command(about = "Migrate SQLite tables into Parquet on S3 with a Glue catalog", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy every source table into the lake and register it in the catalog
    Migrate {
        /// TOML file with source/bucket/database/region/compression
        #[arg(long)]
        config: Option<String>,
        /// Source connection string (default: sqlite:///Chinook.db)
        #[arg(long)]
        source: Option<String>,
        /// Destination: s3://bucket, bucket, or file:///local/dir
        #[arg(long)]
        bucket: Option<String>,
        /// Catalog database to load tables into (default: chinook)
        #[arg(long)]
        database: Option<String>,
        /// AWS region, overrides the default provider chain
        #[arg(long)]
        region: Option<String>,
        /// Parquet compression codec
        #[arg(long, value_enum)]
        compression: Option<ParquetCompression>,
    },
    /// List the source tables and their row counts
    Tables {
        /// TOML file, only `source` is used
        #[arg(long)]
        config: Option<String>,
        /// Source connection string (default: sqlite:///Chinook.db)
        #[arg(long)]
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate {
            config,
            source,
            bucket,
            database,
            region,
            compression,
        } => {
            let flags = ConfigLayer {
                source,
                bucket,
                database,
                region,
                compression,
            };
            let settings = MigrationSettings::from_layer(resolve_layers(config.as_deref(), flags)?)?;
            let loaded = commands::migrate(&settings).await?;
            for table in &loaded {
                println!(
                    "{}.{}\t{} rows\t{}",
                    table.database, table.table, table.rows, table.location
                );
            }
            Ok(())
        }
        Commands::Tables { config, source } => {
            let flags = ConfigLayer {
                source,
                ..Default::default()
            };
            let layer = resolve_layers(config.as_deref(), flags)?;
            for (table, rows) in commands::tables(&layer.source_or_default())? {
                println!("{}\t{}", table, rows);
            }
            Ok(())
        }
    }
}
