use anyhow::{anyhow, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eodata_fetch::copernicus::Provider;
use eodata_fetch::download::download_all;
use eodata_fetch::naming::RegexNaming;
use eodata_fetch::selection::{selection_toml, Selection};
use eodata_fetch::table::MetadataTable;

const PREVIEW_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "eodata-fetch")]
#[command(about = "Search the Copernicus catalogue and download matching products")]
struct Cli {
    /// Log level, overridden by RUST_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the catalogue and print the matching products
    Search {
        #[arg(short, long)]
        selection: PathBuf,

        /// Save the result table as JSON for a later `download --table`
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Download products from the object store
    Download(DownloadArgs),
    /// Write a sample selection file
    Template {
        #[arg(short, long, default_value = "selection.toml")]
        output: PathBuf,
    },
}

#[derive(Args, Debug)]
struct DownloadArgs {
    /// Selection file; runs a fresh catalogue search
    #[arg(short, long, required_unless_present = "table", conflicts_with = "table")]
    selection: Option<PathBuf>,

    /// Table saved by `search --output`
    #[arg(short, long)]
    table: Option<PathBuf>,

    #[arg(long)]
    start_row: Option<usize>,

    #[arg(long)]
    target_dir: Option<PathBuf>,

    #[arg(long)]
    bucket: Option<String>,

    /// Regex for the per-product directory name
    #[arg(long)]
    image_pattern: Option<String>,

    #[arg(long, env = "EODATA_ACCESS_KEY_ID", hide_env_values = true)]
    access_key: Option<String>,

    #[arg(long, env = "EODATA_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// AWS profile used when no access keys are given
    #[arg(long, default_value = "copernicus")]
    profile: String,
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().try_init().map_err(|e| anyhow!(e))?;
    } else {
        builder.try_init().map_err(|e| anyhow!(e))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs)?;

    match cli.command {
        Command::Search { selection, output } => search(selection, output).await,
        Command::Download(args) => download(args).await,
        Command::Template { output } => {
            Selection::from_template(&selection_toml())?.write(&output)?;
            info!(path = %output.display(), "Selection template written");
            Ok(())
        }
    }
}

async fn search(selection: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let selection = Selection::read(selection)?;
    let table = selection.search.fetch().await?;
    println!("{}", table.head(PREVIEW_ROWS));

    if let Some(output) = output {
        table.write(&output)?;
        info!(path = %output.display(), rows = table.len(), "Table written");
    }
    Ok(())
}

async fn download(args: DownloadArgs) -> Result<()> {
    let (table, settings) = match (&args.selection, &args.table) {
        (Some(selection), _) => {
            let selection = Selection::read(selection)?;
            let table = selection.search.fetch().await?;
            println!("{}", table.head(PREVIEW_ROWS));
            (table, selection.download)
        }
        (None, Some(table)) => (MetadataTable::read(table)?, Default::default()),
        (None, None) => return Err(anyhow!("Either --selection or --table is required")),
    };

    let bucket = args.bucket.unwrap_or(settings.bucket);
    let start_row = args.start_row.unwrap_or(settings.start_row);
    let target = args.target_dir.unwrap_or(settings.target_directory);
    let naming = match args.image_pattern.or(settings.image_pattern) {
        Some(pattern) => RegexNaming::new(&pattern)?,
        None => RegexNaming::sentinel2(),
    };

    let provider = match (args.access_key, args.secret_key) {
        (Some(access_key), Some(secret_key)) => Provider::from_keys(&access_key, &secret_key).await,
        _ => {
            info!(profile = %args.profile, "No access keys given, using AWS profile");
            Provider::from_profile(&args.profile).await
        }
    };

    let summary = download_all(&provider, &bucket, &table, start_row, &target, &naming).await;
    if summary.failed.is_empty() {
        info!(rows = summary.attempted, "All products downloaded");
    } else {
        warn!(
            rows = summary.attempted,
            failed = summary.failed.len(),
            "Finished with failed rows"
        );
    }
    Ok(())
}
