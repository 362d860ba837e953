//! CLI and web shell for invoice data capture.

mod commands;

use clap::{Parser, Subcommand};
use tracing::{Level, debug};
use tracing_subscriber::FmtSubscriber;

use commands::{config, extract, records, serve};

/// Invoice extraction - OCR an invoice, pull out its key fields, keep a spreadsheet
#[derive(Parser)]
#[command(name = "invex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the single-page web form
    Serve(serve::ServeArgs),

    /// Extract fields from one invoice in the terminal
    Extract(extract::ExtractArgs),

    /// Print the saved records
    Records(records::RecordsArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // GOOGLE_API_KEY usually lives in a local .env
    if let Ok(path) = dotenvy::dotenv() {
        debug!("Loaded environment from {}", path.display());
    }

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Serve(args) => serve::run(args, config_path).await,
        Commands::Extract(args) => extract::run(args, config_path).await,
        Commands::Records(args) => records::run(args, config_path),
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
