//! SalesDash - retail sales analytics reports
//!
//! A CLI tool that queries a read-only document store of sale records
//! and renders a fixed set of aggregate reports.
//!
//! Exit codes:
//!   0 - Success (including reports with nothing to display)
//!   1 - Runtime error (store unreachable, bad data, config failure, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod report;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::ValueEnum;
use cli::{Args, OutputFormat, ReportChoice};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Dashboard, DashboardMetadata, ReportKind, ReportResult};
use report::RenderOptions;
use std::path::Path;
use std::time::{Duration, Instant};
use store::{SalesStore, Store};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list {
        print_menu();
        return Ok(());
    }

    // Load configuration before logging so the config can raise verbosity
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(&args, &config);

    info!("SalesDash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_dashboard(&args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .salesdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to point at your sales export or store endpoint.");
    Ok(())
}

/// Handle --list: print the report menu.
fn print_menu() {
    println!("Available reports:\n");
    for choice in ReportChoice::value_variants() {
        let kind = ReportKind::from(*choice);
        let name = choice
            .to_possible_value()
            .map(|v| v.get_name().to_string())
            .unwrap_or_default();
        println!("  {:<16} {} ({} chart)", name, kind.title(), kind.chart());
    }
}

/// Initialize logging based on verbosity settings.
///
/// Logs go to stderr so rendered reports on stdout stay clean.
fn init_logging(args: &Args, config: &Config) {
    let level = if config.general.verbose && !args.quiet {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config {
        // An explicit path must load
        Some(ref config_path) => Config::load(config_path)?,
        None => Config::load_default()?.unwrap_or_default(),
    };
    config.merge_with_args(args);
    Ok(config)
}

/// Run the selected reports and write the output. Returns the exit code.
async fn run_dashboard(args: &Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let store = config.build_store()?;
    info!("Using sales store: {}", store.describe());

    let kinds = args.selected_reports();
    // JSON on stdout is usually piped, keep the terminal quiet
    let spinner = !args.quiet
        && !(config.report.format == OutputFormat::Json && config.general.output.is_none());

    let mut reports = Vec::with_capacity(kinds.len());
    for kind in kinds {
        let result = run_report(&store, kind, spinner).await?;
        if result.is_empty() {
            warn!("{}: nothing to display", kind.title());
        }
        reports.push(result);
    }

    let dashboard = Dashboard {
        metadata: DashboardMetadata {
            source: store.describe(),
            generated_at: Utc::now(),
            duration_seconds: start_time.elapsed().as_secs_f64(),
        },
        reports,
    };

    let options = RenderOptions {
        show_share: config.report.show_share,
    };

    let output = match config.report.format {
        OutputFormat::Text => report::generate_text_report(&dashboard, &options),
        OutputFormat::Markdown => report::generate_markdown_report(&dashboard, &options),
        OutputFormat::Json => report::generate_json_report(&dashboard)?,
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("Report saved to {}", path.display());
        }
        None => print!("{}", output),
    }

    debug!(
        "Completed {} report(s) in {:.2}s",
        dashboard.reports.len(),
        dashboard.metadata.duration_seconds
    );

    Ok(0)
}

/// Query, decode, and aggregate a single report.
async fn run_report(store: &Store, kind: ReportKind, show_spinner: bool) -> Result<ReportResult> {
    let pb = if show_spinner {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Querying {}...", kind.title()));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let loaded = store::load_records(store, kind).await;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let records =
        loaded.with_context(|| format!("Failed to load records for {}", kind.title()))?;

    let result = analysis::aggregate(kind, &records)
        .with_context(|| format!("Invalid sale data for {}", kind.title()))?;

    info!(
        "{}: {} rows from {} records",
        kind.title(),
        result.rows.len(),
        result.records
    );

    Ok(result)
}
