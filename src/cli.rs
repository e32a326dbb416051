//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::ReportKind;
use clap::Parser;
use std::path::PathBuf;

/// SalesDash - retail sales analytics from a read-only document store
///
/// Runs one of eight fixed aggregate reports over sale records and
/// prints it as a table, Markdown, or JSON.
///
/// Examples:
///   salesdash top-customers --data sales.json
///   salesdash monthly-trend --data sales.json --format markdown -o monthly.md
///   salesdash --all --url https://data.example.com/app/v1 --format json
///   salesdash --list
///   salesdash --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Report to run
    #[arg(
        value_name = "REPORT",
        required_unless_present_any = ["all", "list", "init_config"]
    )]
    pub report: Option<ReportChoice>,

    /// Run every report in menu order
    #[arg(long, conflicts_with = "report")]
    pub all: bool,

    /// List the available reports and exit
    #[arg(long)]
    pub list: bool,

    /// JSON export of the sales collection
    ///
    /// Either a JSON array of documents or one document per line.
    #[arg(short, long, value_name = "FILE", env = "SALESDASH_DATA")]
    pub data: Option<PathBuf>,

    /// Base URL of an HTTP document store find endpoint
    ///
    /// Selects the HTTP backend over --data; requests go to {URL}/action/find.
    #[arg(long, value_name = "URL", env = "SALESDASH_URL")]
    pub url: Option<String>,

    /// Database holding the sales collection
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Collection holding the sale records
    #[arg(long, value_name = "NAME")]
    pub collection: Option<String>,

    /// Store query timeout in seconds
    ///
    /// Defaults to the HTTP client's own timeout behaviour.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .salesdash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .salesdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Report selection, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportChoice {
    /// Top 10 customers by total spent
    TopCustomers,
    /// Top 10 products by quantity sold
    TopProducts,
    /// Best-selling products per branch
    BranchProducts,
    /// Top 20 branches by revenue
    TopBranches,
    /// Sales per calendar month
    MonthlyTrend,
    /// Sales per season
    SeasonalTrend,
    /// Best product in each season
    BestPerSeason,
    /// Most demanded products
    MostDemanded,
}

impl From<ReportChoice> for ReportKind {
    fn from(choice: ReportChoice) -> Self {
        match choice {
            ReportChoice::TopCustomers => ReportKind::TopCustomers,
            ReportChoice::TopProducts => ReportKind::TopProducts,
            ReportChoice::BranchProducts => ReportKind::BranchProducts,
            ReportChoice::TopBranches => ReportKind::TopBranches,
            ReportChoice::MonthlyTrend => ReportKind::MonthlyTrend,
            ReportChoice::SeasonalTrend => ReportKind::SeasonalTrend,
            ReportChoice::BestPerSeason => ReportKind::BestPerSeason,
            ReportChoice::MostDemanded => ReportKind::MostDemanded,
        }
    }
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned plain-text table (default)
    #[default]
    Text,
    /// Markdown format
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Reports selected on the command line, in run order.
    pub fn selected_reports(&self) -> Vec<ReportKind> {
        if self.all {
            ReportKind::ALL.to_vec()
        } else {
            self.report.map(ReportKind::from).into_iter().collect()
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Nothing else matters for these
        if self.init_config || self.list {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Store URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Data file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
