//! Data models for the sales dashboard.
//!
//! This module contains the sale record as it comes out of the store,
//! the closed set of report kinds, and the ordered report result handed
//! to the renderer.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

/// A field of a sale document, named as it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    CustomerId,
    CustomerName,
    ProductId,
    ProductName,
    BranchId,
    BranchName,
    Quantity,
    Price,
    TotalPrice,
    SaleDate,
}

impl Field {
    /// Returns the document key used by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CustomerId => "CustomerID",
            Field::CustomerName => "CustomerName",
            Field::ProductId => "ProductID",
            Field::ProductName => "ProductName",
            Field::BranchId => "BranchID",
            Field::BranchName => "BranchName",
            Field::Quantity => "Quantity",
            Field::Price => "Price",
            Field::TotalPrice => "TotalPrice",
            Field::SaleDate => "SaleDate",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data-quality problems found while reading or aggregating records.
#[derive(Debug, Error)]
pub enum DataError {
    /// A field the report needs is absent from a record.
    #[error("record {index}: missing field `{field}`")]
    MissingField { index: usize, field: Field },

    /// A numeric field is negative, non-finite, or a fractional quantity.
    #[error("record {index}: field `{field}` holds an out-of-range number")]
    InvalidNumber { index: usize, field: Field },

    /// The document could not be decoded into a sale record.
    #[error("record {index}: malformed document: {source}")]
    Malformed {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Opaque identifier; stores hold these as either strings or integers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Ident(pub String);

impl<'de> Deserialize<'de> for Ident {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
            Float(f64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Ident(s),
            Raw::Int(n) => Ident(n.to_string()),
            Raw::Float(n) if n.fract() == 0.0 => Ident(format!("{}", n as i64)),
            Raw::Float(n) => Ident(n.to_string()),
        })
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Numeric store value: a plain JSON number or a MongoDB extended JSON
/// wrapper. Range checks happen during aggregation, so negative and
/// non-finite values decode fine.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Plain(f64),
    Extended {
        #[serde(
            rename = "$numberDecimal",
            alias = "$numberDouble",
            alias = "$numberLong",
            alias = "$numberInt"
        )]
        value: String,
    },
}

fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<RawAmount>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawAmount::Plain(n)) => Ok(Some(n)),
        Some(RawAmount::Extended { value }) => value
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number `{value}`"))),
    }
}

/// Calendar date of a sale.
///
/// Accepts plain dates, RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS`, and
/// MongoDB extended JSON (`{"$date": ...}`). Only the UTC date is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SaleDate(pub NaiveDate);

impl SaleDate {
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(SaleDate(date));
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(SaleDate(ts.with_timezone(&Utc).date_naive()));
        }
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(|dt| SaleDate(dt.date()))
    }

    fn from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| SaleDate(dt.date_naive()))
    }
}

impl<'de> Deserialize<'de> for SaleDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Millis {
            Int(i64),
            Long {
                #[serde(rename = "$numberLong")]
                number_long: String,
            },
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Extended {
                #[serde(rename = "$date")]
                date: ExtendedDate,
            },
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ExtendedDate {
            Text(String),
            Millis(Millis),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Text(s) | Raw::Extended { date: ExtendedDate::Text(s) } => {
                SaleDate::parse_str(&s)
            }
            Raw::Extended {
                date: ExtendedDate::Millis(Millis::Int(ms)),
            } => SaleDate::from_millis(ms),
            Raw::Extended {
                date: ExtendedDate::Millis(Millis::Long { number_long }),
            } => number_long
                .parse::<i64>()
                .ok()
                .and_then(SaleDate::from_millis),
        };

        parsed.ok_or_else(|| serde::de::Error::custom("unrecognized SaleDate format"))
    }
}

/// A single sale as returned by a projected store query.
///
/// Every field is optional because a projection only returns what the
/// report asked for.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    #[serde(rename = "CustomerID", default)]
    pub customer_id: Option<Ident>,
    #[serde(rename = "CustomerName", default)]
    pub customer_name: Option<String>,
    #[serde(rename = "ProductID", default)]
    pub product_id: Option<Ident>,
    #[serde(rename = "ProductName", default)]
    pub product_name: Option<String>,
    #[serde(rename = "BranchID", default)]
    pub branch_id: Option<Ident>,
    #[serde(rename = "BranchName", default)]
    pub branch_name: Option<String>,
    #[serde(rename = "Quantity", default, deserialize_with = "amount")]
    pub quantity: Option<f64>,
    #[serde(rename = "Price", default, deserialize_with = "amount")]
    pub price: Option<f64>,
    #[serde(rename = "TotalPrice", default, deserialize_with = "amount")]
    pub total_price: Option<f64>,
    #[serde(rename = "SaleDate", default)]
    pub sale_date: Option<SaleDate>,
}

impl SaleRecord {
    /// Decode a store document, tagging failures with the record index.
    pub fn from_document(
        index: usize,
        document: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, DataError> {
        serde_json::from_value(serde_json::Value::Object(document))
            .map_err(|source| DataError::Malformed { index, source })
    }
}

/// Calendar season, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    /// All seasons in display order.
    pub const ALL: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Autumn];

    /// Season of a calendar month (1-12).
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Season::Winter => write!(f, "Winter"),
            Season::Spring => write!(f, "Spring"),
            Season::Summer => write!(f, "Summer"),
            Season::Autumn => write!(f, "Autumn"),
        }
    }
}

/// The eight report views offered by the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    TopCustomers,
    TopProducts,
    BranchProducts,
    TopBranches,
    MonthlyTrend,
    SeasonalTrend,
    BestPerSeason,
    MostDemanded,
}

/// How many rows a report keeps after ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    Top(usize),
    All,
}

impl RowLimit {
    pub fn apply<T>(&self, rows: &mut Vec<T>) {
        if let RowLimit::Top(n) = *self {
            rows.truncate(n);
        }
    }
}

/// Kind of visual a renderer should draw for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Bar,
    Treemap,
    Line,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartKind::Pie => write!(f, "pie"),
            ChartKind::Bar => write!(f, "bar"),
            ChartKind::Treemap => write!(f, "treemap"),
            ChartKind::Line => write!(f, "line"),
            ChartKind::Scatter => write!(f, "scatter"),
        }
    }
}

/// Metadata about a dashboard run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardMetadata {
    /// Where the sale records were read from.
    pub source: String,
    /// When the reports were generated.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock time spent querying and aggregating, in seconds.
    pub duration_seconds: f64,
}

/// One or more reports rendered together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub metadata: DashboardMetadata,
    pub reports: Vec<ReportResult>,
}

impl ReportKind {
    /// All report kinds in menu order.
    pub const ALL: [ReportKind; 8] = [
        ReportKind::TopCustomers,
        ReportKind::TopProducts,
        ReportKind::BranchProducts,
        ReportKind::TopBranches,
        ReportKind::MonthlyTrend,
        ReportKind::SeasonalTrend,
        ReportKind::BestPerSeason,
        ReportKind::MostDemanded,
    ];

    /// Fields the report's store query projects.
    pub fn projection(&self) -> &'static [Field] {
        use Field::*;
        match self {
            ReportKind::TopCustomers => &[CustomerId, CustomerName, TotalPrice],
            ReportKind::TopProducts => &[ProductId, ProductName, Quantity],
            ReportKind::BranchProducts => &[BranchId, BranchName, ProductName, Quantity],
            ReportKind::TopBranches => &[BranchId, BranchName, Quantity, Price],
            ReportKind::MonthlyTrend | ReportKind::SeasonalTrend => &[SaleDate, TotalPrice],
            ReportKind::BestPerSeason => &[ProductId, ProductName, TotalPrice, SaleDate],
            ReportKind::MostDemanded => {
                &[BranchId, BranchName, ProductId, ProductName, Quantity]
            }
        }
    }

    pub fn limit(&self) -> RowLimit {
        match self {
            ReportKind::TopCustomers | ReportKind::TopProducts => RowLimit::Top(10),
            ReportKind::BranchProducts | ReportKind::TopBranches => RowLimit::Top(20),
            ReportKind::MonthlyTrend | ReportKind::SeasonalTrend => RowLimit::All,
            ReportKind::BestPerSeason => RowLimit::Top(Season::ALL.len()),
            ReportKind::MostDemanded => RowLimit::Top(5),
        }
    }

    /// Menu entry title.
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::TopCustomers => "Top 10 Customers",
            ReportKind::TopProducts => "Top 10 Products",
            ReportKind::BranchProducts => "Best-Selling Products by Branch",
            ReportKind::TopBranches => "Top 20 Branches by Revenue",
            ReportKind::MonthlyTrend => "Monthly Sales Analysis",
            ReportKind::SeasonalTrend => "Seasonal Sales Analysis",
            ReportKind::BestPerSeason => "Best Product in Each Season",
            ReportKind::MostDemanded => "Most Demanded Products",
        }
    }

    pub fn chart(&self) -> ChartKind {
        match self {
            ReportKind::TopCustomers => ChartKind::Pie,
            ReportKind::TopProducts | ReportKind::BestPerSeason => ChartKind::Bar,
            ReportKind::BranchProducts | ReportKind::TopBranches => ChartKind::Treemap,
            ReportKind::MonthlyTrend | ReportKind::SeasonalTrend => ChartKind::Line,
            ReportKind::MostDemanded => ChartKind::Scatter,
        }
    }

    /// Column headings for the row labels.
    pub fn label_headings(&self) -> &'static [&'static str] {
        match self {
            ReportKind::TopCustomers => &["Customer"],
            ReportKind::TopProducts | ReportKind::MostDemanded => &["Product"],
            ReportKind::BranchProducts => &["Branch", "Product"],
            ReportKind::TopBranches => &["Branch"],
            ReportKind::MonthlyTrend => &["Month"],
            ReportKind::SeasonalTrend => &["Season"],
            ReportKind::BestPerSeason => &["Season", "Product"],
        }
    }

    pub fn metric_label(&self) -> &'static str {
        match self {
            ReportKind::TopCustomers => "Total Spent",
            ReportKind::TopProducts => "Quantity Sold",
            ReportKind::BranchProducts => "Quantity Sold",
            ReportKind::TopBranches => "Total Revenue",
            ReportKind::MonthlyTrend => "Total Price",
            ReportKind::SeasonalTrend => "Total Sales",
            ReportKind::BestPerSeason => "Total Price",
            ReportKind::MostDemanded => "Total Quantity Required",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// One aggregated row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// The full group key, identifiers included.
    pub key: Vec<String>,
    /// Human-readable part of the key, one entry per label column.
    pub labels: Vec<String>,
    /// Aggregated metric.
    pub value: f64,
}

/// The ordered, truncated output of one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResult {
    pub kind: ReportKind,
    /// Number of records the report was computed from.
    pub records: usize,
    pub rows: Vec<ReportRow>,
}

impl ReportResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sum of the displayed metric values.
    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.value).sum()
    }
}
