//! Report rendering.
//!
//! Turns aggregated report results into Markdown, JSON, or an aligned
//! plain-text table. Labels are emitted as-is; any script shaping is left
//! to whatever displays the output.

use crate::models::{ChartKind, Dashboard, DashboardMetadata, ReportKind, ReportResult, ReportRow};
use anyhow::Result;
use serde::Serialize;

/// Presentation options shared by all formats.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Show each row's share of the total for pie-chart reports.
    pub show_share: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { show_share: true }
    }
}

/// Format a whole number with thousands separators.
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if value < 0 {
        format!("-{}", out)
    } else {
        out
    }
}

/// Format a metric value rounded to whole units.
pub fn format_metric(value: f64) -> String {
    format_thousands(value.round() as i64)
}

fn shows_share(result: &ReportResult, options: &RenderOptions) -> bool {
    options.show_share && result.kind == ReportKind::TopCustomers && result.total() > 0.0
}

/// Column headings, then one row of cells per report row.
fn table_cells(result: &ReportResult, options: &RenderOptions) -> (Vec<String>, Vec<Vec<String>>) {
    let kind = result.kind;
    let share = shows_share(result, options);
    let total = result.total();

    let mut headings = vec!["#".to_string()];
    headings.extend(kind.label_headings().iter().map(|h| h.to_string()));
    headings.push(kind.metric_label().to_string());
    if share {
        headings.push("Share".to_string());
    }

    let rows = result
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut cells = vec![(i + 1).to_string()];
            cells.extend(row.labels.iter().cloned());
            cells.push(format_metric(row.value));
            if share {
                cells.push(format!("{:.1}%", row.value / total * 100.0));
            }
            cells
        })
        .collect();

    (headings, rows)
}

/// Generate the Markdown section for one report.
pub fn generate_markdown_section(result: &ReportResult, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", result.kind.title()));
    section.push_str(&format!(
        "*Chart: {} | Records: {}*\n\n",
        result.kind.chart(),
        result.records
    ));

    if result.is_empty() {
        section.push_str("Nothing to display.\n\n");
        return section;
    }

    let (headings, rows) = table_cells(result, options);

    section.push_str(&format!("| {} |\n", headings.join(" | ")));
    let align: Vec<&str> = headings
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i == 0 || i > result.kind.label_headings().len() {
                "---:"
            } else {
                ":---"
            }
        })
        .collect();
    section.push_str(&format!("|{}|\n", align.join("|")));

    for cells in rows {
        let escaped: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|")).collect();
        section.push_str(&format!("| {} |\n", escaped.join(" | ")));
    }
    section.push('\n');

    section
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &DashboardMetadata) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n\n",
        metadata.duration_seconds
    ));

    section
}

/// Generate a complete Markdown document.
pub fn generate_markdown_report(dashboard: &Dashboard, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Retail Sales Report\n\n");
    output.push_str(&generate_metadata_section(&dashboard.metadata));

    if dashboard.reports.len() > 1 {
        output.push_str("## Contents\n\n");
        for result in &dashboard.reports {
            let title = result.kind.title();
            let anchor = title
                .to_lowercase()
                .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
                .replace(' ', "-");
            output.push_str(&format!("- [{}](#{})\n", title, anchor));
        }
        output.push('\n');
    }

    for result in &dashboard.reports {
        output.push_str(&generate_markdown_section(result, options));
    }

    output
}

/// Generate an aligned plain-text table for one report.
pub fn generate_text_section(result: &ReportResult, options: &RenderOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("{}\n", result.kind.title()));
    section.push_str(&format!("{}\n", "=".repeat(result.kind.title().chars().count())));

    if result.is_empty() {
        section.push_str("Nothing to display.\n");
        return section;
    }

    let (headings, rows) = table_cells(result, options);
    let label_cols = result.kind.label_headings().len();

    let mut widths: Vec<usize> = headings.iter().map(|h| h.chars().count()).collect();
    for cells in &rows {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let render_line = |cells: &[String]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let pad = widths[i].saturating_sub(cell.chars().count());
                if i >= 1 && i <= label_cols {
                    format!("{}{}", cell, " ".repeat(pad))
                } else {
                    format!("{}{}", " ".repeat(pad), cell)
                }
            })
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    section.push_str(&render_line(headings.as_slice()));
    section.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    section.push_str(&rule.join("  "));
    section.push('\n');
    for cells in &rows {
        section.push_str(&render_line(cells.as_slice()));
        section.push('\n');
    }

    section
}

/// Generate plain-text output for every report.
pub fn generate_text_report(dashboard: &Dashboard, options: &RenderOptions) -> String {
    dashboard
        .reports
        .iter()
        .map(|r| generate_text_section(r, options))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Serialize)]
struct ReportView<'a> {
    kind: ReportKind,
    title: &'static str,
    chart: ChartKind,
    metric: &'static str,
    labels: &'static [&'static str],
    records: usize,
    rows: &'a [ReportRow],
}

#[derive(Serialize)]
struct DashboardView<'a> {
    metadata: &'a DashboardMetadata,
    reports: Vec<ReportView<'a>>,
}

fn view(result: &ReportResult) -> ReportView<'_> {
    ReportView {
        kind: result.kind,
        title: result.kind.title(),
        chart: result.kind.chart(),
        metric: result.kind.metric_label(),
        labels: result.kind.label_headings(),
        records: result.records,
        rows: &result.rows,
    }
}

/// Generate a JSON report.
pub fn generate_json_report(dashboard: &Dashboard) -> Result<String> {
    let view = DashboardView {
        metadata: &dashboard.metadata,
        reports: dashboard.reports.iter().map(view).collect(),
    };
    serde_json::to_string_pretty(&view).map_err(Into::into)
}
