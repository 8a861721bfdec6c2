//! CSV export of the maturity timeline.
//!
//! Layout: `Data,<journey name>...` header, then one row per date in
//! calendar order with the date as `dd/mm/yyyy` and each journey's
//! percentage as a whole number between 0 and 100.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::analytics::{get_all_journey_snapshots, reshape_timeline, AnalyticsContext, DateRange, TimelineChart};
use crate::error::Result;
use crate::types::SnapshotType;

const DATE_HEADER: &str = "Data";

/// Render a reshaped timeline as CSV.
pub fn timeline_csv(chart: &TimelineChart) -> String {
    let mut out = String::new();

    let header: Vec<String> = std::iter::once(DATE_HEADER.to_string())
        .chain(chart.columns.iter().map(|c| escape_field(&c.name)))
        .collect();
    out.push_str(&header.join(","));
    out.push('\n');

    for row in &chart.rows {
        let mut fields = vec![row.label()];
        fields.extend(
            chart
                .columns
                .iter()
                .map(|c| percent_cell(row.value(&c.slug)).to_string()),
        );
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn percent_cell(value: f64) -> i64 {
    value.round().clamp(0.0, 100.0) as i64
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Lowercase, with every run of non-alphanumeric characters collapsed to `-`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;
    for c in value.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// `maturidade_<company>_<range label>.csv`
pub fn export_filename(company_name: &str, range_label: &str) -> String {
    let company = slugify(company_name);
    let company = if company.is_empty() { "empresa".to_string() } else { company };
    format!("maturidade_{}_{}.csv", company, range_label)
}

/// Written export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub journeys: usize,
}

/// Export a company's timeline for a range into `dir`.
///
/// An unknown company is named after its id; an empty range still writes a
/// header-only file.
pub fn write_timeline_csv(
    ctx: AnalyticsContext<'_>,
    company_id: &str,
    range: DateRange,
    range_label: &str,
    snapshot_type: SnapshotType,
    dir: &Path,
) -> Result<ExportSummary> {
    let series = get_all_journey_snapshots(ctx, company_id, range.start, range.end, snapshot_type)?;
    let chart = reshape_timeline(&series);

    let company_name = ctx
        .facts
        .get_company(company_id)?
        .map(|c| c.name)
        .unwrap_or_else(|| company_id.to_string());

    std::fs::create_dir_all(dir)?;
    let path = dir.join(export_filename(&company_name, range_label));
    std::fs::write(&path, timeline_csv(&chart))?;

    tracing::info!(
        company_id,
        path = %path.display(),
        rows = chart.rows.len(),
        "Exported maturity timeline"
    );

    Ok(ExportSummary {
        path,
        rows: chart.rows.len(),
        journeys: chart.columns.len(),
    })
}
