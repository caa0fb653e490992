//! Rendering of a priced decklist for the terminal and for report files.

pub mod export;
pub mod html;
pub mod text;

use crate::domain::model::{Report, RunSummary};
use crate::utils::error::{PriceCheckError, Result};

pub use export::{render_csv, render_json};
pub use html::render_html;
pub use text::render_text;

/// Renders the persisted report in one of the supported formats (`html`, `csv`, `json`).
pub fn render_artifact(format: &str, report: &Report, summary: &RunSummary) -> Result<String> {
    match format {
        "html" => Ok(render_html(report, summary)),
        "csv" => render_csv(report),
        "json" => render_json(report, summary),
        other => Err(PriceCheckError::InvalidConfigValueError {
            field: "formats".to_string(),
            value: other.to_string(),
            reason: "Supported values: html, csv, json".to_string(),
        }),
    }
}
