//! Presentation. Every renderer is a pure function of its input and is
//! called once, after the pipeline has finished.

mod console;
mod csv_export;
mod html;

use crate::models::ScreeningRun;
use anyhow::{Context, Result};

pub use self::console::{render_console, render_indices, render_rank_list};
pub use self::csv_export::render_csv;
pub use self::html::render_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Console,
    Csv,
    Html,
    Json,
}

impl OutputFormat {
    /// Bytes written ahead of the body when saving to a file. Spreadsheet
    /// tools need the BOM to read Korean names in CSV as UTF-8.
    pub fn file_prefix(self) -> &'static str {
        match self {
            OutputFormat::Csv => "\u{feff}",
            _ => "",
        }
    }
}

pub fn render(run: &ScreeningRun, format: OutputFormat, color: bool) -> Result<String> {
    match format {
        OutputFormat::Console => Ok(render_console(run, color)),
        OutputFormat::Csv => render_csv(run),
        OutputFormat::Html => Ok(render_html(run)),
        OutputFormat::Json => render_json(run),
    }
}

pub fn render_json(run: &ScreeningRun) -> Result<String> {
    serde_json::to_string_pretty(run).context("Failed to serialise run as JSON")
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn json_round_trips_meta_and_results() {
        let run = run(vec![result("005930", "삼성전자", 0.0123)]);
        let body = render_json(&run).unwrap();
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["meta"]["market"], "kospi");
        assert_eq!(value["meta"]["partial"], false);
        assert_eq!(value["results"][0]["ticker"]["code"], "005930");
        assert_eq!(value["results"][0]["fundamentals"]["debt_ratio"], serde_json::Value::Null);
    }

    #[test]
    fn only_csv_gets_a_bom() {
        assert_eq!(OutputFormat::Csv.file_prefix(), "\u{feff}");
        assert_eq!(OutputFormat::Html.file_prefix(), "");
        assert_eq!(OutputFormat::Json.file_prefix(), "");
    }
}
