use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use casebook_core::{Case, ChronologyEvent, ComplianceReport, ExtractionResult, LegalEntity};
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// How `casebook extract` renders an extraction result
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderFormat {
    Text,
    Markdown,
    Html,
    Json,
}

pub fn render(result: &ExtractionResult, format: RenderFormat) -> Result<String> {
    let rendered = match format {
        RenderFormat::Text => result.text.clone(),
        RenderFormat::Markdown => result.to_markdown(),
        RenderFormat::Html => result.to_html(),
        RenderFormat::Json => serde_json::to_string_pretty(result)?,
    };
    Ok(if rendered.ends_with('\n') { rendered } else { rendered + "\n" })
}

/// Read text from a file, or from stdin when the path is `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write to a file when given, otherwise print
pub fn emit(content: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let head: String = s.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", head)
}

pub fn cases_table(cases: &[Case]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<38} {:<16} {:<30} {:<8}\n", "ID", "Reference", "Title", "Status"));
    out.push_str(&format!("{:-<95}\n", ""));
    for case in cases {
        out.push_str(&format!(
            "{:<38} {:<16} {:<30} {:<8}\n",
            case.id,
            truncate(&case.reference, 16),
            truncate(&case.title, 30),
            case.status.as_str()
        ));
    }
    out
}

pub fn entities_table(entities: &[LegalEntity]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:<14} {:<50} {:>6} {:>6}\n", "Label", "Text", "Start", "Conf"));
    out.push_str(&format!("{:-<80}\n", ""));
    for e in entities {
        out.push_str(&format!(
            "{:<14} {:<50} {:>6} {:>6.2}\n",
            e.label,
            truncate(&e.text, 50),
            e.start,
            e.confidence
        ));
    }
    out
}

pub fn chronology_table(events: &[ChronologyEvent]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:<5} {:<14} {:<50} {}\n",
        "Date", "Time", "Category", "Title", "Source"
    ));
    out.push_str(&format!("{:-<100}\n", ""));
    for e in events {
        let time = e.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{:<10} {:<5} {:<14} {:<50} {}\n",
            e.date,
            time,
            e.category.label(),
            truncate(&e.title, 50),
            e.source_document
        ));
    }
    out
}

pub fn compliance_table(report: &ComplianceReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("Score: {}% ({:?})\n", report.score, report.rating));
    out.push_str(&format!("{:-<80}\n", ""));
    for check in &report.checks {
        out.push_str(&format!(
            "  [{:<8}] {:<28} {}\n",
            check.status.as_str(),
            check.name,
            check.details
        ));
    }
    out
}
