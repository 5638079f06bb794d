use std::collections::{BTreeMap, HashSet};

use casebook_core::{
    Case, CheckStatus, ChronologyEvent, ComplianceCheck, ComplianceReport, ScannedDocument,
};
use casebook_nlp::is_sensitive;

/// Runs the case file checks and scores them
#[derive(Debug, Default)]
pub struct ComplianceChecker;

impl ComplianceChecker {
    pub fn run(
        &self,
        case: &Case,
        documents: &[ScannedDocument],
        chronology: &[ChronologyEvent],
    ) -> ComplianceReport {
        let checks = vec![
            case_details(case),
            document_extraction(documents),
            chronology_coverage(documents, chronology),
            pii_exposure(documents),
        ];
        let report = ComplianceReport::new(&case.id, checks);
        tracing::info!(
            "Compliance for {}: {}% ({:?})",
            case.reference,
            report.score,
            report.rating
        );
        report
    }
}

fn check(id: &str, name: &str, category: &str, status: CheckStatus, details: String) -> ComplianceCheck {
    ComplianceCheck {
        id: id.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        status,
        details,
    }
}

fn case_details(case: &Case) -> ComplianceCheck {
    let (status, details) = if case.client.is_empty() {
        (CheckStatus::Warning, "No client recorded for this case".to_string())
    } else {
        (CheckStatus::Pass, format!("Client: {}", case.client))
    };
    check("case-details", "Case details complete", "Case Management", status, details)
}

fn document_extraction(documents: &[ScannedDocument]) -> ComplianceCheck {
    let failed = documents.iter().filter(|d| d.is_failed()).count();
    let (status, details) = match (documents.len(), failed) {
        (0, _) => (CheckStatus::Warning, "No documents have been uploaded".to_string()),
        (total, 0) => (CheckStatus::Pass, format!("All {} document(s) processed", total)),
        (total, f) if f == total => (
            CheckStatus::Fail,
            format!("All {} document(s) failed extraction", total),
        ),
        (total, f) => (
            CheckStatus::Warning,
            format!("{} of {} document(s) failed extraction", f, total),
        ),
    };
    check("document-extraction", "Document text extraction", "Evidence", status, details)
}

fn chronology_coverage(documents: &[ScannedDocument], chronology: &[ChronologyEvent]) -> ComplianceCheck {
    let sources: HashSet<&str> = chronology.iter().map(|e| e.source_document.as_str()).collect();
    let processed: Vec<&ScannedDocument> = documents.iter().filter(|d| !d.is_failed()).collect();
    let uncovered = processed
        .iter()
        .filter(|d| !sources.contains(d.file_name.as_str()))
        .count();

    let (status, details) = if chronology.is_empty() {
        (CheckStatus::Fail, "Chronology has no events".to_string())
    } else if uncovered * 2 > processed.len() {
        (
            CheckStatus::Warning,
            format!(
                "{} of {} processed document(s) produced no events",
                uncovered,
                processed.len()
            ),
        )
    } else {
        (
            CheckStatus::Pass,
            format!("{} event(s) from {} source(s)", chronology.len(), sources.len()),
        )
    };
    check("chronology-coverage", "Chronology coverage", "Case Preparation", status, details)
}

fn pii_exposure(documents: &[ScannedDocument]) -> ComplianceCheck {
    let mut sensitive: BTreeMap<&str, usize> = BTreeMap::new();
    for (entity_type, count) in documents.iter().flat_map(|d| d.pii_summary.iter()) {
        if is_sensitive(entity_type) {
            *sensitive.entry(entity_type.as_str()).or_default() += count;
        }
    }

    let (status, details) = if documents.is_empty() {
        (CheckStatus::Checking, "Awaiting documents".to_string())
    } else if sensitive.is_empty() {
        (CheckStatus::Pass, "No sensitive personal data detected".to_string())
    } else {
        let found: Vec<String> = sensitive
            .iter()
            .map(|(t, n)| format!("{} x{}", t, n))
            .collect();
        (
            CheckStatus::Warning,
            format!("Sensitive data present, redact before disclosure: {}", found.join(", ")),
        )
    };
    check("pii-exposure", "Personal data exposure", "GDPR", status, details)
}
