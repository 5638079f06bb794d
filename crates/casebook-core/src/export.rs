use std::borrow::Cow;

use crate::{ChronologyEvent, ComplianceCheck, LegalEntity};

/// A record that can be written as one CSV row
pub trait CsvRecord {
    fn headers() -> &'static [&'static str];
    fn fields(&self) -> Vec<String>;
}

/// Quote a field if it contains a comma, quote or line break; embedded quotes are doubled
pub fn escape_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

pub fn to_csv<S: AsRef<str>>(headers: &[&str], rows: &[Vec<S>]) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(join_row(headers.iter().copied()));
    for row in rows {
        lines.push(join_row(row.iter().map(|f| f.as_ref())));
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn records_to_csv<R: CsvRecord>(records: &[R]) -> String {
    let rows: Vec<Vec<String>> = records.iter().map(|r| r.fields()).collect();
    to_csv(R::headers(), &rows)
}

fn join_row<'a>(fields: impl Iterator<Item = &'a str>) -> String {
    fields.map(escape_field).collect::<Vec<_>>().join(",")
}

impl CsvRecord for ChronologyEvent {
    fn headers() -> &'static [&'static str] {
        &[
            "Date",
            "Time",
            "Title",
            "Description",
            "Category",
            "Source Document",
            "Entities",
            "Confidence",
        ]
    }

    fn fields(&self) -> Vec<String> {
        let entities = self
            .entities
            .iter()
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join("; ");

        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.time.map(|t| t.format("%H:%M").to_string()).unwrap_or_default(),
            self.title.clone(),
            self.description.clone(),
            self.category.label().to_string(),
            self.source_document.clone(),
            entities,
            format!("{:.2}", self.confidence),
        ]
    }
}

impl CsvRecord for ComplianceCheck {
    fn headers() -> &'static [&'static str] {
        &["Check", "Category", "Status", "Details"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.category.clone(),
            self.status.as_str().to_string(),
            self.details.clone(),
        ]
    }
}

impl CsvRecord for LegalEntity {
    fn headers() -> &'static [&'static str] {
        &["Text", "Label", "Start", "End", "Confidence"]
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.text.clone(),
            self.label.clone(),
            self.start.to_string(),
            self.end.to_string(),
            format!("{:.2}", self.confidence),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CheckStatus, EventCategory};
    use chrono::{NaiveDate, NaiveTime};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("Smith, John"), "\"Smith, John\"");
        assert_eq!(escape_field("the \"bundle\""), "\"the \"\"bundle\"\"\"");
        assert_eq!(escape_field("line one\nline two"), "\"line one\nline two\"");
        assert_eq!(escape_field("carriage\rreturn"), "\"carriage\rreturn\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_plain_fields_are_borrowed() {
        assert!(matches!(escape_field("no specials"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_to_csv() {
        let rows = vec![vec!["1", "a,b"], vec!["2", "say \"hi\""]];
        let csv = to_csv(&["id", "value"], &rows);
        assert_eq!(csv, "id,value\n1,\"a,b\"\n2,\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn test_chronology_rows() {
        let event = ChronologyEvent {
            id: "e1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            time: NaiveTime::from_hms_opt(10, 30, 0),
            title: "Hearing, Southwark".to_string(),
            description: "Plea hearing at Southwark Crown Court".to_string(),
            category: EventCategory::Hearing,
            source_document: "listing.pdf".to_string(),
            entities: Vec::new(),
            confidence: 0.9,
        };

        let csv = records_to_csv(&[event]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Date,Time,Title,Description,Category,Source Document,Entities,Confidence"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-15,10:30,\"Hearing, Southwark\",Plea hearing at Southwark Crown Court,Hearing,listing.pdf,,0.90"
        );
    }

    #[test]
    fn test_compliance_rows() {
        let check = ComplianceCheck {
            id: "pii-exposure".to_string(),
            name: "PII exposure".to_string(),
            category: "Data protection".to_string(),
            status: CheckStatus::Warning,
            details: "2 documents contain \"PERSON\" data".to_string(),
        };
        let csv = records_to_csv(&[check]);
        assert!(csv.ends_with("PII exposure,Data protection,warning,\"2 documents contain \"\"PERSON\"\" data\"\n"));
    }
}
