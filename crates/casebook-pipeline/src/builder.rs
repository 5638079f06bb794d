//! Builds chronology events from extracted document text.
//!
//! The text is split into sentences; every distinct date inside a sentence becomes
//! one event, categorised by keywords and carrying the legal entities found in
//! that sentence.

use std::collections::HashSet;

use casebook_core::chronology::event_id;
use casebook_core::{ChronologyEvent, EventCategory, LegalEntity};
use casebook_nlp::ExtractedDate;
use once_cell::sync::Lazy;
use regex::Regex;

const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sir", "st", "no", "nos", "v", "vs", "ltd", "co", "inc",
    "plc", "para", "paras", "s", "ss", "sch", "art", "reg", "cf", "e.g", "i.e", "etc", "approx",
    "a.m", "p.m",
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

static CATEGORY_KEYWORDS: Lazy<Vec<(EventCategory, Regex)>> = Lazy::new(|| {
    let table = [
        (
            EventCategory::Hearing,
            r"(?i)\b(?:hearing|trial|court|judge|sentenc\w*|listed|adjourn\w*|mention|verdict|plea)\b",
        ),
        (
            EventCategory::Filing,
            r"(?i)\b(?:filed|filing|served|service|lodged|application|claim form|indictment|order|skeleton)\b",
        ),
        (
            EventCategory::Financial,
            r"(?i)(?:£|\$|€|\b(?:payment|paid|transfer\w*|invoice|bank|account|confiscation|restraint|funds)\b)",
        ),
        (
            EventCategory::Meeting,
            r"(?i)\b(?:meeting|met|conference|interview\w*|consultation)\b",
        ),
        (
            EventCategory::Correspondence,
            r"(?i)\b(?:letter|email\w*|e-mail|wrote|writes|correspondence|telephone|call(?:ed)?)\b",
        ),
    ];
    table
        .into_iter()
        .filter_map(|(category, pattern)| Regex::new(pattern).ok().map(|r| (category, r)))
        .collect()
});

/// Byte spans of the sentences in `text`, trimmed of surrounding whitespace.
///
/// A sentence ends at `.`, `!` or `?` followed by whitespace or end of text, or at a
/// blank line. A full stop after a known abbreviation or a single capital initial
/// does not end a sentence.
pub fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        let next = chars.get(i + 1).map(|&(_, n)| n);
        let at_break = next.map_or(true, char::is_whitespace);

        let boundary = match c {
            '!' | '?' => at_break,
            '.' => at_break && !ends_with_abbreviation(&text[start..pos]),
            '\n' => next == Some('\n'),
            _ => false,
        };

        if boundary {
            let end = pos + c.len_utf8();
            push_trimmed(text, start, end, &mut spans);
            start = end;
        }
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn ends_with_abbreviation(preceding: &str) -> bool {
    let word = preceding
        .rsplit(|c: char| c.is_whitespace() || c == '(' || c == '"')
        .next()
        .unwrap_or("");

    let mut letters = word.chars();
    if let (Some(first), None) = (letters.next(), letters.next()) {
        if first.is_uppercase() {
            return true;
        }
    }

    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let trimmed_start = start + (slice.len() - slice.trim_start().len());
    let trimmed_end = start + slice.trim_end().len();
    if trimmed_start < trimmed_end {
        spans.push((trimmed_start, trimmed_end));
    }
}

pub fn categorize(sentence: &str) -> EventCategory {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, regex)| regex.is_match(sentence))
        .map(|(category, _)| *category)
        .unwrap_or_default()
}

pub struct ChronologyBuilder {
    title_words: usize,
}

impl Default for ChronologyBuilder {
    fn default() -> Self {
        Self { title_words: 8 }
    }
}

impl ChronologyBuilder {
    pub fn new(title_words: usize) -> Self {
        Self {
            title_words: title_words.max(1),
        }
    }

    pub fn build(
        &self,
        document_name: &str,
        text: &str,
        entities: &[LegalEntity],
        dates: &[ExtractedDate],
    ) -> Vec<ChronologyEvent> {
        let mut events = Vec::new();

        for (start, end) in split_sentences(text) {
            let mut seen_dates = HashSet::new();
            let in_sentence = dates
                .iter()
                .filter(|d| d.start >= start && d.end <= end)
                .filter(|d| seen_dates.insert(d.date));

            let sentence = normalize_whitespace(&text[start..end]);
            let mut sentence_entities: Option<Vec<LegalEntity>> = None;

            for date in in_sentence {
                let event_entities = sentence_entities
                    .get_or_insert_with(|| entities_within(entities, start, end))
                    .clone();

                events.push(ChronologyEvent {
                    id: event_id(document_name, date.date, &sentence),
                    date: date.date,
                    time: date.time,
                    title: self.title(&sentence),
                    description: sentence.clone(),
                    category: categorize(&sentence),
                    source_document: document_name.to_string(),
                    entities: event_entities,
                    confidence: date.confidence(),
                });
            }
        }

        tracing::debug!("Built {} events from {}", events.len(), document_name);
        events
    }

    fn title(&self, sentence: &str) -> String {
        let words: Vec<&str> = sentence.split_whitespace().collect();
        if words.len() <= self.title_words {
            return sentence
                .trim_end_matches(|c: char| matches!(c, '.' | '!' | '?' | ',' | ';' | ':'))
                .to_string();
        }
        let head = words[..self.title_words].join(" ");
        format!(
            "{}...",
            head.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':'))
        )
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Legal entities fully inside the span, without dates and without repeats of the same label and text
fn entities_within(entities: &[LegalEntity], start: usize, end: usize) -> Vec<LegalEntity> {
    let mut seen = HashSet::new();
    entities
        .iter()
        .filter(|e| e.start >= start && e.end <= end && e.label != "DATE")
        .filter(|e| seen.insert((e.label.clone(), e.text.clone())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use casebook_nlp::{extract_dates, LegalEntityRecognizer};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn sentences(text: &str) -> Vec<&str> {
        split_sentences(text)
            .into_iter()
            .map(|(s, e)| &text[s..e])
            .collect()
    }

    #[test]
    fn test_split_respects_abbreviations() {
        let text = "Mr. Smith met Dr. J. Jones at 10 a.m. on Monday. He left! Did he return?  Yes.";
        assert_eq!(
            sentences(text),
            vec![
                "Mr. Smith met Dr. J. Jones at 10 a.m. on Monday.",
                "He left!",
                "Did he return?",
                "Yes."
            ]
        );
    }

    #[test]
    fn test_split_keeps_numeric_dates_and_case_names() {
        let text = "Served 15.03.24 in Smith v. Jones. Next hearing 2 Dec. 2024.";
        assert_eq!(
            sentences(text),
            vec!["Served 15.03.24 in Smith v. Jones.", "Next hearing 2 Dec. 2024."]
        );
    }

    #[test]
    fn test_split_on_blank_lines() {
        let text = "WITNESS STATEMENT\n\nOn 1 May 2023 I was at home";
        assert_eq!(sentences(text), vec!["WITNESS STATEMENT", "On 1 May 2023 I was at home"]);
    }

    #[test]
    fn test_categorize() {
        assert_eq!(categorize("The trial was adjourned"), EventCategory::Hearing);
        assert_eq!(categorize("Defence statement served"), EventCategory::Filing);
        assert_eq!(categorize("£5,000 was transferred"), EventCategory::Financial);
        assert_eq!(categorize("Client interview at chambers"), EventCategory::Meeting);
        assert_eq!(categorize("Letter sent to the CPS"), EventCategory::Correspondence);
        assert_eq!(categorize("The defendant was arrested"), EventCategory::Other);
    }

    #[test]
    fn test_build_events() {
        let text = "The defendant was arrested on 10 January 2023. \
                    A hearing at the Crown Court at Southwark was listed for 15 March 2024 at 10:30 \
                    before the Judge, and again on 15 March 2024.";
        let entities = LegalEntityRecognizer::new().analyze(text);
        let dates = extract_dates(text);

        let events = ChronologyBuilder::default().build("statement.txt", text, &entities, &dates);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].date, NaiveDate::from_ymd_opt(2023, 1, 10).unwrap());
        assert_eq!(events[0].category, EventCategory::Other);
        assert_eq!(events[0].title, "The defendant was arrested on 10 January 2023");

        let hearing = &events[1];
        assert_eq!(hearing.category, EventCategory::Hearing);
        assert!(hearing.time.is_some());
        assert!(hearing.title.ends_with("..."));
        let labels: Vec<&str> = hearing.entities.iter().map(|e| e.label.as_str()).collect();
        assert!(labels.contains(&"COURT"));
        assert!(labels.contains(&"LEGAL_ROLE"));
        assert!(!labels.contains(&"DATE"));
    }

    #[test]
    fn test_event_ids_are_stable() {
        let text = "Letter sent on 3 April 2024.";
        let dates = extract_dates(text);
        let builder = ChronologyBuilder::default();

        let first = builder.build("a.txt", text, &[], &dates);
        let second = builder.build("a.txt", text, &[], &dates);
        let other = builder.build("b.txt", text, &[], &dates);

        assert_eq!(first[0].id, second[0].id);
        assert_ne!(first[0].id, other[0].id);
    }
}
