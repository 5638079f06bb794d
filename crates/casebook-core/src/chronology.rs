use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{LegalEntity, ScannedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Hearing,
    Filing,
    Correspondence,
    Meeting,
    Financial,
    #[default]
    Other,
}

impl EventCategory {
    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Hearing => "Hearing",
            EventCategory::Filing => "Filing",
            EventCategory::Correspondence => "Correspondence",
            EventCategory::Meeting => "Meeting",
            EventCategory::Financial => "Financial",
            EventCategory::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronologyEvent {
    pub id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: EventCategory,
    pub source_document: String,
    #[serde(default)]
    pub entities: Vec<LegalEntity>,
    pub confidence: f32,
}

impl ChronologyEvent {
    /// Sort key: untimed events come before timed events on the same day
    pub fn timestamp(&self) -> (NaiveDate, Option<NaiveTime>) {
        (self.date, self.time)
    }
}

/// Deterministic event id, stable across re-processing of the same document
pub fn event_id(source: &str, date: NaiveDate, text: &str) -> String {
    let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(date.to_string().as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();

    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Merge incoming events into an existing timeline.
///
/// Events sharing an id keep their first occurrence, so stored events win over
/// incoming ones. The result is stably sorted ascending by timestamp.
pub fn merge_events(
    existing: Vec<ChronologyEvent>,
    incoming: Vec<ChronologyEvent>,
) -> Vec<ChronologyEvent> {
    let mut seen = HashSet::new();
    let mut merged: Vec<ChronologyEvent> = existing
        .into_iter()
        .chain(incoming)
        .filter(|e| seen.insert(e.id.clone()))
        .collect();

    merged.sort_by_key(|e| e.timestamp());
    merged
}

/// Merge document lists, dropping any document whose file name is already present
pub fn merge_documents(
    existing: Vec<ScannedDocument>,
    incoming: Vec<ScannedDocument>,
) -> Vec<ScannedDocument> {
    let mut seen = HashSet::new();
    existing
        .into_iter()
        .chain(incoming)
        .filter(|d| seen.insert(d.file_name.clone()))
        .collect()
}
