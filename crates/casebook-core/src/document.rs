use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Text,
    Image,
    Unsupported,
}

impl DocumentKind {
    pub fn from_file_name(name: &str) -> Self {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "pdf" => DocumentKind::Pdf,
            "txt" | "md" | "text" | "csv" | "eml" => DocumentKind::Text,
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => DocumentKind::Image,
            _ => DocumentKind::Unsupported,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Text => "Text",
            DocumentKind::Image => "Image",
            DocumentKind::Unsupported => "Unsupported",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PlainText,
    PdfService,
    Ocr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Processed,
    Failed,
}

/// A document that has been through the ingest pipeline for a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannedDocument {
    pub id: String,
    pub file_name: String,
    pub kind: DocumentKind,
    pub size_bytes: u64,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub extraction_method: Option<ExtractionMethod>,
    #[serde(default)]
    pub text: String,
    pub text_length: usize,
    pub date_count: usize,
    pub event_count: usize,
    #[serde(default)]
    pub pii_summary: BTreeMap<String, usize>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub processed_at: i64,
}

impl ScannedDocument {
    /// A document record with nothing extracted yet
    pub fn pending(file_name: &str, size_bytes: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.to_string(),
            kind: DocumentKind::from_file_name(file_name),
            size_bytes,
            page_count: None,
            extraction_method: None,
            text: String::new(),
            text_length: 0,
            date_count: 0,
            event_count: 0,
            pii_summary: BTreeMap::new(),
            status: DocumentStatus::Processed,
            error: None,
            processed_at: crate::now_millis(),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = DocumentStatus::Failed;
        self.error = Some(message.into());
    }

    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }
}
