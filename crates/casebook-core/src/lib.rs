// Domain modules
pub mod case;
pub mod chronology;
pub mod compliance;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod export;
pub mod extraction;

pub use case::{Case, CaseStatus, NewCase};
pub use chronology::{ChronologyEvent, EventCategory};
pub use compliance::{CheckStatus, ComplianceCheck, ComplianceRating, ComplianceReport};
pub use config::CasebookConfig;
pub use document::{DocumentKind, DocumentStatus, ExtractionMethod, ScannedDocument};
pub use entity::{LegalEntity, PiiEntity};
pub use error::{CasebookError, Result};
pub use export::CsvRecord;
pub use extraction::{ExtractionOptions, ExtractionResult};

/// Current time as unix milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
