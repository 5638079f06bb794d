use serde::{Deserialize, Serialize};

/// Version written alongside every state blob
pub const SCHEMA_VERSION: i64 = 1;

/// Case-scoped state blobs, stored under `<kind>_<caseId>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Compliance,
    ScannedDocuments,
    SkeletonArguments,
    Chronology,
    Analysis,
}

impl StateKind {
    pub const ALL: [StateKind; 5] = [
        StateKind::Compliance,
        StateKind::ScannedDocuments,
        StateKind::SkeletonArguments,
        StateKind::Chronology,
        StateKind::Analysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StateKind::Compliance => "compliance",
            StateKind::ScannedDocuments => "scanned_documents",
            StateKind::SkeletonArguments => "skeleton_arguments",
            StateKind::Chronology => "chronology",
            StateKind::Analysis => "analysis",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn key(&self, case_id: &str) -> String {
        format!("{}_{}", self.as_str(), case_id)
    }
}
