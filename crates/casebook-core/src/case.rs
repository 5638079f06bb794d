use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    #[default]
    Open,
    Closed,
    Archived,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Open => "open",
            CaseStatus::Closed => "closed",
            CaseStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "closed" => CaseStatus::Closed,
            "archived" => CaseStatus::Archived,
            _ => CaseStatus::Open,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    pub reference: String,
    pub title: String,
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub status: CaseStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields supplied when opening a case
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCase {
    pub reference: String,
    pub title: String,
    #[serde(default)]
    pub client: String,
}

impl Case {
    pub fn new(new: NewCase) -> Self {
        let now = crate::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            reference: new.reference.trim().to_string(),
            title: new.title.trim().to_string(),
            client: new.client.trim().to_string(),
            status: CaseStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }
}
