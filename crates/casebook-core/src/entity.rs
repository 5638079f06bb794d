use serde::{Deserialize, Serialize};

/// Entity found by the legal recogniser. Offsets are byte offsets into the analysed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalEntity {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f32,
}

/// Personally identifiable information span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiEntity {
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    #[serde(default = "default_score")]
    pub score: f32,
}

fn default_score() -> f32 {
    0.85
}

impl PiiEntity {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn overlaps(&self, other: &PiiEntity) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &PiiEntity) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}
