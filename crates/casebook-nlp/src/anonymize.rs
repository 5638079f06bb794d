//! Text anonymization over analyzer results.
//!
//! Each result is rewritten by the operator configured for its entity type,
//! falling back to the `DEFAULT` entry and then to `<ENTITY_TYPE>` replacement.

use std::collections::HashMap;

use casebook_core::{CasebookError, PiiEntity, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

pub const DEFAULT_OPERATOR_KEY: &str = "DEFAULT";

pub const ANONYMIZER_OPERATORS: &[&str] = &["replace", "redact", "mask", "hash", "keep"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashType {
    #[default]
    Sha256,
    Sha512,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operator {
    Replace {
        #[serde(default)]
        new_value: Option<String>,
    },
    Redact,
    Mask {
        #[serde(default = "default_masking_char")]
        masking_char: char,
        /// Number of characters to mask; all of them when absent
        #[serde(default)]
        chars_to_mask: Option<usize>,
        #[serde(default)]
        from_end: bool,
    },
    Hash {
        #[serde(default)]
        hash_type: HashType,
    },
    Keep,
}

fn default_masking_char() -> char {
    '*'
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Replace { .. } => "replace",
            Operator::Redact => "redact",
            Operator::Mask { .. } => "mask",
            Operator::Hash { .. } => "hash",
            Operator::Keep => "keep",
        }
    }

    fn apply(&self, entity_type: &str, original: &str) -> String {
        match self {
            Operator::Replace { new_value } => new_value
                .clone()
                .unwrap_or_else(|| format!("<{}>", entity_type)),
            Operator::Redact => String::new(),
            Operator::Mask {
                masking_char,
                chars_to_mask,
                from_end,
            } => mask(original, *masking_char, *chars_to_mask, *from_end),
            Operator::Hash { hash_type } => match hash_type {
                HashType::Sha256 => hex(&Sha256::digest(original.as_bytes())),
                HashType::Sha512 => hex(&Sha512::digest(original.as_bytes())),
            },
            Operator::Keep => original.to_string(),
        }
    }
}

fn mask(original: &str, masking_char: char, chars_to_mask: Option<usize>, from_end: bool) -> String {
    let total = original.chars().count();
    let count = chars_to_mask.unwrap_or(total).min(total);
    let (first_masked, last_masked) = if from_end {
        (total - count, total)
    } else {
        (0, count)
    };

    original
        .chars()
        .enumerate()
        .map(|(i, c)| {
            if (first_masked..last_masked).contains(&i) {
                masking_char
            } else {
                c
            }
        })
        .collect()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Operators keyed by entity type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperatorConfig(HashMap<String, Operator>);

impl OperatorConfig {
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// Parse a request-supplied operator map, rejecting unknown operator types
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| CasebookError::InvalidInput(format!("Invalid anonymizer operators: {}", e)))
    }

    pub fn with(mut self, entity_type: impl Into<String>, operator: Operator) -> Self {
        self.0.insert(entity_type.into(), operator);
        self
    }

    pub fn operator_for(&self, entity_type: &str) -> Operator {
        self.0
            .get(entity_type)
            .or_else(|| self.0.get(DEFAULT_OPERATOR_KEY))
            .cloned()
            .unwrap_or(Operator::Replace { new_value: None })
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        let replace = |v: &str| Operator::Replace {
            new_value: Some(v.to_string()),
        };
        Self::empty()
            .with(DEFAULT_OPERATOR_KEY, replace("<REDACTED>"))
            .with("PERSON", replace("<PERSON>"))
            .with("EMAIL_ADDRESS", replace("<EMAIL>"))
            .with("PHONE_NUMBER", replace("<PHONE>"))
            .with("CREDIT_CARD", replace("<CARD>"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizedItem {
    pub entity_type: String,
    /// Offsets into the anonymized text
    pub start: usize,
    pub end: usize,
    pub operator: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymizedText {
    pub text: String,
    pub items: Vec<AnonymizedItem>,
}

pub fn anonymize(
    text: &str,
    results: &[PiiEntity],
    operators: &OperatorConfig,
) -> Result<AnonymizedText> {
    for r in results {
        if r.start > r.end || r.end > text.len() {
            return Err(CasebookError::InvalidInput(format!(
                "Entity {} span {}..{} is outside text of length {}",
                r.entity_type,
                r.start,
                r.end,
                text.len()
            )));
        }
        if !text.is_char_boundary(r.start) || !text.is_char_boundary(r.end) {
            return Err(CasebookError::InvalidInput(format!(
                "Entity {} span {}..{} does not fall on character boundaries",
                r.entity_type, r.start, r.end
            )));
        }
    }

    let spans = resolve_overlaps(results);

    let mut output = String::with_capacity(text.len());
    let mut items = Vec::with_capacity(spans.len());
    let mut cursor = 0;

    for entity in spans {
        output.push_str(&text[cursor..entity.start]);

        let operator = operators.operator_for(&entity.entity_type);
        let replacement = operator.apply(&entity.entity_type, &text[entity.start..entity.end]);

        let start = output.len();
        output.push_str(&replacement);
        items.push(AnonymizedItem {
            entity_type: entity.entity_type.clone(),
            start,
            end: output.len(),
            operator: operator.as_str().to_string(),
            text: replacement,
        });
        cursor = entity.end;
    }
    output.push_str(&text[cursor..]);

    tracing::debug!("Anonymized {} entities", items.len());
    Ok(AnonymizedText {
        text: output,
        items,
    })
}

/// Keep the highest scoring result among overlapping ones (longer span on ties),
/// returned in text order
fn resolve_overlaps(results: &[PiiEntity]) -> Vec<&PiiEntity> {
    let mut ranked: Vec<&PiiEntity> = results.iter().filter(|r| !r.is_empty()).collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.len().cmp(&a.len()))
            .then(a.start.cmp(&b.start))
    });

    let mut kept: Vec<&PiiEntity> = Vec::with_capacity(ranked.len());
    for candidate in ranked {
        if !kept.iter().any(|k| k.overlaps(candidate)) {
            kept.push(candidate);
        }
    }
    kept.sort_by_key(|e| e.start);
    kept
}
