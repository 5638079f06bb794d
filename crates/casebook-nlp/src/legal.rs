//! Legal entity recognition: case numbers, citations, courts, legislation,
//! provisions, roles, people, organisations and dates.

use std::sync::Arc;

use casebook_core::LegalEntity;
use serde::Serialize;

use crate::dates::DateRecognizer;
use crate::recognizer::{PatternRecognizer, RecognizerRegistry};

pub const MODEL_NAME: &str = "casebook-legal-rules";
pub const MODEL_VERSION: &str = "1.0.0";

const HONORIFICS: &str = r"(?:Mr|Mrs|Ms|Miss|Dr|Prof|Sir|Dame|Lord|Lady|HHJ|DJ)";

#[derive(Debug, Clone, Serialize)]
pub struct LegalServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub model: &'static str,
    pub capabilities: Vec<&'static str>,
}

pub struct LegalEntityRecognizer {
    registry: RecognizerRegistry,
}

impl LegalEntityRecognizer {
    pub fn new() -> Self {
        let mut registry = RecognizerRegistry::new();

        registry.register(Arc::new(
            PatternRecognizer::new("case_number", "CASE_NUMBER")
                .pattern(r"\b[A-Z]{2,4}\d{4}/\d+\b", 0.8),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("case_name", "CASE_NAME").pattern(
                r"\b(?:R|[A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+){0,3})\s+v\.?\s+[A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+){0,3}",
                0.8,
            ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("citation", "CITATION")
                .pattern(
                    r"\[\d{4}\]\s+(?:UKSC|UKHL|UKPC|EWCA\s+(?:Civ|Crim)|EWHC|EWFC|UKUT|UKFTT)\s+\d+(?:\s+\((?:QB|KB|Ch|Fam|Admin|Comm|TCC|Pat)\))?",
                    0.9,
                )
                .pattern(
                    r"\[\d{4}\]\s+(?:\d\s+)?(?:AC|QB|KB|Ch|Fam|WLR|All\s?ER|Cr\s?App\s?R)\s+\d+",
                    0.85,
                ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("legal_role", "LEGAL_ROLE").pattern(
                r"\b(?:QC|KC|Solicitor|Barrister|Judge|Recorder|Counsel)\b",
                0.85,
            ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("court", "COURT").pattern(
                r"\b(?:(?:Crown|County|Magistrates'?|High|Supreme|Family|Youth)\s+Court|Court\s+of\s+Appeal|Court\s+of\s+Protection|Employment\s+Tribunal|Upper\s+Tribunal|First-tier\s+Tribunal|Old\s+Bailey)(?:\s+(?:at|in|sitting\s+at)\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)?",
                0.85,
            ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("legislation", "LEGISLATION")
                .pattern(
                    r"\b(?:[A-Z][a-z]+(?:\s+(?:of|and|the|for|to|in)\b)?\s+){1,8}(?:Act|Regulations|Order|Rules)\s+\d{4}\b",
                    0.85,
                )
                .pattern(r"\b(?:POCA|PACE|CPR|CrimPR)\b", 0.75),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("provision", "PROVISION")
                .pattern(r"\b(?:[Ss]ection|[Ss]s?\.)\s?\d+[A-Z]?(?:\([0-9a-z]+\))*", 0.8)
                .pattern(
                    r"\b(?:Schedule|Sch\.|Article|Art\.|[Rr]ule|[Rr]egulation|[Pp]aragraph|para\.)\s?\d+[A-Z]?(?:\([0-9a-z]+\))*",
                    0.75,
                ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("person", "PERSON").pattern(
                &format!(
                    r"\b{}\.?\s+(?:[A-Z]\.\s*)*[A-Z][a-zA-Z'\-]+(?:\s+[A-Z][a-zA-Z'\-]+){{0,2}}",
                    HONORIFICS
                ),
                0.75,
            ),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("organisation", "ORG").pattern(
                r"\b[A-Z][A-Za-z&'\-]*(?:\s+[A-Z][A-Za-z&'\-]*){0,4}\s+(?:Ltd|Limited|LLP|plc|PLC|Bank|Council|Police|Constabulary|Service)\b",
                0.7,
            ),
        ));
        registry.register(Arc::new(DateRecognizer::new("DATE")));

        Self { registry }
    }

    pub fn analyze(&self, text: &str) -> Vec<LegalEntity> {
        let entities: Vec<LegalEntity> = self
            .registry
            .analyze(text, None)
            .into_iter()
            .map(|r| LegalEntity {
                text: text[r.start..r.end].to_string(),
                label: r.entity_type.to_string(),
                start: r.start,
                end: r.end,
                confidence: r.score,
            })
            .collect();

        tracing::debug!("Legal analysis found {} entities", entities.len());
        entities
    }

    pub fn capabilities(&self) -> Vec<&'static str> {
        self.registry.supported_entities()
    }

    pub fn info(&self) -> LegalServiceInfo {
        LegalServiceInfo {
            service: "Casebook Legal Entity Recognition",
            version: MODEL_VERSION,
            model: MODEL_NAME,
            capabilities: self.capabilities(),
        }
    }
}

impl Default for LegalEntityRecognizer {
    fn default() -> Self {
        Self::new()
    }
}
