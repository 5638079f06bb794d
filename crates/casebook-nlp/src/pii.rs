use std::sync::Arc;

use casebook_core::{CasebookError, PiiEntity, Result};
use serde::{Deserialize, Serialize};

use crate::checksum;
use crate::dates::DateRecognizer;
use crate::recognizer::{PatternRecognizer, RecognizerRegistry};

/// Entities analysed when a request does not name any
pub const DEFAULT_PII_ENTITIES: &[&str] = &[
    "PERSON",
    "EMAIL_ADDRESS",
    "PHONE_NUMBER",
    "CREDIT_CARD",
    "IBAN_CODE",
    "IP_ADDRESS",
    "DATE_TIME",
    "LOCATION",
    "UK_NHS",
    "UK_NINO",
    "US_SSN",
    "US_DRIVER_LICENSE",
];

/// Entity types whose exposure is treated as high risk
pub const SENSITIVE_PII_ENTITIES: &[&str] =
    &["CREDIT_CARD", "IBAN_CODE", "UK_NHS", "UK_NINO", "US_SSN"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeOptions {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub entities: Option<Vec<String>>,
    #[serde(default)]
    pub score_threshold: f32,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            language: default_language(),
            entities: None,
            score_threshold: 0.0,
        }
    }
}

pub struct PiiAnalyzer {
    registry: RecognizerRegistry,
}

impl PiiAnalyzer {
    pub fn new() -> Self {
        let mut registry = RecognizerRegistry::new();

        registry.register(Arc::new(
            PatternRecognizer::new("email", "EMAIL_ADDRESS")
                .pattern(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b", 1.0),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("phone", "PHONE_NUMBER")
                .pattern(r"(?:\+44\s?(?:\(0\)\s?)?|\b0)\d(?:[\s\-]?\d){8,9}\b", 0.7)
                .pattern(r"\(?\b\d{3}\)?[\s.\-]\d{3}[\s.\-]\d{4}\b", 0.5),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("credit_card", "CREDIT_CARD")
                .pattern(r"\b(?:\d[ \-]?){12,18}\d\b", 1.0)
                .validator(checksum::luhn_valid),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("iban", "IBAN_CODE")
                .pattern(r"\b[A-Z]{2}\d{2}(?:\s?[A-Z0-9]{4}){2,7}(?:\s?[A-Z0-9]{1,4})?\b", 1.0)
                .validator(checksum::iban_valid),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("ip_address", "IP_ADDRESS")
                .pattern(r"\b(?:\d{1,3}\.){3}\d{1,3}\b", 0.95)
                .pattern(r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b", 0.95)
                .validator(|s| s.parse::<std::net::IpAddr>().is_ok()),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("nhs", "UK_NHS")
                .pattern(r"\b\d{3}[\s\-]?\d{3}[\s\-]?\d{4}\b", 1.0)
                .validator(checksum::nhs_valid),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("nino", "UK_NINO")
                .pattern(
                    r"\b[A-CEGHJ-PR-TW-Z][A-CEGHJ-NPR-TW-Z]\s?\d{2}\s?\d{2}\s?\d{2}\s?[A-D]\b",
                    0.5,
                )
                .validator(checksum::nino_prefix_valid),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("ssn", "US_SSN")
                .pattern(r"\b\d{3}-\d{2}-\d{4}\b", 0.5)
                .validator(checksum::ssn_valid),
        ));
        // Licence formats vary by state; only the common letter-then-digits shape is matched
        registry.register(Arc::new(
            PatternRecognizer::new("us_driver_license", "US_DRIVER_LICENSE")
                .pattern(r"\b[A-Z]\d{7,12}\b", 0.3),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("uk_postcode", "LOCATION")
                .pattern(r"\b[A-Z]{1,2}\d[A-Z\d]?\s?\d[A-Z]{2}\b", 0.6),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("titled_person", "PERSON").pattern(
                r"\b(?:Mr|Mrs|Ms|Miss|Dr|Prof|Sir|Dame|Lord|Lady)\.?\s+(?:[A-Z]\.\s*)*[A-Z][a-zA-Z'\-]+(?:\s+[A-Z][a-zA-Z'\-]+){0,2}",
                0.85,
            ),
        ));
        registry.register(Arc::new(DateRecognizer::new("DATE_TIME")));

        Self { registry }
    }

    pub fn supported_entities(&self) -> Vec<&'static str> {
        self.registry.supported_entities()
    }

    pub fn analyze(&self, text: &str, options: &AnalyzeOptions) -> Result<Vec<PiiEntity>> {
        if !options.language.eq_ignore_ascii_case("en") {
            return Err(CasebookError::InvalidInput(format!(
                "Unsupported language: {}",
                options.language
            )));
        }

        let requested: Vec<String> = match &options.entities {
            Some(list) => list.clone(),
            None => DEFAULT_PII_ENTITIES.iter().map(|s| s.to_string()).collect(),
        };

        let results: Vec<PiiEntity> = self
            .registry
            .analyze(text, Some(requested.as_slice()))
            .into_iter()
            .filter(|r| r.score >= options.score_threshold)
            .map(|r| PiiEntity {
                entity_type: r.entity_type.to_string(),
                start: r.start,
                end: r.end,
                score: r.score,
            })
            .collect();

        let results = collapse_same_type(results);
        tracing::debug!("PII analysis found {} entities", results.len());
        Ok(results)
    }
}

impl Default for PiiAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop results that duplicate or sit inside a same-type result scoring at least as high
fn collapse_same_type(results: Vec<PiiEntity>) -> Vec<PiiEntity> {
    let mut kept: Vec<PiiEntity> = Vec::with_capacity(results.len());

    let mut ordered = results;
    ordered.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(b.len().cmp(&a.len()))
            .then(a.start.cmp(&b.start))
    });

    for candidate in ordered {
        let shadowed = kept
            .iter()
            .any(|k| k.entity_type == candidate.entity_type && k.contains(&candidate));
        if !shadowed {
            kept.push(candidate);
        }
    }

    kept.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    kept
}

pub fn is_sensitive(entity_type: &str) -> bool {
    SENSITIVE_PII_ENTITIES.contains(&entity_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(text: &str) -> Vec<(String, String)> {
        PiiAnalyzer::new()
            .analyze(text, &AnalyzeOptions::default())
            .unwrap()
            .into_iter()
            .map(|e| (e.entity_type, text[e.start..e.end].to_string()))
            .collect()
    }

    fn of_type(text: &str, entity_type: &str) -> Vec<String> {
        found(text)
            .into_iter()
            .filter(|(t, _)| t == entity_type)
            .map(|(_, s)| s)
            .collect()
    }

    #[test]
    fn test_contact_details() {
        let text = "Contact Mrs Jane Doe at jane.doe@example.co.uk or 07700 900123.";
        assert_eq!(of_type(text, "PERSON"), vec!["Mrs Jane Doe"]);
        assert_eq!(of_type(text, "EMAIL_ADDRESS"), vec!["jane.doe@example.co.uk"]);
        assert_eq!(of_type(text, "PHONE_NUMBER"), vec!["07700 900123"]);
    }

    #[test]
    fn test_validated_identifiers() {
        let text = "Card 4111 1111 1111 1111, bad card 4111 1111 1111 1112, IBAN GB82 WEST 1234 5698 7654 32.";
        assert_eq!(of_type(text, "CREDIT_CARD"), vec!["4111 1111 1111 1111"]);
        assert_eq!(of_type(text, "IBAN_CODE"), vec!["GB82 WEST 1234 5698 7654 32"]);
    }

    #[test]
    fn test_uk_identifiers() {
        let text = "NHS number 943 476 5919, NI number AB 12 34 56 C, postcode SW1A 1AA.";
        assert_eq!(of_type(text, "UK_NHS"), vec!["943 476 5919"]);
        assert_eq!(of_type(text, "UK_NINO"), vec!["AB 12 34 56 C"]);
        assert_eq!(of_type(text, "LOCATION"), vec!["SW1A 1AA"]);
    }

    #[test]
    fn test_driver_license_in_default_entities() {
        let text = "Driving licence D1234567 was produced; reference SWK2024/0117.";
        assert_eq!(of_type(text, "US_DRIVER_LICENSE"), vec!["D1234567"]);
        assert!(PiiAnalyzer::new().supported_entities().contains(&"US_DRIVER_LICENSE"));
    }

    #[test]
    fn test_ip_validation() {
        let text = "Logged from 192.168.0.1 not 999.1.1.1";
        assert_eq!(of_type(text, "IP_ADDRESS"), vec!["192.168.0.1"]);
    }

    #[test]
    fn test_entity_filter_and_threshold() {
        let analyzer = PiiAnalyzer::new();
        let text = "Mr Adams, SSN 123-45-6789, email a@b.com";

        let options = AnalyzeOptions {
            entities: Some(vec!["US_SSN".to_string()]),
            ..Default::default()
        };
        let results = analyzer.analyze(text, &options).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_type, "US_SSN");

        let options = AnalyzeOptions {
            score_threshold: 0.9,
            ..Default::default()
        };
        let types: Vec<String> = analyzer
            .analyze(text, &options)
            .unwrap()
            .into_iter()
            .map(|e| e.entity_type)
            .collect();
        assert_eq!(types, vec!["EMAIL_ADDRESS"]);
    }

    #[test]
    fn test_unsupported_language() {
        let options = AnalyzeOptions {
            language: "de".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            PiiAnalyzer::new().analyze("text", &options),
            Err(CasebookError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_collapse_same_type() {
        let results = vec![
            PiiEntity { entity_type: "PERSON".into(), start: 0, end: 10, score: 0.85 },
            PiiEntity { entity_type: "PERSON".into(), start: 0, end: 10, score: 0.5 },
            PiiEntity { entity_type: "PERSON".into(), start: 3, end: 8, score: 0.6 },
            PiiEntity { entity_type: "LOCATION".into(), start: 3, end: 8, score: 0.6 },
        ];
        let kept = collapse_same_type(results);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.85);
        assert_eq!(kept[1].entity_type, "LOCATION");
    }
}
