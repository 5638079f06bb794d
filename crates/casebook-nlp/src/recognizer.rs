use std::sync::Arc;

use regex::Regex;

/// A span found by a recognizer. Offsets are byte offsets into the analysed text.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizerResult {
    pub entity_type: &'static str,
    pub start: usize,
    pub end: usize,
    pub score: f32,
}

pub trait Recognizer: Send + Sync {
    fn name(&self) -> &str;

    fn supported_entities(&self) -> Vec<&'static str>;

    fn analyze(&self, text: &str) -> Vec<RecognizerResult>;
}

struct Pattern {
    regex: Regex,
    score: f32,
}

/// Regex-driven recognizer for a single entity type, with an optional validator
/// that rejects matches failing a checksum or format rule.
pub struct PatternRecognizer {
    name: &'static str,
    entity_type: &'static str,
    patterns: Vec<Pattern>,
    validator: Option<fn(&str) -> bool>,
}

impl PatternRecognizer {
    pub fn new(name: &'static str, entity_type: &'static str) -> Self {
        Self {
            name,
            entity_type,
            patterns: Vec::new(),
            validator: None,
        }
    }

    /// Add a pattern. Patterns are compile-time constants, so an invalid one is a bug.
    pub fn pattern(mut self, pattern: &str, score: f32) -> Self {
        let regex = Regex::new(pattern).expect("invalid recognizer pattern");
        self.patterns.push(Pattern { regex, score });
        self
    }

    pub fn validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl Recognizer for PatternRecognizer {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_entities(&self) -> Vec<&'static str> {
        vec![self.entity_type]
    }

    fn analyze(&self, text: &str) -> Vec<RecognizerResult> {
        let mut results = Vec::new();
        for pattern in &self.patterns {
            for m in pattern.regex.find_iter(text) {
                if let Some(validate) = self.validator {
                    if !validate(m.as_str()) {
                        continue;
                    }
                }
                results.push(RecognizerResult {
                    entity_type: self.entity_type,
                    start: m.start(),
                    end: m.end(),
                    score: pattern.score,
                });
            }
        }
        results
    }
}

pub struct RecognizerRegistry {
    recognizers: Vec<Arc<dyn Recognizer>>,
}

impl RecognizerRegistry {
    pub fn new() -> Self {
        Self {
            recognizers: Vec::new(),
        }
    }

    pub fn register(&mut self, recognizer: Arc<dyn Recognizer>) {
        self.recognizers.push(recognizer);
    }

    pub fn len(&self) -> usize {
        self.recognizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognizers.is_empty()
    }

    /// All entity types any registered recognizer can produce, in registration order
    pub fn supported_entities(&self) -> Vec<&'static str> {
        let mut entities: Vec<&'static str> = Vec::new();
        for r in &self.recognizers {
            for e in r.supported_entities() {
                if !entities.contains(&e) {
                    entities.push(e);
                }
            }
        }
        entities
    }

    /// Run every recognizer whose entities intersect `entities` (all when `None`),
    /// returning results sorted by start offset, longer spans first.
    pub fn analyze(&self, text: &str, entities: Option<&[String]>) -> Vec<RecognizerResult> {
        let wanted = |e: &str| entities.map_or(true, |list| list.iter().any(|w| w == e));

        let mut results: Vec<RecognizerResult> = self
            .recognizers
            .iter()
            .filter(|r| r.supported_entities().iter().any(|e| wanted(*e)))
            .flat_map(|r| r.analyze(text))
            .filter(|r| wanted(r.entity_type))
            .collect();

        results.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        results
    }
}

impl Default for RecognizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digits_only(s: &str) -> bool {
        s.chars().all(|c| c.is_ascii_digit())
    }

    #[test]
    fn test_validator_rejects_matches() {
        let recognizer = PatternRecognizer::new("numbers", "NUMBER")
            .pattern(r"\b[0-9A-F]{4}\b", 0.5)
            .validator(digits_only);

        let results = recognizer.analyze("1234 ABCD 5678");
        assert_eq!(results.len(), 2);
        assert_eq!((results[0].start, results[0].end), (0, 4));
        assert_eq!((results[1].start, results[1].end), (10, 14));
    }

    #[test]
    fn test_registry_filters_entities() {
        let mut registry = RecognizerRegistry::new();
        registry.register(Arc::new(
            PatternRecognizer::new("roles", "LEGAL_ROLE").pattern(r"\bJudge\b", 0.85),
        ));
        registry.register(Arc::new(
            PatternRecognizer::new("numbers", "NUMBER").pattern(r"\d+", 0.5),
        ));

        let text = "Judge 12";
        assert_eq!(registry.analyze(text, None).len(), 2);

        let only = vec!["NUMBER".to_string()];
        let results = registry.analyze(text, Some(only.as_slice()));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_type, "NUMBER");
        assert_eq!(registry.supported_entities(), vec!["LEGAL_ROLE", "NUMBER"]);
    }
}
