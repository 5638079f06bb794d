//! Case analysis with an AI primary and a rule-based fallback.
//!
//! The primary analyzer is raced against a timeout. When it times out or fails, the
//! service switches to the fallback and retries once with it. The switch is sticky:
//! later requests go straight to the fallback until [`AnalysisService::reset`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casebook_core::config::AnalysisConfig;
use casebook_core::{
    now_millis, Case, CasebookError, ChronologyEvent, EventCategory, Result, ScannedDocument,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ollama::OllamaClient;

/// Characters of document text included in the AI prompt, per document
const PROMPT_EXCERPT_CHARS: usize = 2_000;
const PROMPT_MAX_EVENTS: usize = 40;

const ISSUE_KEYWORDS: &[(&str, &str)] = &[
    ("confiscation", "Confiscation proceedings"),
    ("restraint", "Restraint order in place"),
    ("proceeds of crime", "Proceeds of Crime Act issues"),
    ("money laundering", "Money laundering allegations"),
    ("disclosure", "Disclosure obligations"),
    ("abuse of process", "Possible abuse of process argument"),
    ("bail", "Bail conditions"),
    ("adjourn", "Adjournments affecting the timetable"),
    ("hearsay", "Hearsay evidence"),
    ("expert", "Expert evidence"),
    ("limitation", "Limitation period"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisSource {
    Ai,
    RuleBased,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDate {
    pub date: NaiveDate,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub case_id: String,
    pub summary: String,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub key_dates: Vec<KeyDate>,
    #[serde(default)]
    pub issues: Vec<String>,
    pub source: AnalysisSource,
    #[serde(default)]
    pub model: Option<String>,
    pub generated_at: i64,
}

/// Everything an analyzer may look at for one case
#[derive(Debug, Clone)]
pub struct AnalysisInput {
    pub case: Case,
    pub documents: Vec<ScannedDocument>,
    pub chronology: Vec<ChronologyEvent>,
}

#[async_trait]
pub trait CaseAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport>;
}

// Ollama

const SYSTEM_PROMPT: &str = "You are a legal case analyst working for a UK criminal defence practice. \
Read the case material and reply with a single JSON object with the keys \
\"summary\" (string), \"parties\" (array of strings), \
\"key_dates\" (array of objects with \"date\" in YYYY-MM-DD format and \"description\"), \
and \"issues\" (array of strings). Do not include any other text.";

#[derive(Debug, Deserialize)]
struct AiAnalysis {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    parties: Vec<String>,
    #[serde(default)]
    key_dates: Vec<AiKeyDate>,
    #[serde(default)]
    issues: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AiKeyDate {
    date: String,
    #[serde(default)]
    description: String,
}

pub struct OllamaAnalyzer {
    client: OllamaClient,
    model: String,
}

impl OllamaAnalyzer {
    pub fn new(client: OllamaClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(OllamaClient::new(&config.ollama_host), &config.model)
    }

    fn build_prompt(input: &AnalysisInput) -> String {
        let mut prompt = format!(
            "Case {}: {}\nClient: {}\n\nChronology:\n",
            input.case.reference, input.case.title, input.case.client
        );
        for event in input.chronology.iter().take(PROMPT_MAX_EVENTS) {
            prompt.push_str(&format!("- {} [{}] {}\n", event.date, event.category.label(), event.description));
        }

        prompt.push_str("\nDocuments:\n");
        for doc in input.documents.iter().filter(|d| !d.is_failed()) {
            let excerpt: String = doc.text.chars().take(PROMPT_EXCERPT_CHARS).collect();
            prompt.push_str(&format!("## {}\n{}\n\n", doc.file_name, excerpt));
        }
        prompt
    }
}

/// Parse the model reply, tolerating a fenced code block around the JSON
fn parse_ai_reply(content: &str) -> Result<AiAnalysis> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    serde_json::from_str(json)
        .map_err(|e| CasebookError::Analysis(format!("Model reply was not valid analysis JSON: {}", e)))
}

#[async_trait]
impl CaseAnalyzer for OllamaAnalyzer {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport> {
        let prompt = Self::build_prompt(input);
        let response = self
            .client
            .chat(&self.model, SYSTEM_PROMPT, &prompt, true)
            .await?;
        let ai = parse_ai_reply(&response.message.content)?;

        let key_dates = ai
            .key_dates
            .into_iter()
            .filter_map(|k| {
                NaiveDate::parse_from_str(&k.date, "%Y-%m-%d")
                    .ok()
                    .map(|date| KeyDate {
                        date,
                        description: k.description,
                    })
            })
            .collect();

        Ok(AnalysisReport {
            case_id: input.case.id.clone(),
            summary: ai.summary,
            parties: ai.parties,
            key_dates,
            issues: ai.issues,
            source: AnalysisSource::Ai,
            model: Some(self.model.clone()),
            generated_at: now_millis(),
        })
    }
}

// Rule based

/// Deterministic analysis from the stored chronology and documents
pub struct RuleBasedAnalyzer {
    max_parties: usize,
    max_key_dates: usize,
}

impl Default for RuleBasedAnalyzer {
    fn default() -> Self {
        Self {
            max_parties: 10,
            max_key_dates: 10,
        }
    }
}

impl RuleBasedAnalyzer {
    pub fn report(&self, input: &AnalysisInput) -> AnalysisReport {
        // Most frequently mentioned people and organisations first
        let mut mentions: BTreeMap<&str, usize> = BTreeMap::new();
        for entity in input.chronology.iter().flat_map(|e| e.entities.iter()) {
            if entity.label == "PERSON" || entity.label == "ORG" {
                *mentions.entry(entity.text.as_str()).or_default() += 1;
            }
        }
        let mut ranked: Vec<(&str, usize)> = mentions.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        let parties: Vec<String> = ranked
            .into_iter()
            .take(self.max_parties)
            .map(|(name, _)| name.to_string())
            .collect();

        let mut key_dates: Vec<KeyDate> = input
            .chronology
            .iter()
            .filter(|e| matches!(e.category, EventCategory::Hearing | EventCategory::Filing))
            .map(|e| KeyDate {
                date: e.date,
                description: e.title.clone(),
            })
            .collect();
        if key_dates.is_empty() {
            key_dates = input
                .chronology
                .iter()
                .map(|e| KeyDate {
                    date: e.date,
                    description: e.title.clone(),
                })
                .collect();
        }
        key_dates.truncate(self.max_key_dates);

        let corpus: String = input
            .documents
            .iter()
            .map(|d| d.text.to_lowercase())
            .chain(input.chronology.iter().map(|e| e.description.to_lowercase()))
            .collect::<Vec<_>>()
            .join("\n");
        let issues: Vec<String> = ISSUE_KEYWORDS
            .iter()
            .filter(|(keyword, _)| corpus.contains(keyword))
            .map(|(_, issue)| issue.to_string())
            .collect();

        let processed = input.documents.iter().filter(|d| !d.is_failed()).count();
        let span = match (input.chronology.first(), input.chronology.last()) {
            (Some(first), Some(last)) => format!(" spanning {} to {}", first.date, last.date),
            _ => String::new(),
        };
        let summary = format!(
            "{} ({}): {} processed document(s), {} chronology event(s){}.",
            input.case.title,
            input.case.reference,
            processed,
            input.chronology.len(),
            span
        );

        AnalysisReport {
            case_id: input.case.id.clone(),
            summary,
            parties,
            key_dates,
            issues,
            source: AnalysisSource::RuleBased,
            model: None,
            generated_at: now_millis(),
        }
    }
}

#[async_trait]
impl CaseAnalyzer for RuleBasedAnalyzer {
    fn name(&self) -> &str {
        "rule_based"
    }

    async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport> {
        Ok(self.report(input))
    }
}

// Service

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub used_fallback: bool,
    /// Why the primary analyzer was abandoned, when it was attempted and failed
    pub primary_error: Option<String>,
}

pub struct AnalysisService {
    primary: Arc<dyn CaseAnalyzer>,
    fallback: Arc<dyn CaseAnalyzer>,
    timeout: Duration,
    use_fallback: AtomicBool,
}

impl AnalysisService {
    pub fn new(primary: Arc<dyn CaseAnalyzer>, fallback: Arc<dyn CaseAnalyzer>, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
            use_fallback: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let service = Self::new(
            Arc::new(OllamaAnalyzer::from_config(config)),
            Arc::new(RuleBasedAnalyzer::default()),
            Duration::from_secs(config.timeout_secs),
        );
        if !config.enabled {
            service.use_fallback.store(true, Ordering::SeqCst);
        }
        service
    }

    pub fn is_using_fallback(&self) -> bool {
        self.use_fallback.load(Ordering::SeqCst)
    }

    /// Clear the fallback flag so the next request tries the primary analyzer again
    pub fn reset(&self) {
        self.use_fallback.store(false, Ordering::SeqCst);
        tracing::info!("Analysis fallback reset, {} will be tried again", self.primary.name());
    }

    pub async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisOutcome> {
        if self.is_using_fallback() {
            let report = self.fallback.analyze(input).await?;
            return Ok(AnalysisOutcome {
                report,
                used_fallback: true,
                primary_error: None,
            });
        }

        let primary_error = match tokio::time::timeout(self.timeout, self.primary.analyze(input)).await {
            Ok(Ok(report)) => {
                return Ok(AnalysisOutcome {
                    report,
                    used_fallback: false,
                    primary_error: None,
                })
            }
            Ok(Err(e)) => e,
            Err(_) => CasebookError::Timeout(self.timeout.as_millis() as u64),
        };

        tracing::warn!(
            "{} analysis failed ({}), retrying with {}",
            self.primary.name(),
            primary_error,
            self.fallback.name()
        );
        self.use_fallback.store(true, Ordering::SeqCst);

        let report = self.fallback.analyze(input).await?;
        Ok(AnalysisOutcome {
            report,
            used_fallback: true,
            primary_error: Some(primary_error.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use casebook_core::{LegalEntity, NewCase};

    struct SlowAnalyzer {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CaseAnalyzer for SlowAnalyzer {
        fn name(&self) -> &str {
            "slow"
        }

        async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            let mut report = RuleBasedAnalyzer::default().report(input);
            report.source = AnalysisSource::Ai;
            Ok(report)
        }
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl CaseAnalyzer for FailingAnalyzer {
        fn name(&self) -> &str {
            "failing"
        }

        async fn analyze(&self, _input: &AnalysisInput) -> Result<AnalysisReport> {
            Err(CasebookError::Analysis("model not loaded".to_string()))
        }
    }

    fn entity(label: &str, text: &str) -> LegalEntity {
        LegalEntity {
            text: text.to_string(),
            label: label.to_string(),
            start: 0,
            end: text.len(),
            confidence: 0.8,
        }
    }

    fn event(date: &str, category: EventCategory, title: &str, entities: Vec<LegalEntity>) -> ChronologyEvent {
        ChronologyEvent {
            id: title.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: None,
            title: title.to_string(),
            description: title.to_string(),
            category,
            source_document: "statement.txt".to_string(),
            entities,
            confidence: 0.9,
        }
    }

    fn input() -> AnalysisInput {
        let case = Case::new(NewCase {
            reference: "SWK2024/0117".to_string(),
            title: "R v Patel".to_string(),
            client: "A Patel".to_string(),
        });
        let mut doc = ScannedDocument::pending("statement.txt", 100);
        doc.text = "The confiscation timetable was set. Disclosure remains outstanding.".to_string();

        AnalysisInput {
            case,
            documents: vec![doc],
            chronology: vec![
                event("2023-01-10", EventCategory::Other, "Arrest", vec![entity("PERSON", "Mr Patel")]),
                event(
                    "2024-03-15",
                    EventCategory::Hearing,
                    "Confiscation hearing",
                    vec![entity("PERSON", "Mr Patel"), entity("ORG", "Barclays Bank")],
                ),
            ],
        }
    }

    #[test]
    fn test_rule_based_report() {
        let report = RuleBasedAnalyzer::default().report(&input());
        assert_eq!(report.source, AnalysisSource::RuleBased);
        assert_eq!(report.parties, vec!["Mr Patel", "Barclays Bank"]);
        assert_eq!(report.key_dates.len(), 1);
        assert_eq!(report.key_dates[0].description, "Confiscation hearing");
        assert_eq!(
            report.issues,
            vec!["Confiscation proceedings", "Disclosure obligations"]
        );
        assert!(report.summary.contains("spanning 2023-01-10 to 2024-03-15"));
    }

    #[test]
    fn test_parse_ai_reply() {
        let fenced = "```json\n{\"summary\": \"s\", \"issues\": [\"bail\"]}\n```";
        let parsed = parse_ai_reply(fenced).unwrap();
        assert_eq!(parsed.summary, "s");
        assert_eq!(parsed.issues, vec!["bail"]);

        assert!(matches!(parse_ai_reply("I cannot help"), Err(CasebookError::Analysis(_))));
    }

    #[tokio::test]
    async fn test_primary_success() {
        let primary = Arc::new(SlowAnalyzer {
            delay: Duration::from_millis(1),
            calls: AtomicUsize::new(0),
        });
        let service = AnalysisService::new(primary, Arc::new(RuleBasedAnalyzer::default()), Duration::from_secs(5));

        let outcome = service.analyze(&input()).await.unwrap();
        assert!(!outcome.used_fallback);
        assert_eq!(outcome.report.source, AnalysisSource::Ai);
        assert!(!service.is_using_fallback());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_switches_to_fallback_until_reset() {
        let primary = Arc::new(SlowAnalyzer {
            delay: Duration::from_secs(60),
            calls: AtomicUsize::new(0),
        });
        let service = AnalysisService::new(
            primary.clone(),
            Arc::new(RuleBasedAnalyzer::default()),
            Duration::from_secs(30),
        );

        let outcome = service.analyze(&input()).await.unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.report.source, AnalysisSource::RuleBased);
        assert_eq!(outcome.primary_error.as_deref(), Some("Timed out after 30000ms"));
        assert!(service.is_using_fallback());

        // Sticky: the primary is not called again
        service.analyze(&input()).await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);

        service.reset();
        assert!(!service.is_using_fallback());
        service.analyze(&input()).await.unwrap();
        assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_retries_once_with_fallback() {
        let service = AnalysisService::new(
            Arc::new(FailingAnalyzer),
            Arc::new(RuleBasedAnalyzer::default()),
            Duration::from_secs(5),
        );
        let outcome = service.analyze(&input()).await.unwrap();
        assert!(outcome.used_fallback);
        assert!(outcome.primary_error.unwrap().contains("model not loaded"));
    }

    #[tokio::test]
    async fn test_fallback_failure_propagates() {
        let service = AnalysisService::new(
            Arc::new(FailingAnalyzer),
            Arc::new(FailingAnalyzer),
            Duration::from_secs(5),
        );
        assert!(matches!(
            service.analyze(&input()).await,
            Err(CasebookError::Analysis(_))
        ));
    }
}
