//! Batch ingest of documents into a case.
//!
//! Each document goes through extraction (with OCR fallback), legal entity, date
//! and PII analysis, and chronology building. Progress is reported over an mpsc
//! channel. Nothing is written to the store until the whole batch has run, so a
//! cancelled batch leaves the case untouched.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use casebook_core::{
    CasebookConfig, CasebookError, ChronologyEvent, DocumentKind, DocumentStatus, ExtractionMethod,
    ExtractionResult, Result, ScannedDocument,
};
use casebook_nlp::{extract_dates, AnalyzeOptions, LegalEntityRecognizer, PiiAnalyzer};
use casebook_store::CaseStore;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::builder::ChronologyBuilder;
use crate::extract::{PdfServiceClient, PlainTextExtractor, TextExtractor};
use crate::ocr::{OcrEngine, TesseractOcr};

#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extracting,
    Ocr,
    Entities,
    Dates,
    Pii,
    Building,
}

impl Stage {
    /// Share of one document's work completed when this stage starts
    fn offset(&self) -> f32 {
        match self {
            Stage::Extracting => 0.0,
            Stage::Ocr => 0.3,
            Stage::Entities => 0.6,
            Stage::Dates => 0.7,
            Stage::Pii => 0.8,
            Stage::Building => 0.9,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub case_id: String,
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub events_added: usize,
    pub total_documents: usize,
    pub total_events: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Started { case_id: String, total: usize },
    DocumentStarted { file_name: String, current: usize, total: usize },
    Stage { file_name: String, stage: Stage, progress: u8 },
    OcrFallback { file_name: String, reason: String },
    DocumentSkipped { file_name: String, reason: String },
    DocumentFailed { file_name: String, error: String },
    DocumentComplete { file_name: String, status: DocumentStatus, event_count: usize, progress: u8 },
    Done { summary: IngestSummary },
    Cancelled,
    Error { message: String },
}

/// Overall batch progress in percent
fn percent(done: usize, fraction: f32, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let value = (done as f32 + fraction) * 100.0 / total as f32;
    value.round().clamp(0.0, 100.0) as u8
}

async fn cancellable<T>(cancel: &CancellationToken, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(CasebookError::Cancelled),
        result = fut => result,
    }
}

struct Extracted {
    result: ExtractionResult,
    method: ExtractionMethod,
}

pub struct IngestPipeline {
    store: Arc<CaseStore>,
    extractors: Vec<Arc<dyn TextExtractor>>,
    ocr: Option<Arc<dyn OcrEngine>>,
    legal: Arc<LegalEntityRecognizer>,
    pii: Arc<PiiAnalyzer>,
    builder: ChronologyBuilder,
    min_text_chars: usize,
}

impl IngestPipeline {
    /// Plain text extraction only, no OCR
    pub fn new(store: Arc<CaseStore>) -> Self {
        Self {
            store,
            extractors: vec![Arc::new(PlainTextExtractor)],
            ocr: None,
            legal: Arc::new(LegalEntityRecognizer::new()),
            pii: Arc::new(PiiAnalyzer::new()),
            builder: ChronologyBuilder::default(),
            min_text_chars: 50,
        }
    }

    pub fn from_config(store: Arc<CaseStore>, config: &CasebookConfig) -> Result<Self> {
        let pdf = PdfServiceClient::from_config(&config.extraction)?;
        let mut pipeline = Self::new(store)
            .with_extractor(Arc::new(pdf))
            .with_min_text_chars(config.extraction.min_text_chars);

        if config.extraction.ocr_enabled {
            pipeline = pipeline.with_ocr(Arc::new(TesseractOcr::from_config(&config.extraction)));
        }
        Ok(pipeline)
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn OcrEngine>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    pub fn with_recognizers(mut self, legal: Arc<LegalEntityRecognizer>, pii: Arc<PiiAnalyzer>) -> Self {
        self.legal = legal;
        self.pii = pii;
        self
    }

    pub fn with_min_text_chars(mut self, min_text_chars: usize) -> Self {
        self.min_text_chars = min_text_chars;
        self
    }

    pub fn store(&self) -> &Arc<CaseStore> {
        &self.store
    }

    pub async fn run(
        &self,
        case_id: &str,
        documents: Vec<DocumentInput>,
        cancel: CancellationToken,
        tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<IngestSummary> {
        let (existing, events_before) = match self.case_snapshot(case_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                let _ = tx.send(PipelineEvent::Error { message: e.to_string() }).await;
                return Err(e);
            }
        };

        let total = documents.len();
        let _ = tx
            .send(PipelineEvent::Started {
                case_id: case_id.to_string(),
                total,
            })
            .await;

        let mut seen: HashSet<String> = existing;
        let mut scanned = Vec::new();
        let mut events = Vec::new();
        let mut summary = IngestSummary {
            case_id: case_id.to_string(),
            ..Default::default()
        };

        for (idx, doc) in documents.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return self.cancelled(&tx).await;
            }

            if !seen.insert(doc.file_name.clone()) {
                summary.skipped += 1;
                let _ = tx
                    .send(PipelineEvent::DocumentSkipped {
                        file_name: doc.file_name,
                        reason: "A document with this name is already in the case".to_string(),
                    })
                    .await;
                continue;
            }

            let _ = tx
                .send(PipelineEvent::DocumentStarted {
                    file_name: doc.file_name.clone(),
                    current: idx + 1,
                    total,
                })
                .await;

            let progress = |stage: Stage| percent(idx, stage.offset(), total);
            let (record, doc_events) = match self.process_document(&doc, &cancel, &tx, &progress).await {
                Ok(processed) => processed,
                Err(CasebookError::Cancelled) => return self.cancelled(&tx).await,
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", doc.file_name, e);
                    let _ = tx
                        .send(PipelineEvent::DocumentFailed {
                            file_name: doc.file_name.clone(),
                            error: e.to_string(),
                        })
                        .await;
                    let mut record = ScannedDocument::pending(&doc.file_name, doc.bytes.len() as u64);
                    record.fail(e.to_string());
                    (record, Vec::new())
                }
            };

            match record.status {
                DocumentStatus::Processed => summary.processed += 1,
                DocumentStatus::Failed => summary.failed += 1,
            }
            let _ = tx
                .send(PipelineEvent::DocumentComplete {
                    file_name: record.file_name.clone(),
                    status: record.status,
                    event_count: record.event_count,
                    progress: percent(idx + 1, 0.0, total),
                })
                .await;

            scanned.push(record);
            events.extend(doc_events);
        }

        if cancel.is_cancelled() {
            return self.cancelled(&tx).await;
        }

        let (stored_docs, stored_events) = match self.store.merge_ingest(case_id, scanned, events) {
            Ok(merged) => merged,
            Err(e) => {
                let e = CasebookError::from(e);
                let _ = tx.send(PipelineEvent::Error { message: e.to_string() }).await;
                return Err(e);
            }
        };

        summary.total_documents = stored_docs.len();
        summary.total_events = stored_events.len();
        summary.events_added = stored_events.len().saturating_sub(events_before);

        tracing::info!(
            "Ingest for {}: {} processed, {} failed, {} skipped, {} new events",
            case_id,
            summary.processed,
            summary.failed,
            summary.skipped,
            summary.events_added
        );
        let _ = tx
            .send(PipelineEvent::Done {
                summary: summary.clone(),
            })
            .await;
        Ok(summary)
    }

    async fn cancelled(&self, tx: &mpsc::Sender<PipelineEvent>) -> Result<IngestSummary> {
        tracing::info!("Ingest cancelled, nothing saved");
        let _ = tx.send(PipelineEvent::Cancelled).await;
        Err(CasebookError::Cancelled)
    }

    /// Stored file names and chronology length for the case
    fn case_snapshot(&self, case_id: &str) -> Result<(HashSet<String>, usize)> {
        self.store.require_case(case_id)?;
        let names = self
            .store
            .documents(case_id)?
            .into_iter()
            .map(|d| d.file_name)
            .collect();
        let events = self.store.chronology(case_id)?.len();
        Ok((names, events))
    }

    async fn process_document<P>(
        &self,
        doc: &DocumentInput,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<PipelineEvent>,
        progress: &P,
    ) -> Result<(ScannedDocument, Vec<ChronologyEvent>)>
    where
        P: Fn(Stage) -> u8,
    {
        let stage = |stage: Stage| PipelineEvent::Stage {
            file_name: doc.file_name.clone(),
            stage,
            progress: progress(stage),
        };

        let mut record = ScannedDocument::pending(&doc.file_name, doc.bytes.len() as u64);
        if record.kind == DocumentKind::Unsupported {
            return Err(CasebookError::InvalidInput(format!(
                "Unsupported file type: {}",
                doc.file_name
            )));
        }

        let _ = tx.send(stage(Stage::Extracting)).await;
        let extracted = self.extract_text(doc, record.kind, cancel, tx, &stage).await?;
        record.page_count = Some(extracted.result.page_count().max(1));
        let text = extracted.result.text;
        record.extraction_method = Some(extracted.method);

        if cancel.is_cancelled() {
            return Err(CasebookError::Cancelled);
        }
        let _ = tx.send(stage(Stage::Entities)).await;
        let entities = self.legal.analyze(&text);

        let _ = tx.send(stage(Stage::Dates)).await;
        let dates = extract_dates(&text);

        if cancel.is_cancelled() {
            return Err(CasebookError::Cancelled);
        }
        let _ = tx.send(stage(Stage::Pii)).await;
        let pii = self.pii.analyze(&text, &AnalyzeOptions::default())?;
        let mut pii_summary = BTreeMap::new();
        for entity in &pii {
            *pii_summary.entry(entity.entity_type.clone()).or_insert(0) += 1;
        }

        let _ = tx.send(stage(Stage::Building)).await;
        let events = self.builder.build(&doc.file_name, &text, &entities, &dates);

        record.text_length = text.chars().count();
        record.date_count = dates.len();
        record.event_count = events.len();
        record.pii_summary = pii_summary;
        record.text = text;

        tracing::debug!(
            "{}: {} chars, {} entities, {} dates, {} events",
            record.file_name,
            record.text_length,
            entities.len(),
            record.date_count,
            record.event_count
        );
        Ok((record, events))
    }

    async fn extract_text<S>(
        &self,
        doc: &DocumentInput,
        kind: DocumentKind,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<PipelineEvent>,
        stage: &S,
    ) -> Result<Extracted>
    where
        S: Fn(Stage) -> PipelineEvent,
    {
        let extractor = self.extractors.iter().find(|e| e.supports(kind));

        let attempt = match extractor {
            Some(extractor) => Some(cancellable(cancel, extractor.extract(&doc.file_name, &doc.bytes)).await),
            None => None,
        };

        let reason = match attempt {
            Some(Ok(result)) if kind != DocumentKind::Pdf => {
                return Ok(Extracted {
                    result,
                    method: ExtractionMethod::PlainText,
                })
            }
            Some(Ok(result)) if result.meaningful_chars() >= self.min_text_chars => {
                return Ok(Extracted {
                    result,
                    method: ExtractionMethod::PdfService,
                })
            }
            Some(Err(CasebookError::Cancelled)) => return Err(CasebookError::Cancelled),
            Some(Ok(result)) => {
                let reason = format!(
                    "Only {} characters of text extracted, treating as a scan",
                    result.meaningful_chars()
                );
                match &self.ocr {
                    Some(_) => reason,
                    None => {
                        return Ok(Extracted {
                            result,
                            method: ExtractionMethod::PdfService,
                        })
                    }
                }
            }
            Some(Err(e)) => match &self.ocr {
                Some(_) => format!("Text extraction failed: {}", e),
                None => return Err(e),
            },
            None => match kind {
                DocumentKind::Image => "Image documents are always OCR'd".to_string(),
                _ => format!("No extractor available for {} documents", kind.label()),
            },
        };

        let Some(ocr) = &self.ocr else {
            return Err(CasebookError::Extraction(format!("{}, and OCR is disabled", reason)));
        };

        tracing::info!("OCR fallback for {}: {}", doc.file_name, reason);
        let _ = tx
            .send(PipelineEvent::OcrFallback {
                file_name: doc.file_name.clone(),
                reason,
            })
            .await;
        let _ = tx.send(stage(Stage::Ocr)).await;

        let result = cancellable(cancel, ocr.recognize(&doc.file_name, kind, &doc.bytes)).await?;
        Ok(Extracted {
            result,
            method: ExtractionMethod::Ocr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use casebook_core::extraction::PageLayout;
    use casebook_core::NewCase;
    use casebook_store::StateKind;
    use pretty_assertions::assert_eq;

    /// Stands in for the PDF service: returns the bytes as text, or fails
    struct FakePdfExtractor {
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl TextExtractor for FakePdfExtractor {
        fn name(&self) -> &str {
            "fake_pdf"
        }

        fn supports(&self, kind: DocumentKind) -> bool {
            kind == DocumentKind::Pdf
        }

        async fn extract(&self, _file_name: &str, bytes: &[u8]) -> Result<ExtractionResult> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(CasebookError::Extraction("corrupt PDF".to_string()));
            }
            Ok(ExtractionResult::from_text(
                String::from_utf8_lossy(bytes).into_owned(),
                2,
                "fake",
            ))
        }
    }

    struct FakeOcr {
        text: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        fn name(&self) -> &str {
            "fake_ocr"
        }

        async fn recognize(&self, _file_name: &str, _kind: DocumentKind, _bytes: &[u8]) -> Result<ExtractionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExtractionResult::from_text(self.text.clone(), 1, "ocr"))
        }
    }

    const STATEMENT: &str = "The defendant was arrested on 10 January 2023. \
        A hearing at the Crown Court at Southwark was listed for 15 March 2024.";

    fn setup() -> (Arc<CaseStore>, String) {
        let store = Arc::new(CaseStore::open_in_memory().unwrap());
        let case = store
            .create_case(NewCase {
                reference: "SWK2024/0117".to_string(),
                title: "R v Patel".to_string(),
                client: "A Patel".to_string(),
            })
            .unwrap();
        (store, case.id)
    }

    fn fake_ocr(text: &str) -> Arc<FakeOcr> {
        Arc::new(FakeOcr {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    async fn run(
        pipeline: &IngestPipeline,
        case_id: &str,
        docs: Vec<DocumentInput>,
    ) -> (Result<IngestSummary>, Vec<PipelineEvent>) {
        let (tx, mut rx) = mpsc::channel(256);
        let result = pipeline.run(case_id, docs, CancellationToken::new(), tx).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (result, events)
    }

    #[tokio::test]
    async fn test_text_documents_build_chronology() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone());

        let (result, events) = run(
            &pipeline,
            &case_id,
            vec![DocumentInput::new("statement.txt", STATEMENT)],
        )
        .await;
        let summary = result.unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.events_added, 2);
        assert!(matches!(events.first(), Some(PipelineEvent::Started { total: 1, .. })));
        assert!(matches!(events.last(), Some(PipelineEvent::Done { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::DocumentComplete { progress: 100, event_count: 2, .. }
        )));

        let docs = store.documents(&case_id).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].extraction_method, Some(ExtractionMethod::PlainText));
        assert_eq!(docs[0].date_count, 2);

        let chronology = store.chronology(&case_id).unwrap();
        assert_eq!(chronology[0].date.to_string(), "2023-01-10");
        assert_eq!(chronology[1].date.to_string(), "2024-03-15");
    }

    #[tokio::test]
    async fn test_duplicates_skipped_and_reingest_is_idempotent() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone());

        let (first, _) = run(
            &pipeline,
            &case_id,
            vec![
                DocumentInput::new("statement.txt", STATEMENT),
                DocumentInput::new("statement.txt", "Different text on 1 May 2023."),
            ],
        )
        .await;
        assert_eq!(first.unwrap().skipped, 1);

        let (second, events) = run(
            &pipeline,
            &case_id,
            vec![DocumentInput::new("statement.txt", STATEMENT)],
        )
        .await;
        let second = second.unwrap();
        assert_eq!(second.skipped, 1);
        assert_eq!(second.events_added, 0);
        assert_eq!(second.total_events, 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, PipelineEvent::DocumentSkipped { .. })));
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_batch() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone()).with_extractor(Arc::new(FakePdfExtractor {
            fail: true,
            delay: Duration::ZERO,
        }));

        let (result, events) = run(
            &pipeline,
            &case_id,
            vec![
                DocumentInput::new("bundle.pdf", "%PDF-1.4"),
                DocumentInput::new("bundle.docx", "binary"),
                DocumentInput::new("statement.txt", STATEMENT),
            ],
        )
        .await;
        let summary = result.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 2);

        let failures: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::DocumentFailed { file_name, .. } => Some(file_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec!["bundle.pdf", "bundle.docx"]);

        let docs = store.documents(&case_id).unwrap();
        assert_eq!(docs.len(), 3);
        assert!(docs[0].is_failed());
        assert_eq!(docs[0].error.as_deref(), Some("Extraction failed: corrupt PDF"));
    }

    #[tokio::test]
    async fn test_ocr_fallback_for_short_pdf_text() {
        let (store, case_id) = setup();
        let ocr = fake_ocr(STATEMENT);
        let pipeline = IngestPipeline::new(store.clone())
            .with_extractor(Arc::new(FakePdfExtractor {
                fail: false,
                delay: Duration::ZERO,
            }))
            .with_ocr(ocr.clone());

        let (result, events) = run(
            &pipeline,
            &case_id,
            vec![
                DocumentInput::new("scan.pdf", "   "),
                DocumentInput::new("typed.pdf", STATEMENT),
                DocumentInput::new("photo.jpg", vec![0xff, 0xd8]),
            ],
        )
        .await;
        assert_eq!(result.unwrap().processed, 3);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 2);

        let fallbacks: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::OcrFallback { file_name, .. } => Some(file_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(fallbacks, vec!["scan.pdf", "photo.jpg"]);

        let methods: Vec<Option<ExtractionMethod>> = store
            .documents(&case_id)
            .unwrap()
            .iter()
            .map(|d| d.extraction_method)
            .collect();
        assert_eq!(
            methods,
            vec![
                Some(ExtractionMethod::Ocr),
                Some(ExtractionMethod::PdfService),
                Some(ExtractionMethod::Ocr)
            ]
        );
    }

    #[tokio::test]
    async fn test_extraction_error_stands_without_ocr() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone());

        let (result, _) = run(
            &pipeline,
            &case_id,
            vec![DocumentInput::new("photo.png", vec![0x89, b'P', b'N', b'G'])],
        )
        .await;
        assert_eq!(result.unwrap().failed, 1);
        let docs = store.documents(&case_id).unwrap();
        assert!(docs[0].error.as_deref().unwrap().contains("OCR is disabled"));
    }

    #[tokio::test]
    async fn test_pii_summary_recorded() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone());
        let text = "Letter sent on 3 April 2024 to jane.doe@example.com.";

        run(&pipeline, &case_id, vec![DocumentInput::new("letter.txt", text)]).await.0.unwrap();

        let docs = store.documents(&case_id).unwrap();
        assert_eq!(docs[0].pii_summary.get("EMAIL_ADDRESS"), Some(&1));
    }

    #[tokio::test]
    async fn test_cancel_mid_extraction_saves_nothing() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone()).with_extractor(Arc::new(FakePdfExtractor {
            fail: false,
            delay: Duration::from_secs(30),
        }));

        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel(256);
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = pipeline
            .run(
                &case_id,
                vec![
                    DocumentInput::new("statement.txt", STATEMENT),
                    DocumentInput::new("bundle.pdf", STATEMENT),
                ],
                cancel,
                tx,
            )
            .await;
        assert!(matches!(result, Err(CasebookError::Cancelled)));

        let mut last = None;
        while let Ok(event) = rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(PipelineEvent::Cancelled)));
        assert!(store.documents(&case_id).unwrap().is_empty());
        assert!(store.chronology(&case_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_case_is_error() {
        let (store, _) = setup();
        let pipeline = IngestPipeline::new(store);
        let (result, events) = run(&pipeline, "missing", vec![]).await;
        assert!(matches!(result, Err(CasebookError::NotFound(_))));
        assert!(matches!(events.as_slice(), [PipelineEvent::Error { .. }]));
    }

    #[tokio::test]
    async fn test_unreadable_chronology_reports_error() {
        let (store, case_id) = setup();
        store
            .put_state(&case_id, StateKind::Chronology, &serde_json::json!("not a list"))
            .unwrap();
        let pipeline = IngestPipeline::new(store);

        let (result, events) =
            run(&pipeline, &case_id, vec![DocumentInput::new("statement.txt", STATEMENT)]).await;
        assert!(result.is_err());
        assert!(matches!(events.as_slice(), [PipelineEvent::Error { .. }]));
    }

    struct LayoutOnlyExtractor;

    #[async_trait]
    impl TextExtractor for LayoutOnlyExtractor {
        fn name(&self) -> &str {
            "layout_only"
        }

        fn supports(&self, kind: DocumentKind) -> bool {
            kind == DocumentKind::Pdf
        }

        async fn extract(&self, _file_name: &str, bytes: &[u8]) -> Result<ExtractionResult> {
            let mut result = ExtractionResult::from_text(String::from_utf8_lossy(bytes).into_owned(), 0, "service");
            result.layout.pages = (1..=3)
                .map(|n| PageLayout {
                    page_number: n,
                    width: 595.0,
                    height: 842.0,
                    elements: Vec::new(),
                })
                .collect();
            Ok(result)
        }
    }

    #[tokio::test]
    async fn test_page_count_falls_back_to_layout() {
        let (store, case_id) = setup();
        let pipeline = IngestPipeline::new(store.clone()).with_extractor(Arc::new(LayoutOnlyExtractor));

        let (result, _) = run(&pipeline, &case_id, vec![DocumentInput::new("bundle.pdf", STATEMENT)]).await;
        result.unwrap();

        let docs = store.documents(&case_id).unwrap();
        assert_eq!(docs[0].page_count, Some(3));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0.0, 4), 0);
        assert_eq!(percent(1, 0.5, 4), 38);
        assert_eq!(percent(4, 0.0, 4), 100);
        assert_eq!(percent(0, 0.0, 0), 100);
    }
}
