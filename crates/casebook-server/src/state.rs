use std::sync::Arc;
use std::time::Duration;

use casebook_core::{CasebookConfig, CasebookError};
use casebook_nlp::{LegalEntityRecognizer, PiiAnalyzer};
use casebook_pipeline::{
    AnalysisService, ComplianceChecker, IngestPipeline, OllamaClient, PdfServiceClient,
};
use casebook_store::CaseStore;

use crate::jobs::JobRegistry;

pub struct AppState {
    pub config: CasebookConfig,
    pub store: Arc<CaseStore>,
    pub legal: Arc<LegalEntityRecognizer>,
    pub pii: Arc<PiiAnalyzer>,
    pub pipeline: Arc<IngestPipeline>,
    pub analysis: AnalysisService,
    pub compliance: ComplianceChecker,
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: CasebookConfig) -> anyhow::Result<Self> {
        let store = Arc::new(CaseStore::new(config.storage.db_path.clone()).map_err(CasebookError::from)?);
        let legal = Arc::new(LegalEntityRecognizer::new());
        let pii = Arc::new(PiiAnalyzer::new());

        let pipeline = IngestPipeline::from_config(store.clone(), &config)?
            .with_recognizers(legal.clone(), pii.clone());
        let analysis = AnalysisService::from_config(&config.analysis);

        if !config.extraction.ocr_enabled {
            tracing::warn!("OCR disabled: scanned PDFs and images will fail extraction");
        }
        if !config.analysis.enabled {
            tracing::warn!("AI analysis disabled: using rule-based analysis only");
        }

        Ok(Self {
            config,
            store,
            legal,
            pii,
            pipeline: Arc::new(pipeline),
            analysis,
            compliance: ComplianceChecker,
            jobs: JobRegistry::default(),
        })
    }

    /// In-memory store, plain text ingest and rule-based analysis
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let store = Arc::new(CaseStore::open_in_memory().expect("in-memory store"));
        let legal = Arc::new(LegalEntityRecognizer::new());
        let pii = Arc::new(PiiAnalyzer::new());
        let pipeline = IngestPipeline::new(store.clone()).with_recognizers(legal.clone(), pii.clone());
        let analysis = AnalysisService::new(
            Arc::new(casebook_pipeline::RuleBasedAnalyzer::default()),
            Arc::new(casebook_pipeline::RuleBasedAnalyzer::default()),
            Duration::from_secs(5),
        );

        Self {
            config: CasebookConfig::default(),
            store,
            legal,
            pii,
            pipeline: Arc::new(pipeline),
            analysis,
            compliance: ComplianceChecker,
            jobs: JobRegistry::default(),
        }
    }

    pub fn pdf_service(&self) -> casebook_core::Result<PdfServiceClient> {
        PdfServiceClient::new(
            &self.config.extraction.pdf_service_url,
            Duration::from_secs(5),
        )
    }

    pub fn ollama(&self) -> OllamaClient {
        OllamaClient::new(&self.config.analysis.ollama_host)
    }
}
