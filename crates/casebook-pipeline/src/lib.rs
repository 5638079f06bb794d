pub mod analysis;
pub mod builder;
pub mod compliance;
pub mod extract;
pub mod ocr;
pub mod ollama;
pub mod runner;

pub use analysis::{
    AnalysisInput, AnalysisOutcome, AnalysisReport, AnalysisService, AnalysisSource, CaseAnalyzer,
    KeyDate, OllamaAnalyzer, RuleBasedAnalyzer,
};
pub use builder::{split_sentences, ChronologyBuilder};
pub use compliance::ComplianceChecker;
pub use extract::{PdfServiceClient, PlainTextExtractor, ServiceHealth, TextExtractor};
pub use ocr::{OcrEngine, TesseractOcr};
pub use ollama::OllamaClient;
pub use runner::{DocumentInput, IngestPipeline, IngestSummary, PipelineEvent, Stage};
