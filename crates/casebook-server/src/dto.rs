use casebook_core::{CaseStatus, LegalEntity, PiiEntity};
use casebook_nlp::{AnalyzeOptions, ExtractedDate, LegalServiceInfo};
use serde::{Deserialize, Serialize};

// === NLP ===

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct LegalAnalyzeResponse {
    pub entities: Vec<LegalEntity>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct DatesResponse {
    pub dates: Vec<ExtractedDate>,
}

#[derive(Debug, Deserialize)]
pub struct PiiAnalyzeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub options: AnalyzeOptions,
}

#[derive(Debug, Deserialize)]
pub struct AnonymizeRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub analyzer_results: Vec<PiiEntity>,
    #[serde(default)]
    pub anonymizers: Option<serde_json::Value>,
}

// === Service ===

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub recognizers: Vec<&'static str>,
    pub pii_entities: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct PiiCapabilities {
    pub supported_entities: Vec<&'static str>,
    pub languages: Vec<&'static str>,
    pub anonymizers: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub legal: LegalServiceInfo,
    pub pii: PiiCapabilities,
}

#[derive(Debug, Serialize)]
pub struct DependencyStatus {
    pub url: String,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub pdf_service: DependencyStatus,
    pub ollama: DependencyStatus,
    pub ocr_enabled: bool,
    pub analysis_fallback: bool,
    pub jobs: usize,
}

// === Cases ===

#[derive(Debug, Deserialize)]
pub struct UpdateCaseRequest {
    pub status: CaseStatus,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: String,
    pub case_id: String,
    pub documents: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub cancelled: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub using_fallback: bool,
}
