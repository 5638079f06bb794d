pub mod cases;
pub mod jobs;
pub mod nlp;

use std::sync::Arc;

use axum::{extract::State, Json};
use casebook_nlp::{ANONYMIZER_OPERATORS, DEFAULT_PII_ENTITIES};

use crate::dto::{DependencyStatus, HealthResponse, InfoResponse, PiiCapabilities, StatusResponse};
use crate::state::AppState;

const SERVICE: &str = "casebook";
const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE,
        version: VERSION,
        recognizers: state.legal.capabilities(),
        pii_entities: state.pii.supported_entities(),
    })
}

pub async fn info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: SERVICE,
        version: VERSION,
        legal: state.legal.info(),
        pii: PiiCapabilities {
            supported_entities: DEFAULT_PII_ENTITIES.to_vec(),
            languages: vec!["en"],
            anonymizers: ANONYMIZER_OPERATORS.to_vec(),
        },
    })
}

/// Reachability of the PDF extraction service and Ollama
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let pdf_service = match state.pdf_service() {
        Ok(client) => match client.health().await {
            Ok(health) => DependencyStatus {
                url: client.base_url().to_string(),
                reachable: health.is_healthy(),
                detail: Some(health.status),
            },
            Err(e) => DependencyStatus {
                url: client.base_url().to_string(),
                reachable: false,
                detail: Some(e.to_string()),
            },
        },
        Err(e) => DependencyStatus {
            url: state.config.extraction.pdf_service_url.clone(),
            reachable: false,
            detail: Some(e.to_string()),
        },
    };

    let ollama = state.ollama();
    let ollama = match ollama.list_models().await {
        Ok(models) => DependencyStatus {
            url: ollama.host().to_string(),
            reachable: true,
            detail: Some(format!("{} model(s)", models.len())),
        },
        Err(e) => DependencyStatus {
            url: ollama.host().to_string(),
            reachable: false,
            detail: Some(e.to_string()),
        },
    };

    Json(StatusResponse {
        pdf_service,
        ollama,
        ocr_enabled: state.config.extraction.ocr_enabled,
        analysis_fallback: state.analysis.is_using_fallback(),
        jobs: state.jobs.len(),
    })
}
