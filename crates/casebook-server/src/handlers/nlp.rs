use std::sync::Arc;

use axum::{extract::State, Json};
use casebook_core::PiiEntity;
use casebook_nlp::{anonymize, extract_dates, AnonymizedText, OperatorConfig};

use crate::dto::{AnonymizeRequest, DatesResponse, LegalAnalyzeResponse, PiiAnalyzeRequest, TextRequest};
use crate::error::AppError;
use crate::state::AppState;

fn require_text(text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() {
        return Err(AppError::BadRequest("No text provided".to_string()));
    }
    Ok(())
}

pub async fn legal_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TextRequest>,
) -> Result<Json<LegalAnalyzeResponse>, AppError> {
    require_text(&req.text)?;
    let entities = state.legal.analyze(&req.text);
    Ok(Json(LegalAnalyzeResponse {
        count: entities.len(),
        entities,
    }))
}

pub async fn dates_extract(Json(req): Json<TextRequest>) -> Result<Json<DatesResponse>, AppError> {
    require_text(&req.text)?;
    Ok(Json(DatesResponse {
        dates: extract_dates(&req.text),
    }))
}

pub async fn pii_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PiiAnalyzeRequest>,
) -> Result<Json<Vec<PiiEntity>>, AppError> {
    require_text(&req.text)?;
    let results = state.pii.analyze(&req.text, &req.options)?;
    Ok(Json(results))
}

pub async fn pii_anonymize(Json(req): Json<AnonymizeRequest>) -> Result<Json<AnonymizedText>, AppError> {
    require_text(&req.text)?;
    let operators = match req.anonymizers {
        Some(value) => OperatorConfig::from_json(value)?,
        None => OperatorConfig::default(),
    };
    let result = anonymize(&req.text, &req.analyzer_results, &operators)?;
    Ok(Json(result))
}
