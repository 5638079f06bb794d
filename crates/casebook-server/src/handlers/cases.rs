use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use casebook_core::export::records_to_csv;
use casebook_core::{Case, ChronologyEvent, ComplianceReport, NewCase, ScannedDocument};
use casebook_pipeline::{AnalysisInput, AnalysisOutcome};
use casebook_store::StateKind;

use crate::dto::{DeleteResponse, ResetResponse, UpdateCaseRequest};
use crate::error::AppError;
use crate::state::AppState;

fn csv_download(file_name: String, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

fn state_kind(kind: &str) -> Result<StateKind, AppError> {
    StateKind::from_str(kind).ok_or_else(|| AppError::BadRequest(format!("Unknown state kind: {}", kind)))
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Case>>, AppError> {
    Ok(Json(state.store.list_cases()?))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewCase>,
) -> Result<(StatusCode, Json<Case>), AppError> {
    let case = state.store.create_case(req)?;
    tracing::info!("Opened case {} ({})", case.reference, case.id);
    Ok((StatusCode::CREATED, Json(case)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Case>, AppError> {
    Ok(Json(state.store.require_case(&id)?))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCaseRequest>,
) -> Result<Json<Case>, AppError> {
    Ok(Json(state.store.update_case_status(&id, req.status)?))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    if !state.store.delete_case(&id)? {
        return Err(AppError::NotFound(format!("case {}", id)));
    }
    tracing::info!("Deleted case {}", id);
    Ok(Json(DeleteResponse { deleted: true }))
}

pub async fn documents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ScannedDocument>>, AppError> {
    state.store.require_case(&id)?;
    Ok(Json(state.store.documents(&id)?))
}

pub async fn chronology(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChronologyEvent>>, AppError> {
    state.store.require_case(&id)?;
    Ok(Json(state.store.chronology(&id)?))
}

pub async fn chronology_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let case = state.store.require_case(&id)?;
    let events = state.store.chronology(&id)?;
    Ok(csv_download(
        format!("chronology_{}.csv", case.reference.replace('/', "-")),
        records_to_csv(&events),
    ))
}

pub async fn run_compliance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ComplianceReport>, AppError> {
    let case = state.store.require_case(&id)?;
    let documents = state.store.documents(&id)?;
    let chronology = state.store.chronology(&id)?;

    let report = state.compliance.run(&case, &documents, &chronology);
    state.store.save_compliance(&report)?;
    Ok(Json(report))
}

pub async fn get_compliance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ComplianceReport>, AppError> {
    state.store.require_case(&id)?;
    state
        .store
        .compliance(&id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("compliance report for case {}", id)))
}

pub async fn compliance_csv(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let case = state.store.require_case(&id)?;
    let report = state
        .store
        .compliance(&id)?
        .ok_or_else(|| AppError::NotFound(format!("compliance report for case {}", id)))?;
    Ok(csv_download(
        format!("compliance_{}.csv", case.reference.replace('/', "-")),
        records_to_csv(&report.checks),
    ))
}

pub async fn run_analysis(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisOutcome>, AppError> {
    let input = AnalysisInput {
        case: state.store.require_case(&id)?,
        documents: state.store.documents(&id)?,
        chronology: state.store.chronology(&id)?,
    };

    let outcome = state.analysis.analyze(&input).await?;
    state.store.put_state(&id, StateKind::Analysis, &outcome.report)?;
    Ok(Json(outcome))
}

pub async fn reset_analysis(State(state): State<Arc<AppState>>) -> Json<ResetResponse> {
    state.analysis.reset();
    Json(ResetResponse {
        using_fallback: state.analysis.is_using_fallback(),
    })
}

pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let kind = state_kind(&kind)?;
    state.store.require_case(&id)?;
    state
        .store
        .get_state(&id, kind)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(kind.key(&id)))
}

pub async fn put_state(
    State(state): State<Arc<AppState>>,
    Path((id, kind)): Path<(String, String)>,
    Json(value): Json<serde_json::Value>,
) -> Result<StatusCode, AppError> {
    let kind = state_kind(&kind)?;
    state.store.put_state(&id, kind, &value)?;
    Ok(StatusCode::NO_CONTENT)
}
