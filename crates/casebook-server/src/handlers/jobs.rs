use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use casebook_pipeline::DocumentInput;
use futures::stream::{self, Stream};

use crate::dto::{CancelResponse, UploadResponse};
use crate::error::AppError;
use crate::state::AppState;

/// Finished jobs are pruned once the registry grows past this
const MAX_RETAINED_JOBS: usize = 100;

pub async fn upload(
    State(state): State<Arc<AppState>>,
    Path(case_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    state.store.require_case(&case_id)?;

    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        documents.push(DocumentInput::new(file_name, bytes.to_vec()));
    }

    if documents.is_empty() {
        return Err(AppError::BadRequest("No files provided".to_string()));
    }

    if state.jobs.len() >= MAX_RETAINED_JOBS {
        let pruned = state.jobs.prune_finished();
        tracing::debug!("Pruned {} finished jobs", pruned);
    }

    let count = documents.len();
    let job = state.jobs.spawn(state.pipeline.clone(), &case_id, documents);
    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            job_id: job.id.clone(),
            case_id,
            documents: count,
        }),
    ))
}

/// Server-sent events for a job, replayed from the first event
pub async fn events(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let job = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("job {}", job_id)))?;

    let stream = stream::unfold((job, 0usize), |(job, index)| async move {
        let event = job.next_event(index).await?;
        let sse = Event::default()
            .json_data(&event)
            .unwrap_or_else(|e| Event::default().event("error").data(e.to_string()));
        Some((Ok(sse), (job, index + 1)))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keep-alive"),
    ))
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<CancelResponse>, AppError> {
    let job = state
        .jobs
        .get(&job_id)
        .ok_or_else(|| AppError::NotFound(format!("job {}", job_id)))?;

    let cancelled = !job.is_finished();
    if cancelled {
        job.cancel();
        tracing::info!("Cancelling job {}", job_id);
    }
    Ok(Json(CancelResponse { job_id, cancelled }))
}
