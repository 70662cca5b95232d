//! Axum route handlers for the Resume API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{GeneratedResumeRow, ResumeSummaryRow};
use crate::resume::generator::GenerateRequest;
use crate::state::AppState;

/// Resumes are always scoped to their owner.
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    pub user_id: Uuid,
}

/// POST /api/v1/resumes
///
/// Generates a resume for one profile against a job description and stores it.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GeneratedResumeRow>), AppError> {
    if request.job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let row = state.generator.generate(request).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /api/v1/resumes?user_id=
///
/// Resume history for a user, newest first, without LaTeX bodies.
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<Vec<ResumeSummaryRow>>, AppError> {
    Ok(Json(state.store.list_resumes(owner.user_id).await?))
}

/// GET /api/v1/resumes/:id?user_id=
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<Json<GeneratedResumeRow>, AppError> {
    let resume = state
        .store
        .get_resume(owner.user_id, resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    Ok(Json(resume))
}

/// DELETE /api/v1/resumes/:id?user_id=
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(owner): Query<OwnerQuery>,
) -> Result<StatusCode, AppError> {
    if state.store.delete_resume(owner.user_id, resume_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Resume {resume_id} not found")))
    }
}
