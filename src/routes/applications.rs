use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;

use crate::{
    dto::recruiting_dto::{
        ApplicationHistoryResponse, ApplicationListQuery, ApplyPayload, AssignRecruiterPayload,
        ChangeStatusPayload,
    },
    error::Result,
    middleware::auth::Claims,
    services::application_service::ensure_can_assign,
    AppState,
};

#[axum::debug_handler]
pub async fn apply(
    State(state): State<AppState>,
    Json(payload): Json<ApplyPayload>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.apply(payload).await?;
    Ok((StatusCode::CREATED, Json(application)))
}

#[axum::debug_handler]
pub async fn list_for_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ApplicationListQuery>,
) -> Result<impl IntoResponse> {
    let rows = state.application_service.list_for_job(job_id, query).await?;
    Ok(Json(rows))
}

#[axum::debug_handler]
pub async fn get_application(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let application = state.application_service.get(id).await?;
    let history = state.application_service.history(id).await?;
    Ok(Json(ApplicationHistoryResponse {
        allowed_next: application.status.allowed_next().to_vec(),
        application,
        history,
    }))
}

#[axum::debug_handler]
pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangeStatusPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .application_service
        .change_status(id, payload.status, claims.user_id())
        .await?;
    Ok(Json(application))
}

#[axum::debug_handler]
pub async fn assign_recruiter(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AssignRecruiterPayload>,
) -> Result<impl IntoResponse> {
    ensure_can_assign(&claims, payload.recruiter_id)?;
    let application = state
        .application_service
        .assign_recruiter(id, payload.recruiter_id)
        .await?;
    tracing::info!(application_id = %id, recruiter_id = %payload.recruiter_id, assigned_by = %claims.sub, "Recruiter assigned");
    Ok(Json(application))
}
