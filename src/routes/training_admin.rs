use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::training_dto::{
        CreateTrainingCodePayload, SessionDetailResponse, SessionListQuery,
        DEFAULT_CODE_VALIDITY_HOURS,
    },
    error::Result,
    middleware::auth::Claims,
    models::training::SessionState,
    services::training_service::TrainingService,
};

const DEFAULT_SESSION_PAGE: i64 = 100;

pub async fn create_code(
    State(service): State<TrainingService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTrainingCodePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let code = service
        .create_code(
            payload.code,
            payload.duration_minutes,
            payload.valid_for_hours.unwrap_or(DEFAULT_CODE_VALIDITY_HOURS),
        )
        .await?;
    tracing::info!(created_by = %claims.sub, code = %code.code, "Training code issued");
    Ok((StatusCode::CREATED, Json(code)))
}

pub async fn list_codes(State(service): State<TrainingService>) -> Result<impl IntoResponse> {
    Ok(Json(service.list_codes().await?))
}

pub async fn list_sessions(
    State(service): State<TrainingService>,
    Query(query): Query<SessionListQuery>,
) -> Result<impl IntoResponse> {
    let sessions = service
        .list_sessions(query.limit.unwrap_or(DEFAULT_SESSION_PAGE))
        .await?;
    Ok(Json(sessions))
}

pub async fn session_detail(
    State(service): State<TrainingService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let (session, messages) = service.session_detail(id).await?;
    Ok(Json(SessionDetailResponse {
        state: SessionState::of(&session, messages.len()),
        session,
        messages,
    }))
}
