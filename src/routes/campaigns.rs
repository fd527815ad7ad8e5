use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{dto::recruiting_dto::CreateCampaignPayload, error::Result, AppState};

#[axum::debug_handler]
pub async fn create_campaign(
    State(state): State<AppState>,
    Json(payload): Json<CreateCampaignPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    if let Err(err) = payload.check_dates() {
        let mut errors = ValidationErrors::new();
        errors.add("ends_on", err);
        return Err(errors.into());
    }
    let campaign = state.campaign_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

#[axum::debug_handler]
pub async fn list_campaigns(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.campaign_service.list().await?))
}

#[axum::debug_handler]
pub async fn get_campaign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.campaign_service.get(id).await?))
}
