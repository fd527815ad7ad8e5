use axum::{
    body::Bytes,
    extract::{FromRef, State},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};

use crate::{
    dto::training_dto::{
        EndSessionResponse, SendMessageResponse, StartSessionResponse, TrainingRequest,
        ValidateCodeResponse,
    },
    error::Result,
    services::training_service::TrainingService,
};

pub const TRAINING_CHAT_PATH: &str = "/functions/v1/training-chat";

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    TrainingService: FromRef<S>,
{
    Router::new().route(TRAINING_CHAT_PATH, post(training_chat))
}

#[utoipa::path(
    post,
    path = "/functions/v1/training-chat",
    tag = "training",
    request_body(
        content = String,
        content_type = "application/json",
        description = "Object with an `action` of validate-code, start-session, send-message or end-session"
    ),
    responses(
        (status = 200, description = "One of ValidateCodeResponse, StartSessionResponse, SendMessageResponse or EndSessionResponse, matching the action"),
        (status = 400, description = "Malformed body, unknown action or expired code"),
        (status = 404, description = "Unknown code or session"),
        (status = 500, description = "Model provider failed")
    )
)]
pub async fn training_chat(
    State(service): State<TrainingService>,
    body: Bytes,
) -> Result<Response> {
    let request: TrainingRequest = serde_json::from_slice(&body)?;
    tracing::debug!(action = request.action(), "Training chat request");

    let response = match request {
        TrainingRequest::ValidateCode { training_code } => {
            let code = service.validate_code(&training_code).await?;
            Json(ValidateCodeResponse {
                success: true,
                code: code.into(),
            })
            .into_response()
        }
        TrainingRequest::StartSession {
            training_code,
            candidate_name,
        } => {
            let (session, code) = service
                .start_session(&training_code, &candidate_name)
                .await?;
            Json(StartSessionResponse {
                success: true,
                session_id: session.id,
                started_at: session.started_at,
                duration_minutes: code.duration_minutes,
            })
            .into_response()
        }
        TrainingRequest::SendMessage {
            session_id,
            message,
        } => {
            let reply = service.send_message(session_id, &message).await?;
            Json(SendMessageResponse {
                success: true,
                message: reply.message,
                state: reply.state,
            })
            .into_response()
        }
        TrainingRequest::EndSession { session_id } => {
            let evaluation = service.end_session(session_id).await?;
            Json(EndSessionResponse {
                success: true,
                evaluation,
            })
            .into_response()
        }
    };
    Ok(response)
}
