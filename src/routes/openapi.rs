use axum::response::Json;
use utoipa::OpenApi;

use crate::dto::training_dto::{
    CodeSummary, EndSessionResponse, SendMessageResponse, StartSessionResponse,
    ValidateCodeResponse,
};
use crate::models::training::{SessionState, TrainingEvaluation};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::training::training_chat,
        crate::routes::jobs::create_job,
        crate::routes::jobs::update_job,
        crate::routes::jobs::delete_job,
        crate::routes::jobs::list_jobs,
        crate::routes::jobs::get_job,
    ),
    components(schemas(
        CodeSummary,
        ValidateCodeResponse,
        StartSessionResponse,
        SendMessageResponse,
        EndSessionResponse,
        SessionState,
        TrainingEvaluation,
    )),
    tags((name = "training", description = "Sales roleplay trainer"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
