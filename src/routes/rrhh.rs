use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::rrhh_dto::{
        CreateDepartmentPayload, CreateEmployeePayload, EmployeeListQuery, OrgNode,
        UpdateManagerPayload,
    },
    error::Result,
    AppState,
};

#[axum::debug_handler]
pub async fn create_department(
    State(state): State<AppState>,
    Json(payload): Json<CreateDepartmentPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let department = state.employee_service.create_department(payload).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[axum::debug_handler]
pub async fn list_departments(State(state): State<AppState>) -> Result<impl IntoResponse> {
    Ok(Json(state.employee_service.list_departments().await?))
}

#[axum::debug_handler]
pub async fn create_employee(
    State(state): State<AppState>,
    Json(payload): Json<CreateEmployeePayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let employee = state.employee_service.create(payload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

#[axum::debug_handler]
pub async fn list_employees(
    State(state): State<AppState>,
    Query(query): Query<EmployeeListQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.employee_service.list(query.department_id).await?))
}

/// Employee with the people reporting to them and everyone above them.
#[axum::debug_handler]
pub async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let employee = state.employee_service.get(id).await?;
    let direct_reports = state.employee_service.direct_reports(id).await?;
    let management_chain = state.employee_service.management_chain(id).await?;
    Ok(Json(OrgNode {
        employee,
        direct_reports,
        management_chain,
    }))
}

#[axum::debug_handler]
pub async fn update_manager(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateManagerPayload>,
) -> Result<impl IntoResponse> {
    let employee = state
        .employee_service
        .set_manager(id, payload.manager_id)
        .await?;
    Ok(Json(employee))
}
