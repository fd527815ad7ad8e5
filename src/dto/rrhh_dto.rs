use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::employee::{Employee, EMPLOYEE_STATUSES};

fn validate_employee_status(status: &str) -> Result<(), ValidationError> {
    if EMPLOYEE_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_employee_status"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDepartmentPayload {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub work_center: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEmployeePayload {
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub position: String,
    pub department_id: Option<Uuid>,
    pub manager_id: Option<Uuid>,
    pub hired_on: Option<NaiveDate>,
    #[validate(custom(function = "validate_employee_status"))]
    pub status: Option<String>,
}

/// `manager_id: null` removes the current manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateManagerPayload {
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmployeeListQuery {
    pub department_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgNode {
    pub employee: Employee,
    pub direct_reports: Vec<Employee>,
    pub management_chain: Vec<Employee>,
}
