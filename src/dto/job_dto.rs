use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::job::{Job, JOB_STATUSES};
use crate::services::job_service::JobList;

fn validate_job_status(status: &str) -> Result<(), ValidationError> {
    if JOB_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_job_status"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJobPayload {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(length(min = 1))]
    pub department: String,
    #[validate(length(min = 1))]
    pub location: String,
    pub employment_type: Option<String>,
    #[validate(custom(function = "validate_job_status"))]
    pub status: Option<String>,
    pub requirements: Option<String>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateJobPayload {
    #[validate(length(min = 1))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub department: Option<String>,
    #[validate(length(min = 1))]
    pub location: Option<String>,
    pub employment_type: Option<String>,
    #[validate(custom(function = "validate_job_status"))]
    pub status: Option<String>,
    pub requirements: Option<String>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct JobBoardQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListResponse {
    pub items: Vec<Job>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// Public job board card; internal fields such as status are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBoardItem {
    pub id: uuid::Uuid,
    pub title: String,
    pub department: String,
    pub location: String,
    pub employment_type: Option<String>,
    pub salary_from: Option<Decimal>,
    pub salary_to: Option<Decimal>,
    pub summary: Option<String>,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobBoardResponse {
    pub items: Vec<JobBoardItem>,
}

impl From<Job> for JobBoardItem {
    fn from(value: Job) -> Self {
        let summary = value.requirements.as_ref().map(|text| {
            let trimmed = text.trim();
            if trimmed.chars().count() > 320 {
                format!("{}…", trimmed.chars().take(320).collect::<String>())
            } else {
                trimmed.to_string()
            }
        });

        Self {
            id: value.id,
            title: value.title,
            department: value.department,
            location: value.location,
            employment_type: value.employment_type,
            salary_from: value.salary_from,
            salary_to: value.salary_to,
            summary,
            posted_at: value.created_at,
        }
    }
}

impl From<JobList> for JobListResponse {
    fn from(value: JobList) -> Self {
        Self {
            items: value.items,
            total: value.total,
            page: value.page,
            per_page: value.per_page,
            total_pages: value.total_pages,
        }
    }
}
