use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::application::{Application, ApplicationStatus, StatusChange};
use crate::models::candidate::{AiAnalysis, Candidate};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCandidatePayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
    pub resume_text: Option<String>,
    #[validate(url)]
    pub resume_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateAnalysisPayload {
    #[serde(default)]
    pub skills: Vec<String>,
    pub experience_years: Option<f32>,
    #[validate(range(min = 0, max = 100))]
    pub compatibility_score: Option<i32>,
    pub summary: Option<String>,
}

impl From<UpdateAnalysisPayload> for AiAnalysis {
    fn from(value: UpdateAnalysisPayload) -> Self {
        Self {
            skills: value.skills,
            experience_years: value.experience_years,
            compatibility_score: value.compatibility_score,
            summary: value.summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetail {
    #[serde(flatten)]
    pub candidate: Candidate,
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyPayload {
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeStatusPayload {
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRecruiterPayload {
    pub recruiter_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationHistoryResponse {
    pub application: Application,
    pub allowed_next: Vec<ApplicationStatus>,
    pub history: Vec<StatusChange>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationListQuery {
    pub status: Option<ApplicationStatus>,
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCampaignPayload {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub starts_on: Option<NaiveDate>,
    pub ends_on: Option<NaiveDate>,
}

impl CreateCampaignPayload {
    pub fn check_dates(&self) -> Result<(), ValidationError> {
        match (self.starts_on, self.ends_on) {
            (Some(start), Some(end)) if end < start => {
                Err(ValidationError::new("campaign_ends_before_start"))
            }
            _ => Ok(()),
        }
    }
}
