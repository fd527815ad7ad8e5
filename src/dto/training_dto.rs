use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::training::{
    SessionState, TrainingCode, TrainingEvaluation, TrainingMessage, TrainingSession,
};
use crate::services::training_service::{MAX_CUSTOM_CODE_LENGTH, MIN_CUSTOM_CODE_LENGTH};

/// Body of `POST /functions/v1/training-chat`, discriminated by `action`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum TrainingRequest {
    #[serde(rename_all = "camelCase")]
    ValidateCode { training_code: String },
    #[serde(rename_all = "camelCase")]
    StartSession {
        training_code: String,
        candidate_name: String,
    },
    #[serde(rename_all = "camelCase")]
    SendMessage { session_id: Uuid, message: String },
    #[serde(rename_all = "camelCase")]
    EndSession { session_id: Uuid },
}

impl TrainingRequest {
    pub fn action(&self) -> &'static str {
        match self {
            TrainingRequest::ValidateCode { .. } => "validate-code",
            TrainingRequest::StartSession { .. } => "start-session",
            TrainingRequest::SendMessage { .. } => "send-message",
            TrainingRequest::EndSession { .. } => "end-session",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CodeSummary {
    pub code: String,
    pub duration_minutes: i32,
    pub expires_at: DateTime<Utc>,
}

impl From<TrainingCode> for CodeSummary {
    fn from(code: TrainingCode) -> Self {
        Self {
            code: code.code,
            duration_minutes: code.duration_minutes,
            expires_at: code.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ValidateCodeResponse {
    pub success: bool,
    pub code: CodeSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionResponse {
    pub success: bool,
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SendMessageResponse {
    pub success: bool,
    pub message: String,
    pub state: SessionState,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndSessionResponse {
    pub success: bool,
    pub evaluation: TrainingEvaluation,
}

fn validate_custom_code(code: &str) -> Result<(), ValidationError> {
    let len = code.trim().chars().count();
    if (MIN_CUSTOM_CODE_LENGTH..=MAX_CUSTOM_CODE_LENGTH).contains(&len) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_code_length"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTrainingCodePayload {
    #[validate(custom(function = "validate_custom_code"))]
    pub code: Option<String>,
    #[validate(range(min = 1, max = 240))]
    pub duration_minutes: i32,
    #[validate(range(min = 1, max = 720))]
    pub valid_for_hours: Option<i64>,
}

pub const DEFAULT_CODE_VALIDITY_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub session: TrainingSession,
    pub state: SessionState,
    pub messages: Vec<TrainingMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_tag_selects_variant() {
        let req: TrainingRequest = serde_json::from_value(json!({
            "action": "start-session",
            "trainingCode": "ABC123",
            "candidateName": "Jane"
        }))
        .unwrap();
        assert!(matches!(
            &req,
            TrainingRequest::StartSession { training_code, candidate_name }
                if training_code == "ABC123" && candidate_name == "Jane"
        ));
        assert_eq!(req.action(), "start-session");
    }

    #[test]
    fn unknown_action_and_missing_fields_are_rejected() {
        assert!(serde_json::from_value::<TrainingRequest>(json!({"action": "dance"})).is_err());
        assert!(serde_json::from_value::<TrainingRequest>(json!({"action": "send-message"})).is_err());
        assert!(serde_json::from_value::<TrainingRequest>(json!({"trainingCode": "X"})).is_err());
    }

    #[test]
    fn start_response_uses_camel_case() {
        let body = serde_json::to_value(StartSessionResponse {
            success: true,
            session_id: Uuid::nil(),
            started_at: Utc::now(),
            duration_minutes: 15,
        })
        .unwrap();
        assert!(body.get("sessionId").is_some());
        assert_eq!(body["durationMinutes"], 15);
    }

    #[test]
    fn code_duration_bounds() {
        let ok = CreateTrainingCodePayload {
            code: None,
            duration_minutes: 240,
            valid_for_hours: None,
        };
        assert!(ok.validate().is_ok());
        let too_long = CreateTrainingCodePayload {
            duration_minutes: 241,
            ..ok.clone()
        };
        assert!(too_long.validate().is_err());
        let zero = CreateTrainingCodePayload {
            duration_minutes: 0,
            ..ok
        };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn custom_code_length_ignores_padding() {
        let padded = CreateTrainingCodePayload {
            code: Some(" ab ".into()),
            duration_minutes: 15,
            valid_for_hours: None,
        };
        assert!(padded.validate().is_err());
        let ok = CreateTrainingCodePayload {
            code: Some("  abcd  ".into()),
            ..padded
        };
        assert!(ok.validate().is_ok());
    }
}
