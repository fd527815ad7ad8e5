use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingCode {
    pub id: Uuid,
    pub code: String,
    pub duration_minutes: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TrainingCode {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingSession {
    pub id: Uuid,
    pub code_id: Uuid,
    pub candidate_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub score: Option<i32>,
    pub evaluation: Option<String>,
    pub avg_response_seconds: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Candidate,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::Candidate => "candidate",
            Sender::Ai => "ai",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown message sender: {0}")]
pub struct UnknownSender(String);

impl TryFrom<String> for Sender {
    type Error = UnknownSender;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "candidate" => Ok(Sender::Candidate),
            "ai" => Ok(Sender::Ai),
            _ => Err(UnknownSender(value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TrainingMessage {
    pub id: i64,
    pub session_id: Uuid,
    #[sqlx(try_from = "String")]
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a roleplay session. `NotStarted` only exists before the row is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Started,
    InConversation,
    Ended,
}

impl SessionState {
    pub fn of(session: &TrainingSession, message_count: usize) -> Self {
        if session.ended_at.is_some() {
            SessionState::Ended
        } else if message_count == 0 {
            SessionState::Started
        } else {
            SessionState::InConversation
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrainingEvaluation {
    pub score: i32,
    pub text: String,
    pub avg_response_seconds: f64,
    pub candidate_turns: usize,
    pub fallback: bool,
}
