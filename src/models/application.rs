use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Recruiting pipeline stage of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    New,
    Review,
    EntrevistaRc,
    EntrevistaTecnica,
    Oferta,
    Contratar,
    Rejected,
    Blocked,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::New,
        ApplicationStatus::Review,
        ApplicationStatus::EntrevistaRc,
        ApplicationStatus::EntrevistaTecnica,
        ApplicationStatus::Oferta,
        ApplicationStatus::Contratar,
        ApplicationStatus::Rejected,
        ApplicationStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::New => "new",
            ApplicationStatus::Review => "review",
            ApplicationStatus::EntrevistaRc => "entrevista-rc",
            ApplicationStatus::EntrevistaTecnica => "entrevista-tecnica",
            ApplicationStatus::Oferta => "oferta",
            ApplicationStatus::Contratar => "contratar",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Blocked => "blocked",
        }
    }

    pub fn allowed_next(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            New => &[Review, EntrevistaRc, Rejected, Blocked],
            Review => &[EntrevistaRc, Rejected, Blocked],
            EntrevistaRc => &[EntrevistaTecnica, Oferta, Rejected, Blocked],
            EntrevistaTecnica => &[Oferta, Rejected, Blocked],
            Oferta => &[Contratar, Rejected, Blocked],
            Contratar => &[],
            Rejected => &[Review],
            Blocked => &[New],
        }
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown application status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for ApplicationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ApplicationStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub job_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub campaign_id: Option<Uuid>,
    pub recruiter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StatusChange {
    pub id: Uuid,
    pub application_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}
