use crate::error::{Error, Result};
use crate::models::training::{
    Sender, TrainingCode, TrainingEvaluation, TrainingMessage, TrainingSession,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Persistence for codes, sessions and transcripts of the roleplay trainer.
#[async_trait]
pub trait TrainingStore: Send + Sync {
    async fn create_code(
        &self,
        code: &str,
        duration_minutes: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<TrainingCode>;

    async fn find_code(&self, code: &str) -> Result<Option<TrainingCode>>;

    async fn list_codes(&self) -> Result<Vec<TrainingCode>>;

    async fn create_session(&self, code_id: Uuid, candidate_name: &str) -> Result<TrainingSession>;

    async fn get_session(&self, id: Uuid) -> Result<Option<TrainingSession>>;

    async fn list_sessions(&self, limit: i64) -> Result<Vec<TrainingSession>>;

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        content: &str,
    ) -> Result<TrainingMessage>;

    /// Messages of a session in the order they were written.
    async fn transcript(&self, session_id: Uuid) -> Result<Vec<TrainingMessage>>;

    async fn mark_ended(&self, session_id: Uuid) -> Result<TrainingSession>;

    async fn save_evaluation(&self, session_id: Uuid, evaluation: &TrainingEvaluation) -> Result<()>;

    async fn session_stats(&self, since: DateTime<Utc>) -> Result<SessionStats>;
}

/// Sessions started since a point in time, with the mean of their recorded scores.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionStats {
    pub started: i64,
    pub average_score: Option<f64>,
}

#[derive(Clone)]
pub struct PgTrainingStore {
    pool: PgPool,
}

impl PgTrainingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrainingStore for PgTrainingStore {
    async fn create_code(
        &self,
        code: &str,
        duration_minutes: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<TrainingCode> {
        let row = sqlx::query_as::<_, TrainingCode>(
            r#"
            INSERT INTO training_codes (code, duration_minutes, expires_at)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(duration_minutes)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn find_code(&self, code: &str) -> Result<Option<TrainingCode>> {
        let row = sqlx::query_as::<_, TrainingCode>(
            r#"SELECT * FROM training_codes WHERE code = $1"#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_codes(&self) -> Result<Vec<TrainingCode>> {
        let rows = sqlx::query_as::<_, TrainingCode>(
            r#"SELECT * FROM training_codes ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_session(&self, code_id: Uuid, candidate_name: &str) -> Result<TrainingSession> {
        let row = sqlx::query_as::<_, TrainingSession>(
            r#"
            INSERT INTO training_sessions (code_id, candidate_name, started_at)
            VALUES ($1, $2, NOW())
            RETURNING *
            "#,
        )
        .bind(code_id)
        .bind(candidate_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<TrainingSession>> {
        let row = sqlx::query_as::<_, TrainingSession>(
            r#"SELECT * FROM training_sessions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_sessions(&self, limit: i64) -> Result<Vec<TrainingSession>> {
        let rows = sqlx::query_as::<_, TrainingSession>(
            r#"SELECT * FROM training_sessions ORDER BY started_at DESC LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        content: &str,
    ) -> Result<TrainingMessage> {
        let row = sqlx::query_as::<_, TrainingMessage>(
            r#"
            INSERT INTO training_messages (session_id, sender, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(session_id)
        .bind(sender.as_str())
        .bind(content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn transcript(&self, session_id: Uuid) -> Result<Vec<TrainingMessage>> {
        let rows = sqlx::query_as::<_, TrainingMessage>(
            r#"
            SELECT * FROM training_messages
            WHERE session_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn mark_ended(&self, session_id: Uuid) -> Result<TrainingSession> {
        let row = sqlx::query_as::<_, TrainingSession>(
            r#"
            UPDATE training_sessions SET ended_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_evaluation(&self, session_id: Uuid, evaluation: &TrainingEvaluation) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE training_sessions
            SET score = $2, evaluation = $3, avg_response_seconds = $4
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(evaluation.score)
        .bind(&evaluation.text)
        .bind(evaluation.avg_response_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn session_stats(&self, since: DateTime<Utc>) -> Result<SessionStats> {
        let (started, average_score): (i64, Option<f64>) = sqlx::query_as(
            r#"
            SELECT COUNT(*), AVG(score)::float8
            FROM training_sessions
            WHERE started_at >= $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(SessionStats {
            started,
            average_score,
        })
    }
}

#[derive(Default)]
struct MemoryState {
    codes: Vec<TrainingCode>,
    sessions: HashMap<Uuid, TrainingSession>,
    messages: Vec<TrainingMessage>,
    next_message_id: i64,
}

/// Process-local store for demos and tests. Data is lost on restart.
#[derive(Clone, Default)]
pub struct MemoryTrainingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTrainingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("training store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl TrainingStore for MemoryTrainingStore {
    async fn create_code(
        &self,
        code: &str,
        duration_minutes: i32,
        expires_at: DateTime<Utc>,
    ) -> Result<TrainingCode> {
        let mut state = self.lock()?;
        if state.codes.iter().any(|c| c.code == code) {
            return Err(Error::BadRequest(format!("Duplicate value: code {}", code)));
        }
        let row = TrainingCode {
            id: Uuid::new_v4(),
            code: code.to_string(),
            duration_minutes,
            expires_at,
            created_at: Utc::now(),
        };
        state.codes.push(row.clone());
        Ok(row)
    }

    async fn find_code(&self, code: &str) -> Result<Option<TrainingCode>> {
        let state = self.lock()?;
        Ok(state.codes.iter().find(|c| c.code == code).cloned())
    }

    async fn list_codes(&self) -> Result<Vec<TrainingCode>> {
        let state = self.lock()?;
        let mut codes = state.codes.clone();
        codes.reverse();
        Ok(codes)
    }

    async fn create_session(&self, code_id: Uuid, candidate_name: &str) -> Result<TrainingSession> {
        let mut state = self.lock()?;
        let row = TrainingSession {
            id: Uuid::new_v4(),
            code_id,
            candidate_name: candidate_name.to_string(),
            started_at: Utc::now(),
            ended_at: None,
            score: None,
            evaluation: None,
            avg_response_seconds: None,
        };
        state.sessions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<TrainingSession>> {
        let state = self.lock()?;
        Ok(state.sessions.get(&id).cloned())
    }

    async fn list_sessions(&self, limit: i64) -> Result<Vec<TrainingSession>> {
        let state = self.lock()?;
        let mut sessions: Vec<TrainingSession> = state.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit.max(0) as usize);
        Ok(sessions)
    }

    async fn append_message(
        &self,
        session_id: Uuid,
        sender: Sender,
        content: &str,
    ) -> Result<TrainingMessage> {
        let mut state = self.lock()?;
        if !state.sessions.contains_key(&session_id) {
            return Err(Error::NotFound("Resource not found".to_string()));
        }
        state.next_message_id += 1;
        let row = TrainingMessage {
            id: state.next_message_id,
            session_id,
            sender,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        state.messages.push(row.clone());
        Ok(row)
    }

    async fn transcript(&self, session_id: Uuid) -> Result<Vec<TrainingMessage>> {
        let state = self.lock()?;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn mark_ended(&self, session_id: Uuid) -> Result<TrainingSession> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;
        session.ended_at = Some(Utc::now());
        Ok(session.clone())
    }

    async fn save_evaluation(&self, session_id: Uuid, evaluation: &TrainingEvaluation) -> Result<()> {
        let mut state = self.lock()?;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| Error::NotFound("Resource not found".to_string()))?;
        session.score = Some(evaluation.score);
        session.evaluation = Some(evaluation.text.clone());
        session.avg_response_seconds = Some(evaluation.avg_response_seconds);
        Ok(())
    }

    async fn session_stats(&self, since: DateTime<Utc>) -> Result<SessionStats> {
        let state = self.lock()?;
        let recent: Vec<&TrainingSession> = state
            .sessions
            .values()
            .filter(|s| s.started_at >= since)
            .collect();
        let scores: Vec<i32> = recent.iter().filter_map(|s| s.score).collect();
        let average_score = (!scores.is_empty())
            .then(|| scores.iter().map(|&s| f64::from(s)).sum::<f64>() / scores.len() as f64);
        Ok(SessionStats {
            started: recent.len() as i64,
            average_score,
        })
    }
}
