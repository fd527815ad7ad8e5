use crate::dto::recruiting_dto::CreateCandidatePayload;
use crate::error::{Error, Result};
use crate::models::candidate::{AiAnalysis, Candidate};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_candidate(&self, id: Uuid) -> Result<Candidate> {
        let candidate = sqlx::query_as::<_, Candidate>("SELECT * FROM candidates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        candidate.ok_or_else(|| Error::NotFound("Candidate not found".to_string()))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Candidate>> {
        let candidate = sqlx::query_as::<_, Candidate>(
            "SELECT * FROM candidates WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(candidate)
    }

    pub async fn create_candidate(&self, payload: CreateCandidatePayload) -> Result<Candidate> {
        if self.get_by_email(&payload.email).await?.is_some() {
            return Err(Error::BadRequest(
                "A candidate with this email address already exists.".to_string(),
            ));
        }

        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            INSERT INTO candidates (name, email, phone, resume_text, resume_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.email.trim().to_lowercase())
        .bind(payload.phone)
        .bind(payload.resume_text)
        .bind(payload.resume_url)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(candidate_id = %candidate.id, "Candidate created");
        Ok(candidate)
    }

    pub async fn list_candidates(&self) -> Result<Vec<Candidate>> {
        let candidates =
            sqlx::query_as::<_, Candidate>("SELECT * FROM candidates ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;
        Ok(candidates)
    }

    pub async fn update_analysis(&self, id: Uuid, analysis: AiAnalysis) -> Result<Candidate> {
        let candidate = sqlx::query_as::<_, Candidate>(
            r#"
            UPDATE candidates
            SET ai_analysis = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(serde_json::to_value(&analysis)?)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(candidate)
    }

    pub async fn delete_candidate(&self, id: Uuid) -> Result<()> {
        let res = sqlx::query("DELETE FROM candidates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::NotFound("Candidate not found".to_string()));
        }
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM candidates")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    pub async fn get_history_counts(&self) -> Result<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT TO_CHAR(created_at, 'YYYY-MM-DD') AS date, COUNT(*) AS count
            FROM candidates
            WHERE created_at > NOW() - INTERVAL '7 days'
            GROUP BY TO_CHAR(created_at, 'YYYY-MM-DD')
            ORDER BY date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
