use crate::dto::recruiting_dto::{ApplicationListQuery, ApplyPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::application::{Application, ApplicationStatus, StatusChange};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct ApplicationService {
    pool: PgPool,
}

/// Rejects transitions that are not in the pipeline table.
pub fn ensure_transition(from: ApplicationStatus, to: ApplicationStatus) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::BadRequest(format!(
            "invalid status transition: {} -> {}",
            from, to
        )))
    }
}

/// Admins may assign any recruiter; everyone else may only take an application themselves.
pub fn ensure_can_assign(actor: &Claims, recruiter_id: Uuid) -> Result<()> {
    if actor.has_role("admin") {
        return Ok(());
    }
    match actor.user_id() {
        Some(id) if id == recruiter_id => Ok(()),
        _ => Err(Error::Forbidden(
            "Only administrators can assign other recruiters".to_string(),
        )),
    }
}

impl ApplicationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn apply(&self, payload: ApplyPayload) -> Result<Application> {
        let application = sqlx::query_as::<_, Application>(
            r#"
            INSERT INTO applications (candidate_id, job_id, campaign_id, status)
            VALUES ($1, $2, $3, 'new')
            ON CONFLICT (candidate_id, job_id) DO UPDATE SET updated_at = applications.updated_at
            RETURNING *
            "#,
        )
        .bind(payload.candidate_id)
        .bind(payload.job_id)
        .bind(payload.campaign_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                Error::BadRequest("Unknown candidate, job or campaign".to_string())
            }
            other => other.into(),
        })?;
        Ok(application)
    }

    pub async fn get(&self, id: Uuid) -> Result<Application> {
        let application =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        application.ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    pub async fn change_status(
        &self,
        id: Uuid,
        next: ApplicationStatus,
        changed_by: Option<Uuid>,
    ) -> Result<Application> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Application not found".to_string()))?;

        ensure_transition(current.status, next)?;

        let updated = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(next.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO application_status_history (application_id, from_status, to_status, changed_by)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(id)
        .bind(current.status.as_str())
        .bind(next.as_str())
        .bind(changed_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(application_id = %id, from = %current.status, to = %next, "Application status changed");
        Ok(updated)
    }

    pub async fn history(&self, id: Uuid) -> Result<Vec<StatusChange>> {
        let rows = sqlx::query_as::<_, StatusChange>(
            r#"
            SELECT * FROM application_status_history
            WHERE application_id = $1
            ORDER BY changed_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn assign_recruiter(&self, id: Uuid, recruiter_id: Uuid) -> Result<Application> {
        let recruiter_ok: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM users WHERE id = $1 AND is_active AND role IN ('admin', 'hr', 'recruiter')",
        )
        .bind(recruiter_id)
        .fetch_optional(&self.pool)
        .await?;
        if recruiter_ok.is_none() {
            return Err(Error::BadRequest("Recruiter not found or inactive".to_string()));
        }

        let application = sqlx::query_as::<_, Application>(
            r#"
            UPDATE applications SET recruiter_id = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(recruiter_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        application.ok_or_else(|| Error::NotFound("Application not found".to_string()))
    }

    pub async fn list_for_job(
        &self,
        job_id: Uuid,
        query: ApplicationListQuery,
    ) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR campaign_id = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_id)
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.campaign_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_candidate(&self, candidate_id: Uuid) -> Result<Vec<Application>> {
        let rows = sqlx::query_as::<_, Application>(
            "SELECT * FROM applications WHERE candidate_id = $1 ORDER BY created_at DESC",
        )
        .bind(candidate_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn status_counts(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*) AS count
            FROM applications
            GROUP BY status
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }
}
