use crate::dto::recruiting_dto::CreateCampaignPayload;
use crate::error::{Error, Result};
use crate::models::campaign::Campaign;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct CampaignService {
    pool: PgPool,
}

impl CampaignService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, payload: CreateCampaignPayload) -> Result<Campaign> {
        let campaign = sqlx::query_as::<_, Campaign>(
            r#"
            INSERT INTO campaigns (name, description, starts_on, ends_on)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.name.trim())
        .bind(payload.description)
        .bind(payload.starts_on)
        .bind(payload.ends_on)
        .fetch_one(&self.pool)
        .await?;
        Ok(campaign)
    }

    pub async fn list(&self) -> Result<Vec<Campaign>> {
        let rows = sqlx::query_as::<_, Campaign>(
            "SELECT * FROM campaigns ORDER BY is_active DESC, created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(&self, id: Uuid) -> Result<Campaign> {
        let campaign = sqlx::query_as::<_, Campaign>("SELECT * FROM campaigns WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        campaign.ok_or_else(|| Error::NotFound("Campaign not found".to_string()))
    }

    pub async fn count_active(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM campaigns WHERE is_active")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }
}
