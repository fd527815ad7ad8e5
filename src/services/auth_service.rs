use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::dto::auth_dto::{CreateUserPayload, LoginRequest, LoginResponse};
use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, JwtKeys};
use crate::models::user::User;
use crate::utils::crypto::{hash_password, verify_password};

#[derive(Clone)]
pub struct AuthService {
    pool: PgPool,
    keys: JwtKeys,
    ttl: Duration,
}

pub fn claims_for(user: &User, expires_at: DateTime<Utc>) -> Claims {
    Claims {
        sub: user.id.to_string(),
        exp: expires_at.timestamp().max(0) as usize,
        role: Some(user.role.clone()),
    }
}

fn invalid_credentials() -> Error {
    Error::Unauthorized("Invalid email or password".to_string())
}

impl AuthService {
    pub fn new(pool: PgPool, keys: JwtKeys, ttl_hours: i64) -> Self {
        Self {
            pool,
            keys,
            ttl: Duration::hours(ttl_hours.max(1)),
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse> {
        let user = self
            .find_by_email(&request.email)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(invalid_credentials)?;

        let matches = verify_password(&request.password, &user.password_hash)
            .map_err(|e| Error::Internal(format!("Stored password hash is invalid: {}", e)))?;
        if !matches {
            tracing::info!(user_id = %user.id, "Rejected login with wrong password");
            return Err(invalid_credentials());
        }

        let expires_at = Utc::now() + self.ttl;
        let token = self
            .keys
            .sign(&claims_for(&user, expires_at))
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))?;
        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginResponse {
            token,
            expires_at,
            user,
        })
    }

    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<User> {
        let password_hash = hash_password(&payload.password)
            .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name, role, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.email.trim().to_lowercase())
        .bind(payload.name.trim())
        .bind(payload.role)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Creates the first administrator when the account does not exist yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        if self.find_by_email(email).await?.is_some() {
            return Ok(());
        }
        self.create_user(CreateUserPayload {
            email: email.to_string(),
            name: "Administrator".to_string(),
            role: "admin".to_string(),
            password: password.to_string(),
        })
        .await?;
        tracing::info!(email = %email, "Bootstrapped administrator account");
        Ok(())
    }
}
