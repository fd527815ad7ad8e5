use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role
            .as_deref()
            .is_some_and(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn has_any_role(&self, allowed: &[&str]) -> bool {
        allowed.iter().any(|r| self.has_role(r))
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn sign(&self, claims: &Claims) -> jsonwebtoken::errors::Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        decode::<Claims>(token, &self.decoding, &validation).map(|data| data.claims)
    }
}

pub const STAFF_ROLES: [&str; 3] = ["admin", "hr", "recruiter"];
pub const MANAGER_ROLES: [&str; 2] = ["admin", "hr"];
pub const ADMIN_ROLES: [&str; 1] = ["admin"];

fn unauthorized(code: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": code }))).into_response()
}

async fn require_roles(keys: &JwtKeys, mut req: Request, next: Next, allowed: &[&str]) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("missing_authorization");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("bad_authorization");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("unsupported_scheme");
    };

    match keys.verify(token) {
        Ok(claims) => {
            if !allowed.is_empty() && !claims.has_any_role(allowed) {
                return (StatusCode::FORBIDDEN, Json(json!({"error":"forbidden"}))).into_response();
            }
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "Rejected bearer token");
            unauthorized("invalid_token")
        }
    }
}

/// Any authenticated back-office user.
pub async fn require_staff(State(keys): State<JwtKeys>, req: Request, next: Next) -> Response {
    require_roles(&keys, req, next, &STAFF_ROLES).await
}

pub async fn require_hr_or_admin(State(keys): State<JwtKeys>, req: Request, next: Next) -> Response {
    require_roles(&keys, req, next, &MANAGER_ROLES).await
}

pub async fn require_admin(State(keys): State<JwtKeys>, req: Request, next: Next) -> Response {
    require_roles(&keys, req, next, &ADMIN_ROLES).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn token(keys: &JwtKeys, role: &str, ttl_secs: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + ttl_secs) as usize;
        keys.sign(&Claims {
            sub: Uuid::new_v4().to_string(),
            exp,
            role: Some(role.to_string()),
        })
        .unwrap()
    }

    fn app(keys: JwtKeys) -> Router {
        Router::new()
            .route(
                "/hr",
                get(|Extension(claims): Extension<Claims>| async move {
                    claims.role.unwrap_or_default()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(keys, require_hr_or_admin))
    }

    async fn call(app: Router, auth: Option<String>) -> StatusCode {
        let mut builder = Request::builder().uri("/hr");
        if let Some(value) = auth {
            builder = builder.header("authorization", value);
        }
        app.oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn role_gate_checks_token_and_role() {
        let keys = JwtKeys::new("test_secret_key");
        let hr = token(&keys, "HR", 600);
        let recruiter = token(&keys, "recruiter", 600);
        let expired = token(&keys, "admin", -600);
        let foreign = token(&JwtKeys::new("other"), "admin", 600);

        assert_eq!(call(app(keys.clone()), None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call(app(keys.clone()), Some(format!("Basic {}", hr))).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call(app(keys.clone()), Some(format!("Bearer {}", hr))).await, StatusCode::OK);
        assert_eq!(call(app(keys.clone()), Some(format!("Bearer {}", recruiter))).await, StatusCode::FORBIDDEN);
        assert_eq!(call(app(keys.clone()), Some(format!("Bearer {}", expired))).await, StatusCode::UNAUTHORIZED);
        assert_eq!(call(app(keys), Some(format!("Bearer {}", foreign))).await, StatusCode::UNAUTHORIZED);
    }
}
