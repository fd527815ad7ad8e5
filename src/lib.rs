pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::{Config, StoreBackend};
use crate::error::Result;
use crate::middleware::auth::JwtKeys;
use crate::services::{
    application_service::ApplicationService,
    auth_service::AuthService,
    campaign_service::CampaignService,
    candidate_service::CandidateService,
    employee_service::EmployeeService,
    job_service::JobService,
    llm_service::{ChatSettings, OpenAiChatModel},
    training_service::TrainingService,
    training_store::{MemoryTrainingStore, PgTrainingStore, TrainingStore},
};
use axum::extract::FromRef;
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt_keys: JwtKeys,
    pub training_service: TrainingService,
    pub job_service: JobService,
    pub candidate_service: CandidateService,
    pub application_service: ApplicationService,
    pub campaign_service: CampaignService,
    pub employee_service: EmployeeService,
    pub auth_service: AuthService,
}

impl FromRef<AppState> for TrainingService {
    fn from_ref(state: &AppState) -> Self {
        state.training_service.clone()
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_keys.clone()
    }
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self> {
        let llm_timeout = Duration::from_secs(config.llm_timeout_secs);
        let http_client = Client::builder().connect_timeout(llm_timeout).build()?;

        let store: Arc<dyn TrainingStore> = match config.training_store {
            StoreBackend::Postgres => Arc::new(PgTrainingStore::new(pool.clone())),
            StoreBackend::Memory => {
                tracing::warn!("Training data is kept in memory and will be lost on restart");
                Arc::new(MemoryTrainingStore::new())
            }
        };
        let model = Arc::new(OpenAiChatModel::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            http_client,
            llm_timeout,
        ));
        let training_service = TrainingService::new(
            store,
            model,
            ChatSettings {
                model: config.training_model.clone(),
                temperature: config.training_temperature,
                max_tokens: config.training_max_tokens,
            },
            ChatSettings {
                model: config.training_model.clone(),
                temperature: config.evaluation_temperature,
                max_tokens: config.evaluation_max_tokens,
            },
        );

        let jwt_keys = JwtKeys::new(&config.jwt_secret);

        Ok(Self {
            training_service,
            job_service: JobService::new(pool.clone()),
            candidate_service: CandidateService::new(pool.clone()),
            application_service: ApplicationService::new(pool.clone()),
            campaign_service: CampaignService::new(pool.clone()),
            employee_service: EmployeeService::new(pool.clone()),
            auth_service: AuthService::new(pool.clone(), jwt_keys.clone(), config.jwt_ttl_hours),
            jwt_keys,
            pool,
        })
    }
}
