use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub training_model: String,
    pub training_temperature: f32,
    pub training_max_tokens: u32,
    pub evaluation_temperature: f32,
    pub evaluation_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub public_rps: u32,
    pub admin_rps: u32,
    pub training_store: StoreBackend,
    pub log_json: bool,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let training_store = match env::var("TRAINING_STORE")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "" | "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(Error::Config(format!(
                    "Invalid value for TRAINING_STORE: {}",
                    other
                )))
            }
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            jwt_ttl_hours: get_env_or("JWT_TTL_HOURS", 12)?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            training_model: env::var("TRAINING_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            training_temperature: get_env_or("TRAINING_TEMPERATURE", 0.8)?,
            training_max_tokens: get_env_or("TRAINING_MAX_TOKENS", 300)?,
            evaluation_temperature: get_env_or("EVALUATION_TEMPERATURE", 0.3)?,
            evaluation_max_tokens: get_env_or("EVALUATION_MAX_TOKENS", 800)?,
            llm_timeout_secs: get_env_or("LLM_TIMEOUT_SECS", 60)?,
            public_rps: get_env_or("PUBLIC_RPS", 20)?,
            admin_rps: get_env_or("ADMIN_RPS", 50)?,
            training_store,
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            admin_email: get_optional_env("ADMIN_EMAIL"),
            admin_password: get_optional_env("ADMIN_PASSWORD"),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        _ => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
