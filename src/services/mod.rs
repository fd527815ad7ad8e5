pub mod application_service;
pub mod auth_service;
pub mod campaign_service;
pub mod candidate_service;
pub mod employee_service;
pub mod job_service;
pub mod llm_service;
pub mod training_prompts;
pub mod training_service;
pub mod training_store;
