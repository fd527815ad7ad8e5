pub mod auth_dto;
pub mod dashboard_dto;
pub mod job_dto;
pub mod recruiting_dto;
pub mod rrhh_dto;
pub mod training_dto;
