pub mod applications;
pub mod auth;
pub mod campaigns;
pub mod candidates;
pub mod dashboard;
pub mod health;
pub mod jobs;
pub mod openapi;
pub mod rrhh;
pub mod training;
pub mod training_admin;
