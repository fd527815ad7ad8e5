pub mod application;
pub mod campaign;
pub mod candidate;
pub mod employee;
pub mod job;
pub mod training;
pub mod user;
