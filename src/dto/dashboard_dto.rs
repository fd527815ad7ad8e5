use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_candidates: i64,
    pub applications_by_status: HashMap<String, i64>,
    pub published_jobs: i64,
    pub active_campaigns: i64,
    pub training_sessions_last_7_days: i64,
    pub average_training_score: Option<f64>,
    pub candidates_last_7_days: Vec<DailyCount>,
}
