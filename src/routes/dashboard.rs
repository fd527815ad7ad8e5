use axum::{extract::State, response::Json};

use crate::{
    dto::dashboard_dto::{DailyCount, DashboardStats},
    error::Result,
    AppState,
};

const TRAINING_WINDOW_DAYS: i64 = 7;

#[axum::debug_handler]
pub async fn get_dashboard_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    let (
        total_candidates,
        applications_by_status,
        published_jobs,
        active_campaigns,
        training,
        history,
    ) = tokio::try_join!(
        state.candidate_service.count(),
        state.application_service.status_counts(),
        state.job_service.count_published(),
        state.campaign_service.count_active(),
        state.training_service.recent_stats(TRAINING_WINDOW_DAYS),
        state.candidate_service.get_history_counts(),
    )?;

    Ok(Json(DashboardStats {
        total_candidates,
        applications_by_status,
        published_jobs,
        active_campaigns,
        training_sessions_last_7_days: training.started,
        average_training_score: training.average_score,
        candidates_last_7_days: history
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect(),
    }))
}
