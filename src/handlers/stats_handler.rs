use actix_web::{get, web, HttpResponse};
use serde::Deserialize;

use crate::{app_state::AppState, auth::AuthenticatedUser, errors::AppError};

#[derive(Debug, Deserialize)]
struct RecentQuery {
    limit: Option<i64>,
}

#[get("/api/attempts/recent")]
pub async fn recent_attempts(
    state: web::Data<AppState>,
    query: web::Query<RecentQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let limit = query.limit.unwrap_or(10).clamp(1, 50);
    let attempts = state
        .scoring_service
        .recent_completed(&auth.user_id, limit)
        .await?;
    Ok(HttpResponse::Ok().json(attempts))
}

#[get("/api/performance")]
pub async fn performance_summary(
    state: web::Data<AppState>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let summary = state
        .scoring_service
        .performance_summary(&auth.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    state.db.health_check().await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "ok" })))
}
