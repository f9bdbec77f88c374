use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{JumpRequest, SaveTimerRequest, StartAttemptRequest, SubmitAnswerRequest},
        response::{AttemptDto, SubmitOutcomeDto, ViolationResponse},
    },
    services::ViolationOutcome,
};

#[post("/api/attempts")]
pub async fn start_attempt(
    state: web::Data<AppState>,
    request: web::Json<StartAttemptRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let attempt = state
        .attempt_service
        .start(&auth.user_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(AttemptDto::from_attempt(&attempt, &[])))
}

#[post("/api/attempts/{id}/questions")]
pub async fn populate_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state.attempt_service.populate(&id, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[get("/api/attempts/{id}")]
pub async fn get_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state
        .attempt_service
        .current_question(&id, &auth.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/answer")]
pub async fn submit_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let (completed, attempt, navigation) = state
        .attempt_service
        .submit_answer(&id, &auth.user_id, &request.answer)
        .await?;
    Ok(HttpResponse::Ok().json(SubmitOutcomeDto {
        completed,
        attempt: AttemptDto::from_attempt(&attempt, &navigation),
    }))
}

#[post("/api/attempts/{id}/skip")]
pub async fn skip_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state.attempt_service.skip(&id, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/review")]
pub async fn mark_for_review(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state
        .attempt_service
        .mark_for_review(&id, &auth.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/previous")]
pub async fn previous_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state.attempt_service.previous(&id, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/jump")]
pub async fn jump_to_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<JumpRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state
        .attempt_service
        .jump(&id, &auth.user_id, request.index)
        .await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/pause")]
pub async fn pause_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state.attempt_service.pause(&id, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/resume")]
pub async fn resume_attempt(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state.attempt_service.resume(&id, &auth.user_id).await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/timer")]
pub async fn save_timer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SaveTimerRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let saved = state
        .attempt_service
        .save_timer_snapshot(&id, &auth.user_id, request.remaining_seconds)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "saved": saved })))
}

#[post("/api/attempts/{id}/time-up")]
pub async fn time_up(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, navigation) = state
        .attempt_service
        .submit_time_up(&id, &auth.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(AttemptDto::from_attempt(&attempt, &navigation)))
}

#[post("/api/attempts/{id}/violations")]
pub async fn report_violation(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let outcome = state
        .attempt_service
        .report_violation(&id, &auth.user_id)
        .await?;

    let response = match outcome {
        ViolationOutcome::Warning(count) => ViolationResponse::Warning { count },
        ViolationOutcome::AutoSubmitted {
            attempt,
            navigation,
        } => ViolationResponse::AutoSubmitted {
            attempt: AttemptDto::from_attempt(&attempt, &navigation),
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

#[get("/api/attempts/{id}/results")]
pub async fn get_results(
    state: web::Data<AppState>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let (attempt, _navigation) = state
        .attempt_service
        .get_attempt(&id, &auth.user_id)
        .await?;

    if !attempt.is_terminal() {
        return Err(AppError::StateError(
            "results are only available for finished attempts".to_string(),
        ));
    }

    let results = state.scoring_service.results(&attempt).await?;
    Ok(HttpResponse::Ok().json(results))
}
