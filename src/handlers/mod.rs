use actix_web::web;

pub mod attempt_handler;
pub mod stats_handler;

/// Registers every route. `/api/attempts/recent` must precede
/// `/api/attempts/{id}` so "recent" is not captured as an attempt id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(stats_handler::health)
        .service(stats_handler::recent_attempts)
        .service(stats_handler::performance_summary)
        .service(attempt_handler::start_attempt)
        .service(attempt_handler::populate_attempt)
        .service(attempt_handler::submit_answer)
        .service(attempt_handler::skip_question)
        .service(attempt_handler::mark_for_review)
        .service(attempt_handler::previous_question)
        .service(attempt_handler::jump_to_question)
        .service(attempt_handler::pause_attempt)
        .service(attempt_handler::resume_attempt)
        .service(attempt_handler::save_timer)
        .service(attempt_handler::time_up)
        .service(attempt_handler::report_violation)
        .service(attempt_handler::get_results)
        .service(attempt_handler::get_attempt);
}
