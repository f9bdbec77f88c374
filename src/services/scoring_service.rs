use chrono::Utc;
use std::sync::Arc;

use crate::{
    errors::AppResult,
    models::{
        domain::attempt::{AttemptStatus, QuizAttempt},
        dto::response::{
            grade_for, AttemptDto, AttemptSummaryDto, PerformanceSummaryDto, ResultsDto,
        },
    },
    repositories::{AttemptQuestionRepository, AttemptRepository},
};

/// Percentage score rounded to two decimals; 0 for an empty quiz.
pub fn compute_score(correct: i64, total_questions: i16) -> f64 {
    if total_questions <= 0 {
        return 0.0;
    }
    let raw = correct as f64 * 100.0 / total_questions as f64;
    (raw * 100.0).round() / 100.0
}

pub struct ScoringService {
    attempts: Arc<dyn AttemptRepository>,
    attempt_questions: Arc<dyn AttemptQuestionRepository>,
}

impl ScoringService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        attempt_questions: Arc<dyn AttemptQuestionRepository>,
    ) -> Self {
        Self {
            attempts,
            attempt_questions,
        }
    }

    /// Freezes an attempt's results. Counts come from the navigation records,
    /// not the snapshot list. Already-Completed attempts are left untouched,
    /// so a second invocation never moves score or completed_at.
    pub async fn finalize(&self, attempt: &mut QuizAttempt) -> AppResult<()> {
        if attempt.status == AttemptStatus::Completed {
            return Ok(());
        }

        let counts = self.attempt_questions.counts(&attempt.id).await?;
        let now = Utc::now();

        attempt.attempted_questions = counts.answered as i16;
        attempt.correct_answers = counts.correct as i16;
        attempt.score = compute_score(counts.correct, attempt.total_questions);

        attempt.status = AttemptStatus::Completed;
        attempt.completed_at = Some(now);
        attempt.paused_at = None;

        // Wall-clock elapsed time is authoritative over any accumulated
        // pause bookkeeping.
        attempt.time_taken_seconds = attempt
            .started_at
            .map(|started| (now - started).num_seconds().max(0) as i32)
            .unwrap_or(0);
        attempt.time_spent_seconds = attempt.time_taken_seconds;
        attempt.modified_at = Some(now);

        self.attempts.update(attempt).await?;

        log::info!(
            "Finalized attempt {}: {}/{} correct, score {}",
            attempt.id,
            attempt.correct_answers,
            attempt.total_questions,
            attempt.score
        );
        Ok(())
    }

    pub async fn results(&self, attempt: &QuizAttempt) -> AppResult<ResultsDto> {
        let navigation = self.attempt_questions.list_for_attempt(&attempt.id).await?;
        let total = attempt.total_questions;
        let correct = attempt.correct_answers;

        Ok(ResultsDto {
            attempt: AttemptDto::from_attempt(attempt, &navigation),
            total,
            correct,
            incorrect: total - correct,
            percentage: attempt.score,
            grade: grade_for(attempt.score),
            time_taken_seconds: attempt.time_taken_seconds,
        })
    }

    pub async fn recent_completed(
        &self,
        user_id: &str,
        limit: i64,
    ) -> AppResult<Vec<AttemptSummaryDto>> {
        let attempts = self.attempts.completed_for_user(user_id, limit).await?;
        Ok(attempts.iter().map(AttemptSummaryDto::from).collect())
    }

    pub async fn performance_summary(&self, user_id: &str) -> AppResult<PerformanceSummaryDto> {
        let completed = self.attempts.completed_for_user(user_id, 1000).await?;

        if completed.is_empty() {
            return Ok(PerformanceSummaryDto {
                total_completed: 0,
                average_score: 0.0,
                best_score: 0.0,
                overall_accuracy: 0.0,
                avg_seconds_per_question: 0.0,
            });
        }

        let total = completed.len() as i64;
        let score_sum: f64 = completed.iter().map(|a| a.score).sum();
        let best = completed.iter().map(|a| a.score).fold(0.0_f64, f64::max);
        let correct_sum: i64 = completed.iter().map(|a| a.correct_answers as i64).sum();
        let attempted_sum: i64 = completed.iter().map(|a| a.attempted_questions as i64).sum();
        let time_sum: i64 = completed.iter().map(|a| a.time_taken_seconds as i64).sum();

        let accuracy = if attempted_sum > 0 {
            (correct_sum as f64 / attempted_sum as f64) * 100.0
        } else {
            0.0
        };
        let seconds_per_question = if attempted_sum > 0 {
            time_sum as f64 / attempted_sum as f64
        } else {
            0.0
        };

        Ok(PerformanceSummaryDto {
            total_completed: total,
            average_score: (score_sum / total as f64 * 100.0).round() / 100.0,
            best_score: best,
            overall_accuracy: (accuracy * 100.0).round() / 100.0,
            avg_seconds_per_question: (seconds_per_question * 100.0).round() / 100.0,
        })
    }
}
