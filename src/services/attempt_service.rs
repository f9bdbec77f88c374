use chrono::{Duration, Utc};
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::{
        domain::{
            attempt::{
                AttemptStatus, AutoSubmitReason, QuizAttempt, DEFAULT_TIME_LIMIT_SECONDS,
                DEFAULT_TOTAL_QUESTIONS,
            },
            attempt_question::AttemptQuestion,
        },
        dto::request::StartAttemptRequest,
    },
    repositories::{AttemptQuestionRepository, AttemptRepository},
    services::{
        anomaly::{AnomalyDetector, ViolationVerdict},
        attempt_locks::AttemptLocks,
        scoring_service::ScoringService,
        sourcing_service::SourcingService,
    },
};

/// A Generating attempt older than this is treated as implicitly abandoned
/// when the user starts a new one (closed the tab before sourcing finished).
pub const STALE_GENERATING_MINUTES: i64 = 10;

#[derive(Debug, Clone)]
pub enum ViolationOutcome {
    Warning(i32),
    AutoSubmitted {
        attempt: QuizAttempt,
        navigation: Vec<AttemptQuestion>,
    },
}

/// Owns the attempt lifecycle: Generating -> InProgress -> Completed or
/// Abandoned, plus per-question navigation and timer bookkeeping. Every
/// mutating operation serializes on the attempt's lock.
pub struct AttemptService {
    attempts: Arc<dyn AttemptRepository>,
    attempt_questions: Arc<dyn AttemptQuestionRepository>,
    sourcing: Arc<SourcingService>,
    scoring: Arc<ScoringService>,
    locks: AttemptLocks,
    detector: AnomalyDetector,
}

fn parse_option_letter(raw: &str) -> AppResult<String> {
    let letter = raw.trim().to_uppercase();
    match letter.as_str() {
        "A" | "B" | "C" | "D" => Ok(letter),
        _ => Err(AppError::ValidationError(format!(
            "answer must be one of A/B/C/D, got '{}'",
            raw
        ))),
    }
}

impl AttemptService {
    pub fn new(
        attempts: Arc<dyn AttemptRepository>,
        attempt_questions: Arc<dyn AttemptQuestionRepository>,
        sourcing: Arc<SourcingService>,
        scoring: Arc<ScoringService>,
    ) -> Self {
        Self {
            attempts,
            attempt_questions,
            sourcing,
            scoring,
            locks: AttemptLocks::new(),
            detector: AnomalyDetector::default(),
        }
    }

    async fn navigation(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>> {
        self.attempt_questions.list_for_attempt(attempt_id).await
    }

    async fn load_owned(&self, attempt_id: &str, user_id: &str) -> AppResult<QuizAttempt> {
        self.attempts
            .find_owned(attempt_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt '{}' not found", attempt_id)))
    }

    fn require_in_progress(attempt: &QuizAttempt) -> AppResult<()> {
        if attempt.status != AttemptStatus::InProgress {
            return Err(AppError::StateError(format!(
                "operation requires an in-progress attempt, status is {:?}",
                attempt.status
            )));
        }
        Ok(())
    }

    /// Creates a new attempt shell in Generating status. Fails with
    /// ActiveAttemptExists when the user already has a live attempt, except
    /// that a stale Generating attempt is reaped and replaced.
    pub async fn start(
        &self,
        user_id: &str,
        request: StartAttemptRequest,
    ) -> AppResult<QuizAttempt> {
        request.validate()?;

        if let Some(active) = self.attempts.find_active(user_id).await? {
            let stale_cutoff = Utc::now() - Duration::minutes(STALE_GENERATING_MINUTES);
            let is_stale_generating = active.status == AttemptStatus::Generating
                && active
                    .created_at
                    .map(|created| created < stale_cutoff)
                    .unwrap_or(true);

            if is_stale_generating {
                log::info!(
                    "Reaping stale generating attempt {} for user {}",
                    active.id,
                    user_id
                );
                self.attempts
                    .set_status(&active.id, AttemptStatus::Abandoned)
                    .await?;
            } else {
                return Err(AppError::ActiveAttemptExists(active.id));
            }
        }

        let attempt = QuizAttempt::new_shell(
            user_id,
            &request.category,
            &request.subcategory,
            request.difficulty,
            request.total_questions.unwrap_or(DEFAULT_TOTAL_QUESTIONS),
            request
                .time_limit_seconds
                .unwrap_or(DEFAULT_TIME_LIMIT_SECONDS),
        );

        self.attempts.create(attempt).await
    }

    /// Runs sourcing and moves the attempt to InProgress. Navigation records
    /// are rebuilt idempotently, one Unvisited record per slot. Sourcing
    /// failure abandons the attempt and surfaces the error.
    pub async fn populate(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;

        // Re-entry after a success (page reload during redirect) is a no-op.
        if attempt.status == AttemptStatus::InProgress && !attempt.questions.is_empty() {
            let navigation = self.navigation(attempt_id).await?;
            return Ok((attempt, navigation));
        }
        if attempt.status != AttemptStatus::Generating {
            return Err(AppError::StateError(format!(
                "attempt cannot be populated from status {:?}",
                attempt.status
            )));
        }

        let snapshots = match self.sourcing.assemble(&attempt).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                log::warn!("Sourcing failed for attempt {}: {}", attempt_id, e);
                self.attempts
                    .set_status(attempt_id, AttemptStatus::Abandoned)
                    .await?;
                self.locks.release(attempt_id).await;
                return Err(e);
            }
        };

        let records: Vec<AttemptQuestion> = snapshots
            .iter()
            .enumerate()
            .map(|(order, snapshot)| {
                AttemptQuestion::unvisited(&attempt.id, snapshot.question_ref.clone(), order as i16)
            })
            .collect();

        attempt.questions = snapshots;
        attempt.status = AttemptStatus::InProgress;
        attempt.modified_at = Some(Utc::now());
        self.attempts.update(&attempt).await?;
        self.attempt_questions
            .rebuild_for_attempt(&attempt.id, records.clone())
            .await?;

        Ok((attempt, records))
    }

    /// The attempt with its navigation records, marking the current slot
    /// visited (visited is set once, never cleared).
    pub async fn current_question(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let attempt = self.load_owned(attempt_id, user_id).await?;

        if attempt.status == AttemptStatus::InProgress {
            self.attempt_questions
                .mark_visited(&attempt.id, attempt.current_question_index, Utc::now())
                .await?;
        }

        let navigation = self.attempt_questions.list_for_attempt(&attempt.id).await?;
        Ok((attempt, navigation))
    }

    /// Records an answer on both the navigation record and the snapshot,
    /// advances the cursor, and finalizes when every slot is answered.
    /// Returns (completed, attempt, navigation).
    pub async fn submit_answer(
        &self,
        attempt_id: &str,
        user_id: &str,
        raw_answer: &str,
    ) -> AppResult<(bool, QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;

        if attempt.is_auto_submitted {
            return Err(AppError::AlreadySubmitted);
        }
        Self::require_in_progress(&attempt)?;

        let letter = parse_option_letter(raw_answer)?;

        let index = attempt.current_question_index;
        let slot = self
            .attempt_questions
            .find_slot(&attempt.id, index)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No question state at position {}", index))
            })?;

        let snapshot = attempt
            .questions
            .get_mut(index as usize)
            .ok_or_else(|| AppError::StateError("no question at current position".to_string()))?;

        let is_correct = letter == snapshot.correct_answer;
        snapshot.user_answer = Some(letter.clone());
        snapshot.is_correct = Some(is_correct);

        self.attempt_questions
            .record_answer(&attempt.id, slot.question_order, &letter, is_correct, Utc::now())
            .await?;

        attempt.current_question_index += 1;
        attempt.modified_at = Some(Utc::now());
        self.attempts.update(&attempt).await?;

        let counts = self.attempt_questions.counts(&attempt.id).await?;
        let completed = counts.answered >= attempt.total_questions as i64;
        if completed {
            self.scoring.finalize(&mut attempt).await?;
            self.locks.release(attempt_id).await;
        }

        let navigation = self.navigation(attempt_id).await?;
        Ok((completed, attempt, navigation))
    }

    /// Marks the current slot Skipped, clearing any prior selection, and
    /// advances the cursor. No answer required.
    pub async fn skip(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        let index = attempt.current_question_index;
        self.attempt_questions
            .find_slot(&attempt.id, index)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No question state at position {}", index))
            })?;

        self.attempt_questions.mark_skipped(&attempt.id, index).await?;

        attempt.current_question_index += 1;
        self.attempts
            .set_current_index(&attempt.id, attempt.current_question_index)
            .await?;

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Marks the current slot Review, preserving any existing selection, and
    /// advances the cursor.
    pub async fn mark_for_review(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        let index = attempt.current_question_index;
        self.attempt_questions
            .find_slot(&attempt.id, index)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No question state at position {}", index))
            })?;

        self.attempt_questions.mark_review(&attempt.id, index).await?;

        attempt.current_question_index += 1;
        self.attempts
            .set_current_index(&attempt.id, attempt.current_question_index)
            .await?;

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Moves the cursor back one slot, clamped at 0. Never changes
    /// per-question status.
    pub async fn previous(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        if attempt.current_question_index > 0 {
            attempt.current_question_index -= 1;
            self.attempts
                .set_current_index(&attempt.id, attempt.current_question_index)
                .await?;
        }

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Sets the cursor to `target_index` when it is within range; requests
    /// out of range are silently ignored.
    pub async fn jump(
        &self,
        attempt_id: &str,
        user_id: &str,
        target_index: i16,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        if target_index >= 0 && target_index < attempt.total_questions {
            attempt.current_question_index = target_index;
            self.attempts
                .set_current_index(&attempt.id, target_index)
                .await?;
        }

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Quit-and-end: accumulates elapsed time into time_spent_seconds, sets
    /// the pause marker, and transitions to Abandoned. Pausing and quitting
    /// are the same terminal action.
    pub async fn pause(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        let now = Utc::now();
        if let (Some(started), None) = (attempt.started_at, attempt.paused_at) {
            attempt.time_spent_seconds += (now - started).num_seconds().max(0) as i32;
        }
        attempt.paused_at = Some(now);
        attempt.status = AttemptStatus::Abandoned;
        attempt.completed_at = Some(now);
        attempt.modified_at = Some(now);

        self.attempts.update(&attempt).await?;
        self.locks.release(attempt_id).await;
        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Clears the pause marker on a still-InProgress attempt so elapsed-time
    /// accounting restarts from now.
    pub async fn resume(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        if attempt.paused_at.is_some() {
            attempt.paused_at = None;
            attempt.modified_at = Some(Utc::now());
            self.attempts.update(&attempt).await?;
        }

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// Stores the client-reported countdown for display restore after a
    /// reload. Never feeds score or elapsed-time computation. Returns false
    /// when the attempt is no longer in progress and the ping was ignored.
    pub async fn save_timer_snapshot(
        &self,
        attempt_id: &str,
        user_id: &str,
        remaining_seconds: i32,
    ) -> AppResult<bool> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let attempt = self.load_owned(attempt_id, user_id).await?;
        if attempt.status != AttemptStatus::InProgress {
            return Ok(false);
        }

        self.attempts
            .set_remaining_seconds(attempt_id, remaining_seconds.max(0))
            .await?;
        Ok(true)
    }

    /// Timer-expiry auto-submit. Idempotent on terminal attempts.
    pub async fn submit_time_up(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        if !attempt.is_terminal() {
            attempt.is_auto_submitted = true;
            attempt.auto_submit_reason = AutoSubmitReason::TimeUp;
            self.scoring.finalize(&mut attempt).await?;
            self.locks.release(attempt_id).await;
        }

        let navigation = self.navigation(attempt_id).await?;
        Ok((attempt, navigation))
    }

    /// One suspicious client event (tab/window blur). Below the threshold
    /// the new count is persisted and returned as a warning; at the
    /// threshold the attempt is force-finalized and flagged for review.
    pub async fn report_violation(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<ViolationOutcome> {
        let lock = self.locks.acquire(attempt_id).await;
        let _guard = lock.lock().await;

        let mut attempt = self.load_owned(attempt_id, user_id).await?;
        Self::require_in_progress(&attempt)?;

        let count = self.attempts.increment_violations(&attempt.id).await?;
        attempt.tab_violations = count;

        match self.detector.assess(count) {
            ViolationVerdict::Warn(count) => Ok(ViolationOutcome::Warning(count)),
            ViolationVerdict::ForceSubmit => {
                log::warn!(
                    "Attempt {} hit the violation threshold ({}), auto-submitting",
                    attempt.id,
                    count
                );
                attempt.is_auto_submitted = true;
                attempt.auto_submit_reason = AutoSubmitReason::TabSwitch;
                attempt.flagged_for_review = true;
                self.scoring.finalize(&mut attempt).await?;
                self.locks.release(attempt_id).await;
                let navigation = self.navigation(attempt_id).await?;
                Ok(ViolationOutcome::AutoSubmitted {
                    attempt,
                    navigation,
                })
            }
        }
    }

    /// Read-only fetch for results and review pages.
    pub async fn get_attempt(
        &self,
        attempt_id: &str,
        user_id: &str,
    ) -> AppResult<(QuizAttempt, Vec<AttemptQuestion>)> {
        let attempt = self.load_owned(attempt_id, user_id).await?;
        let navigation = self.attempt_questions.list_for_attempt(&attempt.id).await?;
        Ok((attempt, navigation))
    }
}
