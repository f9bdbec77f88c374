use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    attempt::{AttemptStatus, AutoSubmitReason, QuestionSnapshot, QuizAttempt},
    attempt_question::{AttemptQuestion, NavStatus},
    question::Difficulty,
};

/// Snapshot view. Correct answers and explanations are withheld until the
/// attempt is terminal so an in-flight client cannot read them.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDto {
    pub id: i16,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub user_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl SnapshotDto {
    fn from_snapshot(snapshot: &QuestionSnapshot, reveal: bool) -> Self {
        SnapshotDto {
            id: snapshot.id,
            question: snapshot.question.clone(),
            option_a: snapshot.option_a.clone(),
            option_b: snapshot.option_b.clone(),
            option_c: snapshot.option_c.clone(),
            option_d: snapshot.option_d.clone(),
            user_answer: snapshot.user_answer.clone(),
            is_correct: if reveal { snapshot.is_correct } else { None },
            correct_answer: reveal.then(|| snapshot.correct_answer.clone()),
            explanation: reveal.then(|| snapshot.explanation.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavRecordDto {
    pub question_order: i16,
    pub status: NavStatus,
    pub selected_option: Option<String>,
}

impl From<&AttemptQuestion> for NavRecordDto {
    fn from(aq: &AttemptQuestion) -> Self {
        NavRecordDto {
            question_order: aq.question_order,
            status: aq.status,
            selected_option: aq.selected_option.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptDto {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub status: AttemptStatus,
    pub total_questions: i16,
    pub current_question_index: i16,
    pub questions: Vec<SnapshotDto>,
    pub navigation: Vec<NavRecordDto>,
    pub time_limit_seconds: i32,
    pub remaining_seconds: Option<i32>,
    pub is_auto_submitted: bool,
    pub auto_submit_reason: AutoSubmitReason,
    pub score: f64,
    pub correct_answers: i16,
    pub attempted_questions: i16,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AttemptDto {
    pub fn from_attempt(attempt: &QuizAttempt, navigation: &[AttemptQuestion]) -> Self {
        let reveal = attempt.is_terminal();
        AttemptDto {
            id: attempt.id.clone(),
            category: attempt.category.clone(),
            subcategory: attempt.subcategory.clone(),
            difficulty: attempt.difficulty,
            status: attempt.status,
            total_questions: attempt.total_questions,
            current_question_index: attempt.current_question_index,
            questions: attempt
                .questions
                .iter()
                .map(|s| SnapshotDto::from_snapshot(s, reveal))
                .collect(),
            navigation: navigation.iter().map(NavRecordDto::from).collect(),
            time_limit_seconds: attempt.time_limit_seconds,
            remaining_seconds: attempt.remaining_seconds,
            is_auto_submitted: attempt.is_auto_submitted,
            auto_submit_reason: attempt.auto_submit_reason,
            score: attempt.score,
            correct_answers: attempt.correct_answers,
            attempted_questions: attempt.attempted_questions,
            completed_at: attempt.completed_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcomeDto {
    pub completed: bool,
    pub attempt: AttemptDto,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViolationResponse {
    Warning { count: i32 },
    AutoSubmitted { attempt: AttemptDto },
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsDto {
    pub attempt: AttemptDto,
    pub total: i16,
    pub correct: i16,
    pub incorrect: i16,
    pub percentage: f64,
    pub grade: &'static str,
    pub time_taken_seconds: i32,
}

/// Grade bands used on the results page.
pub fn grade_for(percentage: f64) -> &'static str {
    if percentage >= 90.0 {
        "A+"
    } else if percentage >= 80.0 {
        "A"
    } else if percentage >= 70.0 {
        "B"
    } else if percentage >= 60.0 {
        "C"
    } else {
        "F"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceSummaryDto {
    pub total_completed: i64,
    pub average_score: f64,
    pub best_score: f64,
    pub overall_accuracy: f64,
    pub avg_seconds_per_question: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptSummaryDto {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub status: AttemptStatus,
    pub score: f64,
    pub total_questions: i16,
    pub correct_answers: i16,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&QuizAttempt> for AttemptSummaryDto {
    fn from(attempt: &QuizAttempt) -> Self {
        AttemptSummaryDto {
            id: attempt.id.clone(),
            category: attempt.category.clone(),
            subcategory: attempt.subcategory.clone(),
            difficulty: attempt.difficulty,
            status: attempt.status,
            score: attempt.score,
            total_questions: attempt.total_questions,
            correct_answers: attempt.correct_answers,
            completed_at: attempt.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::attempt::QuizAttempt;

    fn attempt_with_snapshot(status: AttemptStatus) -> QuizAttempt {
        let mut attempt = QuizAttempt::new_shell(
            "user-1",
            "Geography",
            "Capitals",
            Difficulty::Easy,
            1,
            600,
        );
        attempt.status = status;
        attempt.questions.push(QuestionSnapshot {
            id: 1,
            question: "Capital of France?".to_string(),
            option_a: "Paris".to_string(),
            option_b: "London".to_string(),
            option_c: "Rome".to_string(),
            option_d: "Berlin".to_string(),
            correct_answer: "A".to_string(),
            explanation: "Paris is the capital.".to_string(),
            user_answer: None,
            is_correct: None,
            question_ref: None,
        });
        attempt
    }

    #[test]
    fn in_progress_attempt_redacts_correct_answers() {
        let attempt = attempt_with_snapshot(AttemptStatus::InProgress);
        let dto = AttemptDto::from_attempt(&attempt, &[]);

        assert!(dto.questions[0].correct_answer.is_none());
        assert!(dto.questions[0].explanation.is_none());
    }

    #[test]
    fn completed_attempt_reveals_correct_answers() {
        let attempt = attempt_with_snapshot(AttemptStatus::Completed);
        let dto = AttemptDto::from_attempt(&attempt, &[]);

        assert_eq!(dto.questions[0].correct_answer.as_deref(), Some("A"));
        assert_eq!(
            dto.questions[0].explanation.as_deref(),
            Some("Paris is the capital.")
        );
    }

    #[test]
    fn grade_bands() {
        assert_eq!(grade_for(95.0), "A+");
        assert_eq!(grade_for(90.0), "A+");
        assert_eq!(grade_for(80.0), "A");
        assert_eq!(grade_for(70.0), "B");
        assert_eq!(grade_for(60.0), "C");
        assert_eq!(grade_for(59.99), "F");
    }
}
