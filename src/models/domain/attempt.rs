use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::{Difficulty, Question};

pub const DEFAULT_TOTAL_QUESTIONS: i16 = 10;
pub const DEFAULT_TIME_LIMIT_SECONDS: i32 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Generating,
    InProgress,
    Completed,
    Abandoned,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSubmitReason {
    None,
    TimeUp,
    TabSwitch,
}

/// A self-contained copy of a question's content embedded in an attempt at
/// sourcing time. `user_answer`/`is_correct` mirror the navigation record for
/// the results view; the navigation table stays authoritative.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionSnapshot {
    pub id: i16,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub explanation: String,
    pub user_answer: Option<String>,
    pub is_correct: Option<bool>,
    /// Canonical pool question backing this snapshot, when one exists.
    pub question_ref: Option<String>,
}

impl QuestionSnapshot {
    pub fn from_question(id: i16, question: &Question) -> Self {
        QuestionSnapshot {
            id,
            question: question.question_text.clone(),
            option_a: question.option_a.clone(),
            option_b: question.option_b.clone(),
            option_c: question.option_c.clone(),
            option_d: question.option_d.clone(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
            user_answer: None,
            is_correct: None,
            question_ref: Some(question.id.clone()),
        }
    }

    pub fn option_text(&self, letter: &str) -> Option<&str> {
        match letter {
            "A" => Some(&self.option_a),
            "B" => Some(&self.option_b),
            "C" => Some(&self.option_c),
            "D" => Some(&self.option_d),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizAttempt {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub status: AttemptStatus,
    pub total_questions: i16,
    pub current_question_index: i16,
    pub questions: Vec<QuestionSnapshot>,

    pub time_limit_seconds: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub time_spent_seconds: i32,
    pub time_taken_seconds: i32,
    pub remaining_seconds: Option<i32>,

    pub score: f64,
    pub correct_answers: i16,
    pub attempted_questions: i16,

    pub tab_violations: i32,
    pub is_auto_submitted: bool,
    pub auto_submit_reason: AutoSubmitReason,
    pub flagged_for_review: bool,

    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    pub fn new_shell(
        user_id: &str,
        category: &str,
        subcategory: &str,
        difficulty: Difficulty,
        total_questions: i16,
        time_limit_seconds: i32,
    ) -> Self {
        QuizAttempt {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            difficulty,
            status: AttemptStatus::Generating,
            total_questions,
            current_question_index: 0,
            questions: Vec::new(),
            time_limit_seconds,
            started_at: Some(Utc::now()),
            paused_at: None,
            time_spent_seconds: 0,
            time_taken_seconds: 0,
            remaining_seconds: None,
            score: 0.0,
            correct_answers: 0,
            attempted_questions: 0,
            tab_violations: 0,
            is_auto_submitted: false,
            auto_submit_reason: AutoSubmitReason::None,
            flagged_for_review: false,
            completed_at: None,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            AttemptStatus::Completed | AttemptStatus::Abandoned
        )
    }

    pub fn current_snapshot(&self) -> Option<&QuestionSnapshot> {
        let idx = self.current_question_index;
        if idx >= 0 {
            self.questions.get(idx as usize)
        } else {
            None
        }
    }
}
