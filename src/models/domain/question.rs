use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").expect("NON_ALNUM is a valid regex pattern"));
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE is a valid regex pattern"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pooled question: immutable content shared across attempts, deduplicated
/// by the canonical hash of its normalized text. Only `usage_count` ever
/// changes after insertion.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Question {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: String,
    pub explanation: String,
    pub normalized_hash: String,
    pub source: QuestionSource,
    pub usage_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Ai,
    Manual,
}

impl Question {
    /// Lowercase, strip punctuation, collapse whitespace.
    pub fn normalize(text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped = NON_ALNUM.replace_all(&lowered, "");
        WHITESPACE.replace_all(&stripped, " ").trim().to_string()
    }

    /// Canonical fingerprint used for pool deduplication.
    pub fn content_hash(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize(text).as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn new_generated(
        category: &str,
        subcategory: &str,
        difficulty: Difficulty,
        question_text: &str,
        options: [&str; 4],
        correct_answer: &str,
        explanation: &str,
    ) -> Self {
        Question {
            id: Uuid::new_v4().to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            difficulty,
            question_text: question_text.to_string(),
            option_a: options[0].to_string(),
            option_b: options[1].to_string(),
            option_c: options[2].to_string(),
            option_d: options[3].to_string(),
            correct_answer: correct_answer.to_string(),
            explanation: explanation.to_string(),
            normalized_hash: Self::content_hash(question_text),
            source: QuestionSource::Ai,
            usage_count: 1,
            created_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(
            Question::normalize("  What is   Rust's \"ownership\"?? "),
            "what is rusts ownership"
        );
    }

    #[test]
    fn content_hash_ignores_formatting_differences() {
        let a = Question::content_hash("What is a borrow checker?");
        let b = Question::content_hash("what   is a Borrow Checker!");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_for_different_content() {
        let a = Question::content_hash("What is a trait?");
        let b = Question::content_hash("What is a struct?");
        assert_ne!(a, b);
    }

    #[test]
    fn new_generated_sets_hash_and_initial_usage() {
        let q = Question::new_generated(
            "Programming",
            "Python",
            Difficulty::Easy,
            "What does len() return?",
            ["An int", "A str", "A list", "A dict"],
            "A",
            "len() returns an integer count.",
        );

        assert_eq!(q.usage_count, 1);
        assert_eq!(q.source, QuestionSource::Ai);
        assert_eq!(
            q.normalized_hash,
            Question::content_hash("What does len() return?")
        );
    }
}
