use chrono::{DateTime, SecondsFormat, Utc};

pub mod attempt_question_repository;
pub mod attempt_repository;
pub mod concept_repository;
pub mod question_repository;

/// Formats a datetime exactly as chrono's serde stores `DateTime<Utc>`
/// fields (Z suffix, auto subsecond precision). Query bounds and `$set`
/// values must use this form so string comparison against persisted values
/// orders correctly.
pub(crate) fn stored_datetime(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}


pub use attempt_question_repository::{
    AttemptQuestionRepository, MongoAttemptQuestionRepository, NavCounts,
};
pub use attempt_repository::{AttemptRepository, MongoAttemptRepository};
pub use concept_repository::{ConceptRepository, MongoConceptRepository};
pub use question_repository::{MongoQuestionRepository, QuestionRepository};
