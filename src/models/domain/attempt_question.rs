use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavStatus {
    Unvisited,
    Solved,
    Review,
    Skipped,
}

/// Per-question navigation state for one attempt slot, keyed by
/// (attempt_id, question_order). This is the authoritative record for
/// answered/correct counts; the snapshot list is read-only reference data.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct AttemptQuestion {
    pub id: String,
    pub attempt_id: String,
    /// Canonical pool question, when the slot was filled from the pool.
    pub question_id: Option<String>,
    pub question_order: i16,
    pub selected_option: Option<String>,
    pub status: NavStatus,
    pub is_correct: Option<bool>,
    pub visited_at: Option<DateTime<Utc>>,
    pub answered_at: Option<DateTime<Utc>>,
}

impl AttemptQuestion {
    pub fn unvisited(attempt_id: &str, question_id: Option<String>, question_order: i16) -> Self {
        AttemptQuestion {
            id: Uuid::new_v4().to_string(),
            attempt_id: attempt_id.to_string(),
            question_id,
            question_order,
            selected_option: None,
            status: NavStatus::Unvisited,
            is_correct: None,
            visited_at: None,
            answered_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unvisited_record_has_no_selection_or_timestamps() {
        let aq = AttemptQuestion::unvisited("attempt-1", Some("q-1".to_string()), 3);

        assert_eq!(aq.status, NavStatus::Unvisited);
        assert_eq!(aq.question_order, 3);
        assert!(aq.selected_option.is_none());
        assert!(aq.is_correct.is_none());
        assert!(aq.visited_at.is_none());
        assert!(aq.answered_at.is_none());
    }

    #[test]
    fn nav_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&NavStatus::Unvisited).unwrap(),
            "\"unvisited\""
        );
        assert_eq!(
            serde_json::to_string(&NavStatus::Review).unwrap(),
            "\"review\""
        );
    }
}
