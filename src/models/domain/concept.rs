use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::Difficulty;

/// A named concept tag for a subcategory/difficulty pair. Generation prompts
/// sample from these to steer freshly generated questions.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Concept {
    pub id: String,
    pub subcategory: String,
    pub difficulty: Difficulty,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Concept {
    pub fn new(subcategory: &str, difficulty: Difficulty, name: &str) -> Self {
        Concept {
            id: Uuid::new_v4().to_string(),
            subcategory: subcategory.to_string(),
            difficulty,
            name: name.to_string(),
            created_at: Some(Utc::now()),
        }
    }
}
