use serde::Deserialize;
use validator::Validate;

use crate::models::domain::question::Difficulty;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartAttemptRequest {
    #[validate(length(min = 1, max = 150))]
    pub category: String,

    #[validate(length(min = 1, max = 150))]
    pub subcategory: String,

    pub difficulty: Difficulty,

    #[validate(range(min = 1, max = 50))]
    pub total_questions: Option<i16>,

    #[validate(range(min = 30, max = 7200))]
    pub time_limit_seconds: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, max = 1))]
    pub answer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JumpRequest {
    pub index: i16,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveTimerRequest {
    #[validate(range(min = 0))]
    pub remaining_seconds: i32,
}
