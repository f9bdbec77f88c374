pub mod anomaly;
pub mod attempt_locks;
pub mod attempt_service;
pub mod generation_service;
pub mod scoring_service;
pub mod sourcing_service;

pub use anomaly::{AnomalyDetector, ViolationVerdict, TAB_VIOLATION_THRESHOLD};
pub use attempt_locks::AttemptLocks;
pub use attempt_service::{AttemptService, ViolationOutcome};
pub use generation_service::{OpenAiQuestionProvider, QuestionProvider};
pub use scoring_service::ScoringService;
pub use sourcing_service::SourcingService;
