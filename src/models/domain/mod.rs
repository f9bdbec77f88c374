pub mod attempt;
pub mod attempt_question;
pub mod concept;
pub mod question;

pub use attempt::{AttemptStatus, AutoSubmitReason, QuestionSnapshot, QuizAttempt};
pub use attempt_question::{AttemptQuestion, NavStatus};
pub use concept::Concept;
pub use question::{Difficulty, Question};
