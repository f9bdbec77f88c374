use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{
        attempt::{QuestionSnapshot, QuizAttempt},
        question::Question,
    },
    repositories::{AttemptRepository, ConceptRepository, QuestionRepository},
    services::generation_service::{GenerationRequest, QuestionProvider},
};

/// Questions a user completed within this window are excluded from reuse.
pub const SEEN_WINDOW_DAYS: i64 = 7;
/// Generation retry budget per sourcing run.
pub const MAX_GENERATION_RETRIES: u32 = 3;

/// Fills attempts with deduplicated questions, mixing pool reuse and fresh
/// generation.
pub struct SourcingService {
    questions: Arc<dyn QuestionRepository>,
    concepts: Arc<dyn ConceptRepository>,
    attempts: Arc<dyn AttemptRepository>,
    provider: Arc<dyn QuestionProvider>,
}

/// Shuffles the four options of a snapshot and re-derives the correct-answer
/// letter by matching the option text, not the original letter.
pub fn shuffle_mcq<R: Rng>(snapshot: &mut QuestionSnapshot, rng: &mut R) {
    let correct_text = snapshot
        .option_text(&snapshot.correct_answer)
        .unwrap_or(&snapshot.option_a)
        .to_string();

    let mut options = [
        snapshot.option_a.clone(),
        snapshot.option_b.clone(),
        snapshot.option_c.clone(),
        snapshot.option_d.clone(),
    ];
    options.shuffle(rng);

    let letters = ["A", "B", "C", "D"];
    for (idx, text) in options.iter().enumerate() {
        if *text == correct_text {
            snapshot.correct_answer = letters[idx].to_string();
        }
    }

    let [a, b, c, d] = options;
    snapshot.option_a = a;
    snapshot.option_b = b;
    snapshot.option_c = c;
    snapshot.option_d = d;
}

impl SourcingService {
    pub fn new(
        questions: Arc<dyn QuestionRepository>,
        concepts: Arc<dyn ConceptRepository>,
        attempts: Arc<dyn AttemptRepository>,
        provider: Arc<dyn QuestionProvider>,
    ) -> Self {
        Self {
            questions,
            concepts,
            attempts,
            provider,
        }
    }

    /// Assembles the full snapshot list for an attempt: pool reuse first,
    /// then bounded generation, then a global shuffle and 1..N renumbering.
    /// Fails with `InsufficientQuestions` when the retry budget runs out
    /// short of `total_questions`.
    pub async fn assemble(&self, attempt: &QuizAttempt) -> AppResult<Vec<QuestionSnapshot>> {
        let required = attempt.total_questions.max(0) as usize;
        let seen = self.seen_texts(attempt).await?;
        let seen_list: Vec<String> = seen.iter().cloned().collect();

        let mut snapshots: Vec<QuestionSnapshot> = Vec::with_capacity(required);
        let mut used_hashes: HashSet<String> = HashSet::new();

        let pool = self
            .questions
            .sample_unseen(
                &attempt.category,
                &attempt.subcategory,
                attempt.difficulty,
                &seen_list,
                required,
            )
            .await?;

        log::info!(
            "Sourcing attempt {}: {} unseen pool questions available (need {})",
            attempt.id,
            pool.len(),
            required
        );

        for question in pool {
            if snapshots.len() >= required {
                break;
            }
            if !used_hashes.insert(question.normalized_hash.clone()) {
                continue;
            }
            self.questions.increment_usage(&question.id).await;
            let mut snapshot =
                QuestionSnapshot::from_question((snapshots.len() + 1) as i16, &question);
            shuffle_mcq(&mut snapshot, &mut rand::thread_rng());
            snapshots.push(snapshot);
        }

        if snapshots.len() < required {
            self.generate_remaining(attempt, required, &seen, &mut used_hashes, &mut snapshots)
                .await?;
        }

        if snapshots.len() < required {
            return Err(AppError::InsufficientQuestions {
                obtained: snapshots.len(),
                required,
            });
        }

        // Interleave reused and freshly generated questions, then renumber.
        snapshots.shuffle(&mut rand::thread_rng());
        for (idx, snapshot) in snapshots.iter_mut().enumerate() {
            snapshot.id = (idx + 1) as i16;
        }

        Ok(snapshots)
    }

    /// Question texts this user completed for the subcategory in the last
    /// seven days.
    async fn seen_texts(&self, attempt: &QuizAttempt) -> AppResult<HashSet<String>> {
        let since = Utc::now() - Duration::days(SEEN_WINDOW_DAYS);
        let recent = self
            .attempts
            .recent_completed(&attempt.user_id, &attempt.subcategory, since)
            .await?;

        Ok(recent
            .iter()
            .flat_map(|a| a.questions.iter().map(|q| q.question.clone()))
            .collect())
    }

    async fn generate_remaining(
        &self,
        attempt: &QuizAttempt,
        required: usize,
        seen: &HashSet<String>,
        used_hashes: &mut HashSet<String>,
        snapshots: &mut Vec<QuestionSnapshot>,
    ) -> AppResult<()> {
        let mut retries = 0;

        while snapshots.len() < required && retries < MAX_GENERATION_RETRIES {
            retries += 1;
            let needed = required - snapshots.len();

            let names = self
                .concepts
                .names_for(&attempt.subcategory, attempt.difficulty)
                .await?;

            if names.len() < needed {
                // Concept bank too small to steer generation; the shortfall
                // check in assemble() decides whether that is fatal.
                log::warn!(
                    "Only {} concepts for {}/{} but {} questions needed, stopping generation",
                    names.len(),
                    attempt.subcategory,
                    attempt.difficulty,
                    needed
                );
                break;
            }

            let selected: Vec<String> = {
                let mut rng = rand::thread_rng();
                names.choose_multiple(&mut rng, needed).cloned().collect()
            };

            let request = GenerationRequest {
                topic: attempt.subcategory.clone(),
                category: attempt.category.clone(),
                difficulty: attempt.difficulty,
                count: needed,
                concepts: selected,
            };

            let candidates = match self.provider.generate(&request).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    log::warn!(
                        "Generation retry {}/{} for attempt {} failed: {}",
                        retries,
                        MAX_GENERATION_RETRIES,
                        attempt.id,
                        e
                    );
                    continue;
                }
            };

            for candidate in candidates {
                if snapshots.len() >= required {
                    break;
                }

                let hash = Question::content_hash(&candidate.question);
                if used_hashes.contains(&hash) || seen.contains(&candidate.question) {
                    continue;
                }
                if self.questions.exists_by_hash(&hash).await? {
                    continue;
                }

                let question = Question::new_generated(
                    &attempt.category,
                    &attempt.subcategory,
                    attempt.difficulty,
                    &candidate.question,
                    [
                        &candidate.option_a,
                        &candidate.option_b,
                        &candidate.option_c,
                        &candidate.option_d,
                    ],
                    &candidate.correct_answer,
                    &candidate.explanation,
                );

                match self.questions.insert(&question).await {
                    Ok(()) => {}
                    // Lost a race with another sourcing run; the content is
                    // in the pool, skip the candidate.
                    Err(AppError::DuplicateContent(_)) => continue,
                    Err(e) => return Err(e),
                }

                used_hashes.insert(hash);
                let mut snapshot =
                    QuestionSnapshot::from_question((snapshots.len() + 1) as i16, &question);
                shuffle_mcq(&mut snapshot, &mut rand::thread_rng());
                snapshots.push(snapshot);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::attempt::QuestionSnapshot;

    fn capitals_snapshot() -> QuestionSnapshot {
        QuestionSnapshot {
            id: 1,
            question: "Capital of France?".to_string(),
            option_a: "Paris".to_string(),
            option_b: "London".to_string(),
            option_c: "Rome".to_string(),
            option_d: "Berlin".to_string(),
            correct_answer: "A".to_string(),
            explanation: String::new(),
            user_answer: None,
            is_correct: None,
            question_ref: None,
        }
    }

    #[test]
    fn shuffle_preserves_correctness_mapping() {
        for _ in 0..50 {
            let mut snapshot = capitals_snapshot();
            shuffle_mcq(&mut snapshot, &mut rand::thread_rng());

            let correct_text = snapshot
                .option_text(&snapshot.correct_answer)
                .expect("correct_answer stays within A-D");
            assert_eq!(correct_text, "Paris");
        }
    }

    #[test]
    fn shuffle_keeps_all_four_options() {
        let mut snapshot = capitals_snapshot();
        shuffle_mcq(&mut snapshot, &mut rand::thread_rng());

        let mut options = vec![
            snapshot.option_a.clone(),
            snapshot.option_b.clone(),
            snapshot.option_c.clone(),
            snapshot.option_d.clone(),
        ];
        options.sort();
        assert_eq!(options, vec!["Berlin", "London", "Paris", "Rome"]);
    }

    #[test]
    fn shuffle_handles_non_first_correct_option() {
        for _ in 0..50 {
            let mut snapshot = capitals_snapshot();
            snapshot.correct_answer = "C".to_string();
            shuffle_mcq(&mut snapshot, &mut rand::thread_rng());

            let correct_text = snapshot.option_text(&snapshot.correct_answer).unwrap();
            assert_eq!(correct_text, "Rome");
        }
    }
}
