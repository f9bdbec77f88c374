#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::atomic::{AtomicUsize, Ordering},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use quizhub_server::{
    errors::{AppError, AppResult},
    models::domain::{
        attempt::{AttemptStatus, QuizAttempt},
        attempt_question::{AttemptQuestion, NavStatus},
        question::{Difficulty, Question},
    },
    repositories::{
        AttemptQuestionRepository, AttemptRepository, ConceptRepository, NavCounts,
        QuestionRepository,
    },
    services::{
        generation_service::{CandidateQuestion, GenerationRequest, QuestionProvider},
        AttemptService, ScoringService, SourcingService,
    },
};

pub struct InMemoryAttemptRepository {
    attempts: RwLock<HashMap<String, QuizAttempt>>,
}

impl InMemoryAttemptRepository {
    pub fn new() -> Self {
        Self {
            attempts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AttemptRepository for InMemoryAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        let mut attempts = self.attempts.write().await;
        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(attempt)
    }

    async fn find_owned(&self, id: &str, user_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .get(id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn find_active(&self, user_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .find(|a| {
                a.user_id == user_id
                    && matches!(
                        a.status,
                        AttemptStatus::Generating | AttemptStatus::InProgress
                    )
            })
            .cloned())
    }

    async fn recent_completed(
        &self,
        user_id: &str,
        subcategory: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        Ok(attempts
            .values()
            .filter(|a| {
                a.user_id == user_id
                    && a.subcategory == subcategory
                    && a.status == AttemptStatus::Completed
                    && a.completed_at.map(|c| c >= since).unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn completed_for_user(&self, user_id: &str, limit: i64) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self.attempts.read().await;
        let mut completed: Vec<_> = attempts
            .values()
            .filter(|a| a.user_id == user_id && a.status == AttemptStatus::Completed)
            .cloned()
            .collect();
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed.truncate(limit.max(0) as usize);
        Ok(completed)
    }

    async fn update(&self, attempt: &QuizAttempt) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        if !attempts.contains_key(&attempt.id) {
            return Err(AppError::NotFound(format!(
                "Attempt '{}' not found for update",
                attempt.id
            )));
        }
        attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    async fn set_current_index(&self, id: &str, index: i16) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts.get_mut(id) {
            attempt.current_question_index = index;
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: AttemptStatus) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts.get_mut(id) {
            attempt.status = status;
        }
        Ok(())
    }

    async fn set_remaining_seconds(&self, id: &str, remaining: i32) -> AppResult<()> {
        let mut attempts = self.attempts.write().await;
        if let Some(attempt) = attempts.get_mut(id) {
            attempt.remaining_seconds = Some(remaining);
        }
        Ok(())
    }

    async fn increment_violations(&self, id: &str) -> AppResult<i32> {
        let mut attempts = self.attempts.write().await;
        let attempt = attempts
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Attempt '{}' not found", id)))?;
        attempt.tab_violations += 1;
        Ok(attempt.tab_violations)
    }
}

pub struct InMemoryAttemptQuestionRepository {
    records: RwLock<HashMap<String, Vec<AttemptQuestion>>>,
}

impl InMemoryAttemptQuestionRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AttemptQuestionRepository for InMemoryAttemptQuestionRepository {
    async fn rebuild_for_attempt(
        &self,
        attempt_id: &str,
        records: Vec<AttemptQuestion>,
    ) -> AppResult<()> {
        let mut map = self.records.write().await;
        map.insert(attempt_id.to_string(), records);
        Ok(())
    }

    async fn list_for_attempt(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>> {
        let map = self.records.read().await;
        let mut records = map.get(attempt_id).cloned().unwrap_or_default();
        records.sort_by_key(|r| r.question_order);
        Ok(records)
    }

    async fn find_slot(&self, attempt_id: &str, order: i16) -> AppResult<Option<AttemptQuestion>> {
        let map = self.records.read().await;
        Ok(map
            .get(attempt_id)
            .and_then(|records| records.iter().find(|r| r.question_order == order))
            .cloned())
    }

    async fn mark_visited(
        &self,
        attempt_id: &str,
        order: i16,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut map = self.records.write().await;
        if let Some(record) = map
            .get_mut(attempt_id)
            .and_then(|records| records.iter_mut().find(|r| r.question_order == order))
        {
            if record.visited_at.is_none() {
                record.visited_at = Some(at);
            }
        }
        Ok(())
    }

    async fn record_answer(
        &self,
        attempt_id: &str,
        order: i16,
        selected_option: &str,
        is_correct: bool,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut map = self.records.write().await;
        if let Some(record) = map
            .get_mut(attempt_id)
            .and_then(|records| records.iter_mut().find(|r| r.question_order == order))
        {
            record.selected_option = Some(selected_option.to_string());
            record.status = NavStatus::Solved;
            record.is_correct = Some(is_correct);
            record.answered_at = Some(at);
        }
        Ok(())
    }

    async fn mark_skipped(&self, attempt_id: &str, order: i16) -> AppResult<()> {
        let mut map = self.records.write().await;
        if let Some(record) = map
            .get_mut(attempt_id)
            .and_then(|records| records.iter_mut().find(|r| r.question_order == order))
        {
            record.status = NavStatus::Skipped;
            record.selected_option = None;
            record.is_correct = None;
        }
        Ok(())
    }

    async fn mark_review(&self, attempt_id: &str, order: i16) -> AppResult<()> {
        let mut map = self.records.write().await;
        if let Some(record) = map
            .get_mut(attempt_id)
            .and_then(|records| records.iter_mut().find(|r| r.question_order == order))
        {
            record.status = NavStatus::Review;
        }
        Ok(())
    }

    async fn counts(&self, attempt_id: &str) -> AppResult<NavCounts> {
        let map = self.records.read().await;
        let records = map.get(attempt_id).cloned().unwrap_or_default();
        Ok(NavCounts {
            answered: records
                .iter()
                .filter(|r| r.selected_option.is_some())
                .count() as i64,
            correct: records
                .iter()
                .filter(|r| r.is_correct == Some(true))
                .count() as i64,
        })
    }
}

pub struct InMemoryQuestionRepository {
    questions: RwLock<Vec<Question>>,
}

impl InMemoryQuestionRepository {
    pub fn new() -> Self {
        Self {
            questions: RwLock::new(Vec::new()),
        }
    }

    pub async fn seed(&self, question: Question) {
        self.questions.write().await.push(question);
    }

    pub async fn usage_count(&self, question_id: &str) -> Option<i64> {
        let questions = self.questions.read().await;
        questions
            .iter()
            .find(|q| q.id == question_id)
            .map(|q| q.usage_count)
    }

    pub async fn len(&self) -> usize {
        self.questions.read().await.len()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryQuestionRepository {
    async fn sample_unseen(
        &self,
        category: &str,
        subcategory: &str,
        difficulty: Difficulty,
        excluded_texts: &[String],
        limit: usize,
    ) -> AppResult<Vec<Question>> {
        let questions = self.questions.read().await;
        Ok(questions
            .iter()
            .filter(|q| {
                q.category == category
                    && q.subcategory == subcategory
                    && q.difficulty == difficulty
                    && !excluded_texts.contains(&q.question_text)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn exists_by_hash(&self, normalized_hash: &str) -> AppResult<bool> {
        let questions = self.questions.read().await;
        Ok(questions.iter().any(|q| q.normalized_hash == normalized_hash))
    }

    async fn insert(&self, question: &Question) -> AppResult<()> {
        let mut questions = self.questions.write().await;
        if questions
            .iter()
            .any(|q| q.normalized_hash == question.normalized_hash)
        {
            return Err(AppError::DuplicateContent(question.normalized_hash.clone()));
        }
        questions.push(question.clone());
        Ok(())
    }

    async fn increment_usage(&self, question_id: &str) {
        let mut questions = self.questions.write().await;
        if let Some(question) = questions.iter_mut().find(|q| q.id == question_id) {
            question.usage_count += 1;
        }
    }
}

pub struct FixedConceptRepository {
    names: Vec<String>,
}

impl FixedConceptRepository {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }
}

#[async_trait]
impl ConceptRepository for FixedConceptRepository {
    async fn names_for(
        &self,
        _subcategory: &str,
        _difficulty: Difficulty,
    ) -> AppResult<Vec<String>> {
        Ok(self.names.clone())
    }
}

/// Provider that replays a fixed script of batches, one per generate() call.
/// Once the script runs out it returns empty batches.
pub struct ScriptedProvider {
    batches: Mutex<VecDeque<AppResult<Vec<CandidateQuestion>>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(batches: Vec<AppResult<Vec<CandidateQuestion>>>) -> Self {
        Self {
            batches: Mutex::new(batches.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionProvider for ScriptedProvider {
    async fn generate(&self, _request: &GenerationRequest) -> AppResult<Vec<CandidateQuestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut batches = self.batches.lock().expect("script mutex poisoned");
        batches.pop_front().unwrap_or(Ok(Vec::new()))
    }
}

pub struct Harness {
    pub attempts: Arc<InMemoryAttemptRepository>,
    pub attempt_questions: Arc<InMemoryAttemptQuestionRepository>,
    pub questions: Arc<InMemoryQuestionRepository>,
    pub provider: Arc<ScriptedProvider>,
    pub attempt_service: Arc<AttemptService>,
    pub scoring_service: Arc<ScoringService>,
}

pub fn harness(
    concepts: Vec<String>,
    batches: Vec<AppResult<Vec<CandidateQuestion>>>,
) -> Harness {
    let attempts = Arc::new(InMemoryAttemptRepository::new());
    let attempt_questions = Arc::new(InMemoryAttemptQuestionRepository::new());
    let questions = Arc::new(InMemoryQuestionRepository::new());
    let provider = Arc::new(ScriptedProvider::new(batches));

    let sourcing = Arc::new(SourcingService::new(
        questions.clone(),
        Arc::new(FixedConceptRepository::new(concepts)),
        attempts.clone(),
        provider.clone(),
    ));
    let scoring_service = Arc::new(ScoringService::new(
        attempts.clone(),
        attempt_questions.clone(),
    ));
    let attempt_service = Arc::new(AttemptService::new(
        attempts.clone(),
        attempt_questions.clone(),
        sourcing,
        scoring_service.clone(),
    ));

    Harness {
        attempts,
        attempt_questions,
        questions,
        provider,
        attempt_service,
        scoring_service,
    }
}

pub fn candidate(text: &str, correct: &str) -> CandidateQuestion {
    CandidateQuestion {
        question: text.to_string(),
        option_a: "Option one".to_string(),
        option_b: "Option two".to_string(),
        option_c: "Option three".to_string(),
        option_d: "Option four".to_string(),
        correct_answer: correct.to_string(),
        explanation: format!("Explanation for {}", text),
    }
}

pub fn pool_question(text: &str) -> Question {
    Question::new_generated(
        "Programming",
        "Python",
        Difficulty::Easy,
        text,
        ["Option one", "Option two", "Option three", "Option four"],
        "A",
        "Because it is.",
    )
}
