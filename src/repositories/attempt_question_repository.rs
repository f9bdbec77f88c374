use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::attempt_question::{AttemptQuestion, NavStatus},
};

/// Counts derived from navigation records; the authoritative inputs to
/// finalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavCounts {
    pub answered: i64,
    pub correct: i64,
}

#[async_trait]
pub trait AttemptQuestionRepository: Send + Sync {
    /// Idempotent rebuild: drops any existing records for the attempt and
    /// recreates one Unvisited record per slot.
    async fn rebuild_for_attempt(&self, attempt_id: &str, records: Vec<AttemptQuestion>)
        -> AppResult<()>;

    async fn list_for_attempt(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>>;

    async fn find_slot(&self, attempt_id: &str, order: i16) -> AppResult<Option<AttemptQuestion>>;

    /// Sets visited_at if not already set. Visited is monotonic: set once,
    /// never cleared.
    async fn mark_visited(&self, attempt_id: &str, order: i16, at: DateTime<Utc>)
        -> AppResult<()>;

    async fn record_answer(
        &self,
        attempt_id: &str,
        order: i16,
        selected_option: &str,
        is_correct: bool,
        at: DateTime<Utc>,
    ) -> AppResult<()>;

    /// Marks the slot Skipped and clears any prior selection.
    async fn mark_skipped(&self, attempt_id: &str, order: i16) -> AppResult<()>;

    /// Marks the slot Review, preserving any existing selection.
    async fn mark_review(&self, attempt_id: &str, order: i16) -> AppResult<()>;

    async fn counts(&self, attempt_id: &str) -> AppResult<NavCounts>;
}

pub struct MongoAttemptQuestionRepository {
    collection: Collection<AttemptQuestion>,
}

impl MongoAttemptQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("attempt_questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for attempt_questions collection");

        let slot_index = IndexModel::builder()
            .keys(doc! { "attempt_id": 1, "question_order": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("attempt_order_unique".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "attempt_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("attempt_status".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(slot_index).await?;
        self.collection.create_index(status_index).await?;

        log::info!("Successfully created indexes for attempt_questions collection");
        Ok(())
    }
}

fn nav_status_str(status: NavStatus) -> &'static str {
    match status {
        NavStatus::Unvisited => "unvisited",
        NavStatus::Solved => "solved",
        NavStatus::Review => "review",
        NavStatus::Skipped => "skipped",
    }
}

#[async_trait]
impl AttemptQuestionRepository for MongoAttemptQuestionRepository {
    async fn rebuild_for_attempt(
        &self,
        attempt_id: &str,
        records: Vec<AttemptQuestion>,
    ) -> AppResult<()> {
        self.collection
            .delete_many(doc! { "attempt_id": attempt_id })
            .await?;
        if !records.is_empty() {
            self.collection.insert_many(&records).await?;
        }
        Ok(())
    }

    async fn list_for_attempt(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>> {
        let records = self
            .collection
            .find(doc! { "attempt_id": attempt_id })
            .sort(doc! { "question_order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(records)
    }

    async fn find_slot(&self, attempt_id: &str, order: i16) -> AppResult<Option<AttemptQuestion>> {
        let record = self
            .collection
            .find_one(doc! { "attempt_id": attempt_id, "question_order": order as i32 })
            .await?;
        Ok(record)
    }

    async fn mark_visited(
        &self,
        attempt_id: &str,
        order: i16,
        at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.collection
            .update_one(
                doc! {
                    "attempt_id": attempt_id,
                    "question_order": order as i32,
                    "visited_at": null,
                },
                doc! { "$set": { "visited_at": super::stored_datetime(at) } },
            )
            .await?;
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
        self.collection
            .update_one(
                doc! { "attempt_id": attempt_id, "question_order": order as i32 },
                doc! { "$set": {
                    "selected_option": selected_option,
                    "status": nav_status_str(NavStatus::Solved),
                    "is_correct": is_correct,
                    "answered_at": super::stored_datetime(at),
                } },
            )
            .await?;
        Ok(())
    }

    async fn mark_skipped(&self, attempt_id: &str, order: i16) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "attempt_id": attempt_id, "question_order": order as i32 },
                doc! { "$set": {
                    "status": nav_status_str(NavStatus::Skipped),
                    "selected_option": null,
                    "is_correct": null,
                } },
            )
            .await?;
        Ok(())
    }

    async fn mark_review(&self, attempt_id: &str, order: i16) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "attempt_id": attempt_id, "question_order": order as i32 },
                doc! { "$set": { "status": nav_status_str(NavStatus::Review) } },
            )
            .await?;
        Ok(())
    }

    async fn counts(&self, attempt_id: &str) -> AppResult<NavCounts> {
        let answered = self
            .collection
            .count_documents(doc! {
                "attempt_id": attempt_id,
                "selected_option": { "$ne": null },
            })
            .await?;
        let correct = self
            .collection
            .count_documents(doc! { "attempt_id": attempt_id, "is_correct": true })
            .await?;
        Ok(NavCounts {
            answered: answered as i64,
            correct: correct as i64,
        })
    }
}
