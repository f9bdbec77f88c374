use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::attempt::{AttemptStatus, QuizAttempt},
};

#[async_trait]
pub trait AttemptRepository: Send + Sync {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;

    /// Attempt by id, scoped to its owner.
    async fn find_owned(&self, id: &str, user_id: &str) -> AppResult<Option<QuizAttempt>>;

    /// The user's Generating or InProgress attempt, if any. Backed by the
    /// (user_id, status) index; enforces the one-active-attempt invariant.
    async fn find_active(&self, user_id: &str) -> AppResult<Option<QuizAttempt>>;

    /// Completed attempts for the user and subcategory since `since`; feeds
    /// the sourcing seen-set.
    async fn recent_completed(
        &self,
        user_id: &str,
        subcategory: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<QuizAttempt>>;

    /// Completed attempts for the user, newest first.
    async fn completed_for_user(&self, user_id: &str, limit: i64) -> AppResult<Vec<QuizAttempt>>;

    /// Full-document write for multi-field transitions (populate, finalize).
    async fn update(&self, attempt: &QuizAttempt) -> AppResult<()>;

    async fn set_current_index(&self, id: &str, index: i16) -> AppResult<()>;

    async fn set_status(&self, id: &str, status: AttemptStatus) -> AppResult<()>;

    async fn set_remaining_seconds(&self, id: &str, remaining: i32) -> AppResult<()>;

    /// Atomically bumps the violation counter and returns the new count.
    async fn increment_violations(&self, id: &str) -> AppResult<i32>;
}

pub struct MongoAttemptRepository {
    collection: Collection<QuizAttempt>,
}

fn status_str(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Generating => "generating",
        AttemptStatus::InProgress => "in_progress",
        AttemptStatus::Completed => "completed",
        AttemptStatus::Abandoned => "abandoned",
    }
}

impl MongoAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("quiz_attempts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_status_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "status": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_status".to_string())
                    .build(),
            )
            .build();

        let user_subcategory_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "subcategory": 1, "completed_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_subcategory_completed".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(user_status_index).await?;
        self.collection.create_index(user_subcategory_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

#[async_trait]
impl AttemptRepository for MongoAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_owned(&self, id: &str, user_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! { "id": id, "user_id": user_id })
            .await?;
        Ok(attempt)
    }

    async fn find_active(&self, user_id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "user_id": user_id,
                "status": { "$in": ["generating", "in_progress"] },
            })
            .await?;
        Ok(attempt)
    }

    async fn recent_completed(
        &self,
        user_id: &str,
        subcategory: &str,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! {
                "user_id": user_id,
                "subcategory": subcategory,
                "status": "completed",
                "completed_at": { "$gte": super::stored_datetime(since) },
            })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn completed_for_user(&self, user_id: &str, limit: i64) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! { "user_id": user_id, "status": "completed" })
            .sort(doc! { "completed_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn update(&self, attempt: &QuizAttempt) -> AppResult<()> {
        let result = self
            .collection
            .replace_one(doc! { "id": &attempt.id }, attempt)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!(
                "Attempt '{}' not found for update",
                attempt.id
            )));
        }
        Ok(())
    }

    async fn set_current_index(&self, id: &str, index: i16) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "current_question_index": index as i32 } },
            )
            .await?;
        Ok(())
    }

    async fn set_status(&self, id: &str, status: AttemptStatus) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "status": status_str(status) } },
            )
            .await?;
        Ok(())
    }

    async fn set_remaining_seconds(&self, id: &str, remaining: i32) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "id": id },
                doc! { "$set": { "remaining_seconds": remaining } },
            )
            .await?;
        Ok(())
    }

    async fn increment_violations(&self, id: &str) -> AppResult<i32> {
        let updated = self
            .collection
            .find_one_and_update(
                doc! { "id": id },
                doc! { "$inc": { "tab_violations": 1 } },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Attempt '{}' not found", id)))?;
        Ok(updated.tab_violations)
    }
}
