use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::question::{Difficulty, Question},
};

/// Content-addressed question pool. Insertion is rejected for duplicate
/// canonical hashes; usage bumps are best-effort telemetry.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Up to `limit` pool questions for the topic/difficulty whose raw text
    /// is not in `excluded_texts`, in random order.
    async fn sample_unseen(
        &self,
        category: &str,
        subcategory: &str,
        difficulty: Difficulty,
        excluded_texts: &[String],
        limit: usize,
    ) -> AppResult<Vec<Question>>;

    async fn exists_by_hash(&self, normalized_hash: &str) -> AppResult<bool>;

    /// Persists a new question. Fails with `DuplicateContent` when a question
    /// with the same canonical hash already exists.
    async fn insert(&self, question: &Question) -> AppResult<()>;

    /// Fire-and-forget usage-counter bump. Failures are logged, never
    /// surfaced to the caller.
    async fn increment_usage(&self, question_id: &str);
}

pub struct MongoQuestionRepository {
    collection: Collection<Question>,
}

impl MongoQuestionRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("questions");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for questions collection");

        let hash_index = IndexModel::builder()
            .keys(doc! { "normalized_hash": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("normalized_hash_unique".to_string())
                    .build(),
            )
            .build();

        let topic_index = IndexModel::builder()
            .keys(doc! { "subcategory": 1, "difficulty": 1 })
            .options(
                IndexOptions::builder()
                    .name("subcategory_difficulty".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(hash_index).await?;
        self.collection.create_index(topic_index).await?;

        log::info!("Successfully created indexes for questions collection");
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for MongoQuestionRepository {
    async fn sample_unseen(
        &self,
        category: &str,
        subcategory: &str,
        difficulty: Difficulty,
        excluded_texts: &[String],
        limit: usize,
    ) -> AppResult<Vec<Question>> {
        let filter = doc! {
            "category": category,
            "subcategory": subcategory,
            "difficulty": difficulty.as_str(),
            "question_text": { "$nin": excluded_texts },
        };

        let pipeline = vec![
            doc! { "$match": filter },
            doc! { "$sample": { "size": limit as i64 } },
        ];

        let docs: Vec<Document> = self
            .collection
            .aggregate(pipeline)
            .await?
            .try_collect()
            .await?;

        let mut questions = Vec::with_capacity(docs.len());
        for document in docs {
            let question: Question = from_document(document)
                .map_err(|e| crate::errors::AppError::DatabaseError(e.to_string()))?;
            questions.push(question);
        }
        Ok(questions)
    }

    async fn exists_by_hash(&self, normalized_hash: &str) -> AppResult<bool> {
        let existing = self
            .collection
            .find_one(doc! { "normalized_hash": normalized_hash })
            .await?;
        Ok(existing.is_some())
    }

    async fn insert(&self, question: &Question) -> AppResult<()> {
        // The unique hash index turns a racing duplicate insert into a
        // DuplicateContent error via the From<mongodb::error::Error> mapping.
        self.collection.insert_one(question).await?;
        Ok(())
    }

    async fn increment_usage(&self, question_id: &str) {
        let result = self
            .collection
            .update_one(
                doc! { "id": question_id },
                doc! { "$inc": { "usage_count": 1 } },
            )
            .await;

        if let Err(e) = result {
            log::warn!(
                "Failed to bump usage_count for question {}: {}",
                question_id,
                e
            );
        }
    }
}
