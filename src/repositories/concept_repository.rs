use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::Database,
    errors::AppResult,
    models::domain::{concept::Concept, question::Difficulty},
};

#[async_trait]
pub trait ConceptRepository: Send + Sync {
    /// Concept tag names for a subcategory/difficulty pair.
    async fn names_for(&self, subcategory: &str, difficulty: Difficulty)
        -> AppResult<Vec<String>>;
}

pub struct MongoConceptRepository {
    collection: Collection<Concept>,
}

impl MongoConceptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("concepts");
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for concepts collection");

        let tag_index = IndexModel::builder()
            .keys(doc! { "subcategory": 1, "difficulty": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("subcategory_difficulty_name_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(tag_index).await?;

        log::info!("Successfully created indexes for concepts collection");
        Ok(())
    }
}

#[async_trait]
impl ConceptRepository for MongoConceptRepository {
    async fn names_for(
        &self,
        subcategory: &str,
        difficulty: Difficulty,
    ) -> AppResult<Vec<String>> {
        let concepts: Vec<Concept> = self
            .collection
            .find(doc! {
                "subcategory": subcategory,
                "difficulty": difficulty.as_str(),
            })
            .await?
            .try_collect()
            .await?;
        Ok(concepts.into_iter().map(|c| c.name).collect())
    }
}
