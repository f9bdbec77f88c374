use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoAttemptQuestionRepository, MongoAttemptRepository, MongoConceptRepository,
        MongoQuestionRepository,
    },
    services::{AttemptService, OpenAiQuestionProvider, ScoringService, SourcingService},
};

#[derive(Clone)]
pub struct AppState {
    pub attempt_service: Arc<AttemptService>,
    pub scoring_service: Arc<ScoringService>,
    pub db: Arc<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let question_repository = Arc::new(MongoQuestionRepository::new(&db));
        question_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoAttemptRepository::new(&db));
        attempt_repository.ensure_indexes().await?;

        let attempt_question_repository = Arc::new(MongoAttemptQuestionRepository::new(&db));
        attempt_question_repository.ensure_indexes().await?;

        let concept_repository = Arc::new(MongoConceptRepository::new(&db));

        let provider = Arc::new(OpenAiQuestionProvider::new(&config)?);

        let sourcing_service = Arc::new(SourcingService::new(
            question_repository,
            concept_repository,
            attempt_repository.clone(),
            provider,
        ));
        let scoring_service = Arc::new(ScoringService::new(
            attempt_repository.clone(),
            attempt_question_repository.clone(),
        ));
        let attempt_service = Arc::new(AttemptService::new(
            attempt_repository,
            attempt_question_repository,
            sourcing_service,
            scoring_service.clone(),
        ));

        Ok(Self {
            attempt_service,
            scoring_service,
            db: Arc::new(db),
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
