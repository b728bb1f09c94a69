use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use sumika_agents::{DocumentAgent, RenovationAgent, SearchAgent, TransactionAgent, ViewingAgent};
use sumika_core::audit::ActionLog;
use sumika_core::collaborator::CollaboratorClient;
use sumika_core::config::{AppConfig, ClassifierProvider, ConfigError};
use sumika_core::dispatch::{AgentRegistry, TurnDispatcher};
use sumika_core::domain::transaction::ArtifactGenerator;
use sumika_core::domain::viewing::FixedSlotDirectory;
use sumika_core::mediation::{KeywordClassifier, MediationClassifier};
use sumika_db::repositories::SessionStore;
use sumika_db::{
    connect_with_settings, migrations, seed_properties, DbPool, RepositoryError,
    SqlActionLogRepository, SqlPropertyRepository, SqlSessionStore,
};
use sumika_services::{
    AnthropicClient, DocumentApi, HttpCollaboratorClient, LocalArtifactGenerator, ModelClassifier,
    PricingApi, ServiceEndpoints, TourApi,
};

use crate::chat::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("seeding failed: {0}")]
    Seed(#[source] RepositoryError),
}

fn build_classifier(config: &AppConfig) -> Result<Arc<dyn MediationClassifier>, BootstrapError> {
    match config.classifier.provider {
        ClassifierProvider::Keyword => Ok(Arc::new(KeywordClassifier::new())),
        ClassifierProvider::Anthropic => {
            let api_key = config.classifier.api_key.clone().ok_or_else(|| {
                BootstrapError::Config(ConfigError::Validation(
                    "classifier provider `anthropic` requires an api key".to_string(),
                ))
            })?;
            let llm = Arc::new(AnthropicClient::new(api_key, config.classifier.model.clone()));
            Ok(Arc::new(ModelClassifier::new(
                llm,
                Duration::from_secs(config.classifier.timeout_secs),
                config.classifier.max_retries,
            )))
        }
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let seeded = seed_properties(&db_pool).await.map_err(BootstrapError::Seed)?;
    if seeded > 0 {
        info!(
            event_name = "system.bootstrap.properties_seeded",
            correlation_id = "bootstrap",
            count = seeded,
            "seeded development property listings"
        );
    }

    let classifier = build_classifier(&config)?;
    let collaborators: Arc<dyn CollaboratorClient> =
        Arc::new(HttpCollaboratorClient::new(ServiceEndpoints::from(&config.services)));
    let artifacts: Arc<dyn ArtifactGenerator> = Arc::new(LocalArtifactGenerator::default());

    let registry = AgentRegistry::new()
        .register(Arc::new(SearchAgent::new(Arc::new(SqlPropertyRepository::new(
            db_pool.clone(),
        )))))
        .register(Arc::new(
            ViewingAgent::new(Arc::new(FixedSlotDirectory))
                .with_tour_generator(Arc::new(TourApi::new(Arc::clone(&collaborators)))),
        ))
        .register(Arc::new(TransactionAgent::new(Arc::clone(&artifacts))))
        .register(Arc::new(DocumentAgent::new(Arc::new(DocumentApi::new(Arc::clone(
            &collaborators,
        ))))))
        .register(Arc::new(RenovationAgent::new(
            Arc::new(PricingApi::new(Arc::clone(&collaborators))),
            Arc::clone(&artifacts),
        )));

    let registered_routes =
        registry.routes().map(|route| route.as_str()).collect::<Vec<_>>().join(",");
    info!(
        event_name = "system.bootstrap.agents_registered",
        correlation_id = "bootstrap",
        routes = %registered_routes,
        "specialized agents registered"
    );

    let audit: Arc<dyn ActionLog> = Arc::new(SqlActionLogRepository::new(db_pool.clone()));
    let dispatcher = Arc::new(TurnDispatcher::new(classifier, registry, audit));
    let sessions: Arc<dyn SessionStore> = Arc::new(SqlSessionStore::new(db_pool.clone()));

    Ok(Application {
        config,
        db_pool,
        state: AppState { dispatcher, sessions },
    })
}
