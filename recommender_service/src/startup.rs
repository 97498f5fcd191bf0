use actix_web::{
    dev::Server,
    web::{self, Data},
    App, HttpServer,
};
use common::{helper::error_chain_fmt, telemetry::TelemetryError};
use qdrant_client::Qdrant;
use std::{net::TcpListener, sync::Arc, time::Duration};
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{QdrantSettings, Settings},
    domain::services::huggingface_embedding::{
        parse_model_type, HuggingFaceEmbeddingsService, HuggingFaceEmbeddingsServiceError,
    },
    ports::{
        embedding_provider::EmbeddingProvider,
        vector_index::{VectorIndex, VectorIndexError},
    },
    repositories::item_point_qdrant_repository::ItemPointQdrantRepository,
    routes::{bulk_ingest, health_check, related, upsert},
    use_cases::{ingest_items::IngestItemsUseCase, related_items::RelatedItemsUseCase},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

impl Application {
    /// Builds the application on its production backends: Qdrant and a Hugging Face model
    ///
    /// The model is loaded (and downloaded on the first run) before the server binds its port.
    #[tracing::instrument(name = "Building application", skip(settings))]
    pub async fn build(settings: Settings) -> Result<Self, ApplicationError> {
        let model_type = parse_model_type(&settings.embeddings.model)?;
        let embeddings_service = HuggingFaceEmbeddingsService::try_new(model_type).await?;

        let qdrant_client = get_qdrant_client(&settings.qdrant)?;
        let item_point_repository =
            ItemPointQdrantRepository::new(qdrant_client, &settings.qdrant.collection);

        Self::build_with_backends(
            settings,
            Arc::new(embeddings_service),
            Arc::new(item_point_repository),
        )
        .await
    }

    /// Builds the application on the given backends
    ///
    /// The collection is provisioned before serving: the application refuses to start
    /// if an existing collection does not match the embeddings dimension or the distance.
    #[tracing::instrument(
        name = "Building application with backends",
        skip(settings, embeddings_provider, vector_index)
    )]
    pub async fn build_with_backends(
        settings: Settings,
        embeddings_provider: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Result<Self, ApplicationError> {
        let batch_size = settings
            .ingestion
            .batch_size()
            .map_err(ApplicationError::InvalidConfiguration)?;

        vector_index
            .ensure_collection(
                embeddings_provider.dimension() as u64,
                settings.qdrant.distance,
            )
            .await?;

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let related_items = RelatedItemsUseCase::new(vector_index.clone());
        let ingest_items = IngestItemsUseCase::new(embeddings_provider, vector_index)
            .with_batch_size(batch_size)
            .with_wait_for_single_upsert(settings.ingestion.wait_for_single_upsert);

        let server = run(listener, settings, related_items, ingest_items)?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!(port = self.port, "Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
pub fn run(
    listener: TcpListener,
    settings: Settings,
    related_items: RelatedItemsUseCase,
    ingest_items: IngestItemsUseCase,
) -> Result<Server, std::io::Error> {
    // Wraps the use cases in a `actix_web::Data` (`Arc`) to share them among all workers
    let related_items = Data::new(related_items);
    let ingest_items = Data::new(ingest_items);
    let max_payload_bytes = settings.application.max_payload_bytes;

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().limit(max_payload_bytes))
            .route("/health", web::get().to(health_check))
            .route("/related/{content_id}", web::get().to(related))
            .route("/upsert", web::post().to(upsert))
            .route("/bulk_ingest", web::post().to(bulk_ingest))
            .app_data(related_items.clone())
            .app_data(ingest_items.clone())
    })
    .listen(listener)?
    .run();

    // No await
    Ok(server)
}

/// Set up a client to Qdrant, over gRPC
pub fn get_qdrant_client(config: &QdrantSettings) -> Result<Qdrant, ApplicationError> {
    Qdrant::from_url(&config.get_grpc_base_url())
        .timeout(Duration::from_secs(config.timeout_secs))
        .api_key(config.api_key())
        .build()
        .map_err(|e| ApplicationError::QdrantError(e.to_string()))
}

#[derive(thiserror::Error)]
pub enum ApplicationError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    TelemetryError(#[from] TelemetryError),
    #[error("Failed to read the configuration: {0}")]
    ConfigurationLoadingError(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(transparent)]
    HuggingFaceEmbeddingsServiceError(#[from] HuggingFaceEmbeddingsServiceError),
    #[error("Error from Qdrant: {0}")]
    QdrantError(String),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
}

impl std::fmt::Debug for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
