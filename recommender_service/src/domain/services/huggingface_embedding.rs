use async_trait::async_trait;
use common::helper::error_chain_fmt;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModel, SentenceEmbeddingsModelType,
};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use crate::{
    domain::entities::index_point::Embeddings,
    ports::embedding_provider::{EmbeddingProvider, EmbeddingProviderError},
};

/// Number of encode requests that can wait for the runner before senders are suspended
const RUNNER_QUEUE_SIZE: usize = 100;

/// Service generating sentence embeddings with a model available from Hugging Face.
///
/// The model lives on a dedicated thread (the runner): encoding is CPU-bound and must not
/// run on the async executor serving the requests. Requests are sent to the runner through
/// a bounded channel, and each one carries a oneshot sender for its embeddings.
pub struct HuggingFaceEmbeddingsService {
    sender_to_runner: mpsc::Sender<RunnerMessage>,
    dimension: usize,
    _thread_handle: JoinHandle<()>,
}

impl HuggingFaceEmbeddingsService {
    /// Spawns the runner and waits until the model is loaded.
    ///
    /// The model files are downloaded on the first run and cached afterwards.
    #[tracing::instrument(name = "Loading the embeddings model", skip(model_type))]
    pub async fn try_new(
        model_type: SentenceEmbeddingsModelType,
    ) -> Result<Self, HuggingFaceEmbeddingsServiceError> {
        let (sender, receiver) = mpsc::channel(RUNNER_QUEUE_SIZE);
        let (ready_sender, ready_receiver) = oneshot::channel();

        let handle = thread::Builder::new()
            .name("embeddings-runner".into())
            .spawn(move || Self::runner(model_type, receiver, ready_sender))?;

        let dimension = ready_receiver
            .await
            .map_err(|_| HuggingFaceEmbeddingsServiceError::RunnerStopped)??;

        Ok(Self {
            sender_to_runner: sender,
            dimension,
            _thread_handle: handle,
        })
    }

    /// The runner itself, on its own thread, owning the model.
    ///
    /// It stops once every sender is dropped, ie when the service is dropped.
    fn runner(
        model_type: SentenceEmbeddingsModelType,
        mut receiver: mpsc::Receiver<RunnerMessage>,
        ready: oneshot::Sender<Result<usize, HuggingFaceEmbeddingsServiceError>>,
    ) {
        let (model, dimension) = match Self::load_model(model_type) {
            Ok(loaded) => loaded,
            Err(error) => {
                error!(?error, "Failed to load the embeddings model");
                let _ = ready.send(Err(error));
                return;
            }
        };
        info!(dimension, "Embeddings model loaded ✅");

        if ready.send(Ok(dimension)).is_err() {
            return;
        }

        while let Some((texts, sender)) = receiver.blocking_recv() {
            let embeddings = model.encode(texts.as_slice()).map_err(|e| e.to_string());

            // The requester may have been cancelled in the meantime
            let _ = sender.send(embeddings);
        }

        info!("Embeddings runner stopped");
    }

    fn load_model(
        model_type: SentenceEmbeddingsModelType,
    ) -> Result<(SentenceEmbeddingsModel, usize), HuggingFaceEmbeddingsServiceError> {
        let model = SentenceEmbeddingsBuilder::remote(model_type)
            .create_model()
            .map_err(|e| HuggingFaceEmbeddingsServiceError::ModelError(e.to_string()))?;

        // The dimension is the one of any produced vector
        let dimension = model
            .encode(&["dimension probe"])
            .map_err(|e| HuggingFaceEmbeddingsServiceError::ModelError(e.to_string()))?
            .first()
            .map(Vec::len)
            .ok_or_else(|| {
                HuggingFaceEmbeddingsServiceError::ModelError(
                    "the model did not produce any vector".into(),
                )
            })?;

        Ok((model, dimension))
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbeddingsService {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[tracing::instrument(name = "Generating embeddings", skip(self, texts), fields(nb_texts = texts.len()))]
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Embeddings>, EmbeddingProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let expected = texts.len();

        let (sender, receiver) = oneshot::channel();
        self.sender_to_runner
            .send((texts, sender))
            .await
            .map_err(|_| EmbeddingProviderError::RunnerStopped)?;

        let embeddings = receiver
            .await
            .map_err(|_| EmbeddingProviderError::RunnerStopped)?
            .map_err(EmbeddingProviderError::ModelError)?;

        if embeddings.len() != expected {
            return Err(EmbeddingProviderError::UnexpectedOutput {
                expected,
                actual: embeddings.len(),
            });
        }

        Ok(embeddings)
    }
}

/// Resolves a model name from the configuration.
///
/// Accepts the Hugging Face name, with or without the `sentence-transformers/` prefix.
pub fn parse_model_type(
    name: &str,
) -> Result<SentenceEmbeddingsModelType, HuggingFaceEmbeddingsServiceError> {
    let short_name = name.trim().trim_start_matches("sentence-transformers/");

    match short_name.to_lowercase().as_str() {
        "all-minilm-l12-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL12V2),
        "all-minilm-l6-v2" => Ok(SentenceEmbeddingsModelType::AllMiniLmL6V2),
        "all-distilroberta-v1" => Ok(SentenceEmbeddingsModelType::AllDistilrobertaV1),
        "bert-base-nli-mean-tokens" => Ok(SentenceEmbeddingsModelType::BertBaseNliMeanTokens),
        "distiluse-base-multilingual-cased" => {
            Ok(SentenceEmbeddingsModelType::DistiluseBaseMultilingualCased)
        }
        "paraphrase-albert-small-v2" => Ok(SentenceEmbeddingsModelType::ParaphraseAlbertSmallV2),
        "sentence-t5-base" => Ok(SentenceEmbeddingsModelType::SentenceT5Base),
        _ => Err(HuggingFaceEmbeddingsServiceError::UnknownModel(
            name.to_string(),
        )),
    }
}

#[derive(thiserror::Error)]
pub enum HuggingFaceEmbeddingsServiceError {
    #[error("Unknown embeddings model: {0}")]
    UnknownModel(String),
    #[error("Embeddings model error: {0}")]
    ModelError(String),
    #[error("Failed to spawn the embeddings runner: {0}")]
    SpawnError(#[from] std::io::Error),
    #[error("The embeddings runner stopped before the model was loaded")]
    RunnerStopped,
}

impl std::fmt::Debug for HuggingFaceEmbeddingsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Message type for the runner channel: texts to encode, and where to send their embeddings
type RunnerMessage = (
    Vec<String>,
    oneshot::Sender<Result<Vec<Embeddings>, String>>,
);
