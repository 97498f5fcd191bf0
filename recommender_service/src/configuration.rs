use std::num::NonZeroUsize;

use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::entities::index_point::DistanceMetric;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub qdrant: QdrantSettings,
    pub embeddings: EmbeddingsSettings,
    pub ingestion: IngestionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    /// Limit of a JSON request body, large enough for a bulk ingestion
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_payload_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QdrantSettings {
    pub host: String,
    /// gRPC port
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub collection: String,
    pub distance: DistanceMetric,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_secs: u64,
    pub api_key: Option<Secret<String>>,
}

impl QdrantSettings {
    pub fn get_grpc_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .as_ref()
            .map(|key| key.expose_secret().to_string())
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingsSettings {
    /// Name of a sentence-transformers model, for ex `sentence-transformers/all-MiniLM-L12-v2`
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionSettings {
    /// Number of items encoded and written at once during a bulk ingestion
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub batch_size: usize,
    pub wait_for_single_upsert: bool,
}

impl IngestionSettings {
    pub fn batch_size(&self) -> Result<NonZeroUsize, String> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| "ingestion.batch_size must be at least 1".to_string())
    }
}

/// Extracts app settings from configuration files and env variables
///
/// `base.yaml` should contain shared settings for all environments.
/// A specific env file should be created for each environment: `local.yaml` and `production.yaml`
/// The environment is set with the env var `APP_ENVIRONMENT`.
/// If `APP_ENVIRONMENT` is not set, `local.yaml` is the default.
///
/// Settings are also taken from environment variables: with a prefix of APP and '__' as separator
/// For ex: `APP_QDRANT__HOST=qdrant` would set `Settings.qdrant.host`
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("No current directory: {}", e)))?;
    let configuration_directory = base_path.join("configuration");

    // Detects the running environment.
    // Default to `local` if unspecified.
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(environment_filename),
        ))
        // Adds in settings from environment variables (with a prefix of APP and '__' as separator)
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

/// The possible runtime environment for our application.
#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}
