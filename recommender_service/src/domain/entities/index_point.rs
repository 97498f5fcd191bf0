use serde_json::{Map, Value as JsonValue};

use super::item::Item;

pub type Embeddings = Vec<f32>;

/// Metadata stored next to a vector.
///
/// A key is only present when the item had a value for it: absent values are never stored
/// as `null`, which would not match an equality filter on the same key.
pub type Payload = Map<String, JsonValue>;

pub const TITLE_KEY: &str = "title";
pub const DESCRIPTION_KEY: &str = "description";
pub const CHANNEL_KEY: &str = "channel";
pub const START_TIME_KEY: &str = "start_time";

/// The persisted unit inside the vector index: one point per item, keyed by the item id
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub id: String,
    pub vector: Embeddings,
    pub payload: Payload,
}

impl IndexPoint {
    pub fn new(item: Item, vector: Embeddings) -> Self {
        let Item {
            id,
            title,
            description,
            channel,
            start_time,
            ..
        } = item;

        let mut payload = Payload::new();
        payload.insert(TITLE_KEY.into(), JsonValue::String(title));

        let optional_fields = [
            (DESCRIPTION_KEY, description),
            (CHANNEL_KEY, channel),
            (START_TIME_KEY, start_time),
        ];
        for (key, value) in optional_fields {
            if let Some(value) = value {
                payload.insert(key.into(), JsonValue::String(value));
            }
        }

        Self {
            id,
            vector,
            payload,
        }
    }
}

/// A point read back from the index by its id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    /// `None` when the vector was not requested, or when the point was written without one
    pub vector: Option<Embeddings>,
    pub payload: Payload,
}

/// A nearest-neighbor search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Payload,
}

/// Metadata predicate narrowing a search
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadFilter {
    /// The payload value under `key` is exactly `value`
    Equals { key: String, value: JsonValue },
}

impl PayloadFilter {
    pub fn matches(&self, payload: &Payload) -> bool {
        match self {
            PayloadFilter::Equals { key, value } => payload.get(key) == Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: Embeddings,
    pub limit: u64,
    pub filter: Option<PayloadFilter>,
}

/// Similarity metric of a collection, fixed when the collection is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(try_from = "String")]
pub enum DistanceMetric {
    Cosine,
    Dot,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Dot => "dot",
        }
    }
}

impl TryFrom<String> for DistanceMetric {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            other => Err(format!(
                "{} is not a supported distance metric. Use either `cosine` or `dot`.",
                other
            )),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
