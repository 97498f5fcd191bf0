use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        self, point_id::PointIdOptions, value::Kind, vectors_config::Config,
        vectors_output::VectorsOptions, Condition, CreateCollectionBuilder, Distance, Filter,
        GetPointsBuilder, PointId, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
        VectorParamsBuilder,
    },
    Qdrant, QdrantError,
};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::entities::index_point::{
        DistanceMetric, Embeddings, IndexPoint, Payload, PayloadFilter, ScoredPoint, SearchQuery,
        StoredPoint,
    },
    ports::vector_index::{VectorIndex, VectorIndexError},
};

/// Payload key holding the item id: Qdrant point ids can only be UUIDs or unsigned integers
pub const CONTENT_ID_KEY: &str = "content_id";

/// Namespace of the UUID v5 point ids derived from item ids
const CONTENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x8c5e_41b2_7d0a_4f3e_9a61_2b7c_d40e_f913);

/// Repository for items points (vector + metadata) persisted in a Qdrant collection
pub struct ItemPointQdrantRepository {
    client: Qdrant,
    collection_name: String,
}

impl ItemPointQdrantRepository {
    pub fn new(client: Qdrant, collection_name: &str) -> Self {
        Self {
            client,
            collection_name: collection_name.to_string(),
        }
    }

    /// Checks that an existing collection was created for the same vectors
    async fn check_collection_config(
        &self,
        dimension: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorIndexError> {
        let info = self
            .client
            .collection_info(self.collection_name.as_str())
            .await
            .map_err(backend_error)?;

        check_vectors_config(&self.collection_name, info.result, dimension, distance)
    }
}

fn check_vectors_config(
    collection: &str,
    info: Option<qdrant::CollectionInfo>,
    dimension: u64,
    distance: DistanceMetric,
) -> Result<(), VectorIndexError> {
    let mismatch = |reason: String| VectorIndexError::ConfigurationMismatch {
        collection: collection.to_string(),
        reason,
    };

    let vectors_config = info
        .and_then(|info| info.config)
        .and_then(|config| config.params)
        .and_then(|params| params.vectors_config)
        .and_then(|vectors_config| vectors_config.config);

    let params = match vectors_config {
        Some(Config::Params(params)) => params,
        Some(Config::ParamsMap(_)) => {
            return Err(mismatch("the collection uses named vectors".into()))
        }
        None => return Err(mismatch("the collection has no vectors config".into())),
    };

    if params.size != dimension {
        return Err(mismatch(format!(
            "vectors of dimension {} are stored, the embeddings model produces {}",
            params.size, dimension
        )));
    }

    if params.distance() != to_qdrant_distance(distance) {
        return Err(mismatch(format!(
            "the collection uses the {:?} distance, {} is configured",
            params.distance(),
            distance
        )));
    }

    Ok(())
}

#[async_trait]
impl VectorIndex for ItemPointQdrantRepository {
    #[tracing::instrument(name = "Ensuring the Qdrant collection exists", skip(self), fields(collection = %self.collection_name))]
    async fn ensure_collection(
        &self,
        dimension: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorIndexError> {
        let exists = self
            .client
            .collection_exists(self.collection_name.as_str())
            .await
            .map_err(backend_error)?;

        if !exists {
            let request = CreateCollectionBuilder::new(self.collection_name.as_str())
                .vectors_config(VectorParamsBuilder::new(
                    dimension,
                    to_qdrant_distance(distance),
                ));

            match self.client.create_collection(request).await {
                Ok(_) => info!("Created collection"),
                // Another instance may have created it in the meantime
                Err(error) if error.to_string().contains("already exists") => {
                    warn!(?error, "Collection created concurrently")
                }
                Err(error) => return Err(backend_error(error)),
            }
        }

        self.check_collection_config(dimension, distance).await
    }

    #[tracing::instrument(name = "Retrieving points from Qdrant", skip(self))]
    async fn retrieve(
        &self,
        ids: Vec<String>,
        with_vector: bool,
        with_payload: bool,
    ) -> Result<Vec<StoredPoint>, VectorIndexError> {
        let point_ids: Vec<PointId> = ids.iter().map(|id| to_point_id(id)).collect();

        // The payload is always fetched as it holds the item id
        let request = GetPointsBuilder::new(self.collection_name.as_str(), point_ids)
            .with_vectors(with_vector)
            .with_payload(true);

        let response = self.client.get_points(request).await.map_err(backend_error)?;

        response
            .result
            .into_iter()
            .map(|point| {
                let (id, payload) = to_item_id_and_payload(point.id, point.payload)?;
                Ok(StoredPoint {
                    id,
                    vector: extract_vector(point.vectors),
                    payload: if with_payload { payload } else { Payload::new() },
                })
            })
            .collect()
    }

    #[tracing::instrument(name = "Searching points in Qdrant", skip(self, query), fields(limit = query.limit, filter = ?query.filter))]
    async fn search(&self, query: SearchQuery) -> Result<Vec<ScoredPoint>, VectorIndexError> {
        let SearchQuery {
            vector,
            limit,
            filter,
        } = query;

        let mut request = SearchPointsBuilder::new(self.collection_name.as_str(), vector, limit)
            .with_payload(true);
        if let Some(filter) = filter {
            request = request.filter(to_qdrant_filter(filter)?);
        }

        let response = self
            .client
            .search_points(request)
            .await
            .map_err(backend_error)?;

        response
            .result
            .into_iter()
            .map(|point| {
                let (id, payload) = to_item_id_and_payload(point.id, point.payload)?;
                Ok(ScoredPoint {
                    id,
                    score: point.score,
                    payload,
                })
            })
            .collect()
    }

    #[tracing::instrument(name = "Saving points to Qdrant", skip(self, points), fields(nb_points = points.len()))]
    async fn upsert(&self, points: Vec<IndexPoint>, wait: bool) -> Result<(), VectorIndexError> {
        let points: Vec<PointStruct> = points.into_iter().map(PointStruct::from).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection_name.as_str(), points).wait(wait))
            .await
            .map_err(backend_error)?;

        info!("Saved points");
        Ok(())
    }
}

fn backend_error(error: QdrantError) -> VectorIndexError {
    VectorIndexError::BackendError(error.to_string())
}

fn to_qdrant_distance(distance: DistanceMetric) -> Distance {
    match distance {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
    }
}

/// Maps an item id to a Qdrant point id.
///
/// Canonical UUIDs and decimal integers are used as is, any other id is hashed to a UUID v5.
/// Only canonical forms are kept so that two different item ids never share a point.
pub fn to_point_id(content_id: &str) -> PointId {
    if let Ok(uuid) = Uuid::parse_str(content_id) {
        if uuid.to_string() == content_id {
            return PointId::from(content_id.to_string());
        }
    }

    if let Ok(num) = content_id.parse::<u64>() {
        if num.to_string() == content_id {
            return PointId::from(num);
        }
    }

    PointId::from(Uuid::new_v5(&CONTENT_ID_NAMESPACE, content_id.as_bytes()).to_string())
}

fn to_qdrant_filter(filter: PayloadFilter) -> Result<Filter, VectorIndexError> {
    match filter {
        PayloadFilter::Equals { key, value } => {
            let condition = match value {
                JsonValue::String(value) => Condition::matches(key, value),
                JsonValue::Bool(value) => Condition::matches(key, value),
                JsonValue::Number(ref number) => match number.as_i64() {
                    Some(value) => Condition::matches(key, value),
                    None => return Err(VectorIndexError::UnsupportedFilter(value.to_string())),
                },
                other => return Err(VectorIndexError::UnsupportedFilter(other.to_string())),
            };
            Ok(Filter::must([condition]))
        }
    }
}

/// Splits a Qdrant payload into the item id and the item metadata
fn to_item_id_and_payload(
    point_id: Option<PointId>,
    mut payload: HashMap<String, qdrant::Value>,
) -> Result<(String, Payload), VectorIndexError> {
    let stored_id = payload
        .remove(CONTENT_ID_KEY)
        .and_then(|value| match value.kind {
            Some(Kind::StringValue(id)) => Some(id),
            _ => None,
        });

    let id = match (stored_id, point_id.and_then(|id| id.point_id_options)) {
        (Some(id), _) => id,
        // Points written by another tool: the point id is the item id
        (None, Some(PointIdOptions::Uuid(uuid))) => uuid,
        (None, Some(PointIdOptions::Num(num))) => num.to_string(),
        (None, None) => return Err(VectorIndexError::InvalidPoint("missing point id".into())),
    };

    let payload = payload
        .into_iter()
        .filter_map(|(key, value)| qdrant_value_to_json(value).map(|value| (key, value)))
        .collect();

    Ok((id, payload))
}

#[allow(deprecated)]
fn extract_vector(vectors: Option<qdrant::VectorsOutput>) -> Option<Embeddings> {
    let vector = match vectors?.vectors_options? {
        VectorsOptions::Vector(vector) => vector.data,
        // Named vectors are not used by this service
        VectorsOptions::Vectors(_) => return None,
    };

    Some(vector).filter(|vector| !vector.is_empty())
}

fn json_to_qdrant_value(value: JsonValue) -> Option<qdrant::Value> {
    match value {
        JsonValue::Null => None,
        JsonValue::Bool(b) => Some(qdrant::Value::from(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Some(qdrant::Value::from(i)),
            None => n.as_f64().map(qdrant::Value::from),
        },
        JsonValue::String(s) => Some(qdrant::Value::from(s)),
        other => Some(qdrant::Value::from(other.to_string())),
    }
}

fn qdrant_value_to_json(value: qdrant::Value) -> Option<JsonValue> {
    match value.kind? {
        Kind::NullValue(_) => None,
        Kind::BoolValue(b) => Some(JsonValue::Bool(b)),
        Kind::IntegerValue(i) => Some(JsonValue::Number(i.into())),
        Kind::DoubleValue(f) => Number::from_f64(f).map(JsonValue::Number),
        Kind::StringValue(s) => Some(JsonValue::String(s)),
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values
                .into_iter()
                .filter_map(qdrant_value_to_json)
                .collect(),
        )),
        Kind::StructValue(object) => Some(JsonValue::Object(
            object
                .fields
                .into_iter()
                .filter_map(|(key, value)| qdrant_value_to_json(value).map(|value| (key, value)))
                .collect::<Map<String, JsonValue>>(),
        )),
    }
}

impl From<IndexPoint> for PointStruct {
    fn from(point: IndexPoint) -> Self {
        let point_id = to_point_id(&point.id);

        let mut payload: HashMap<String, qdrant::Value> = point
            .payload
            .into_iter()
            .filter_map(|(key, value)| json_to_qdrant_value(value).map(|value| (key, value)))
            .collect();
        payload.insert(CONTENT_ID_KEY.into(), qdrant::Value::from(point.id));

        PointStruct::new(point_id, point.vector, payload)
    }
}
