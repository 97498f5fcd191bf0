use recommender_service::{
    domain::entities::index_point::DistanceMetric, ports::vector_index::VectorIndex,
};
use std::sync::Arc;

use crate::helpers::{build_app, test_configuration, InMemoryVectorIndex, TEST_DIMENSION};

#[tokio::test]
async fn the_application_refuses_a_collection_of_another_dimension() {
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    vector_index
        .ensure_collection(TEST_DIMENSION as u64 * 2, DistanceMetric::Cosine)
        .await
        .unwrap();

    let application = build_app(test_configuration(), vector_index).await;

    assert!(application.is_err());
}

#[tokio::test]
async fn the_application_reuses_a_matching_collection() {
    let vector_index = Arc::new(InMemoryVectorIndex::default());
    vector_index
        .ensure_collection(TEST_DIMENSION as u64, DistanceMetric::Cosine)
        .await
        .unwrap();

    let application = build_app(test_configuration(), vector_index).await;

    assert!(application.is_ok());
}

#[tokio::test]
async fn the_application_refuses_a_zero_batch_size() {
    let mut configuration = test_configuration();
    configuration.ingestion.batch_size = 0;

    let application = build_app(configuration, Arc::new(InMemoryVectorIndex::default())).await;

    assert!(application.is_err());
}
