use fake::{
    faker::lorem::en::{Sentence, Words},
    Fake,
};
use serde_json::{json, Value as JsonValue};

use crate::helpers::{spawn_app, spawn_app_with, test_configuration, InMemoryVectorIndex};

fn tv_guide_items(nb_items: usize) -> JsonValue {
    let items: Vec<JsonValue> = (0..nb_items)
        .map(|i| {
            json!({
                "guid": format!("guid-{i}"),
                "title": Words(1..4).fake::<Vec<String>>().join(" "),
                "description": Sentence(3..10).fake::<String>(),
                "startTime": 1693600200 + 1800 * i,
                "channelId": i % 4,
            })
        })
        .collect();
    JsonValue::Array(items)
}

#[tokio::test]
async fn bulk_ingest_writes_every_item_in_batches() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.post_bulk_ingest(&tv_guide_items(1201)).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["count"], 1201);
    assert_eq!(body["rejected"], json!([]));

    assert_eq!(app.vector_index.upserted_batches(), vec![500, 500, 201]);
    assert_eq!(app.vector_index.nb_points(), 1201);
}

#[tokio::test]
async fn bulk_ingest_normalizes_start_time_and_channel() {
    let app = spawn_app().await;

    let response = app
        .post_bulk_ingest(&json!([{
            "guid": "guid-1",
            "title": "Evening news",
            "startTime": 1693600200,
            "channelId": 12,
        }]))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        app.vector_index.payload("guid-1"),
        Some(json!({
            "title": "Evening news",
            "channel": "12",
            "start_time": "2023-09-01T20:30:00+00:00",
        }))
    );
}

#[tokio::test]
async fn bulk_ingest_rejects_invalid_items_and_ingests_the_others() {
    let app = spawn_app().await;
    let mut items = tv_guide_items(3);
    items[1]["startTime"] = json!("tonight");

    let response = app.post_bulk_ingest(&items).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["rejected"][0]["id"], "guid-1");
    assert_eq!(app.vector_index.payload("guid-1"), None);
    assert_eq!(app.vector_index.nb_points(), 2);
}

#[tokio::test]
async fn bulk_ingest_rejects_malformed_items_and_ingests_the_others() {
    let app = spawn_app().await;
    let body = json!([
        { "guid": "guid-0", "title": "Evening news" },
        { "title": "Late news" },
        { "guid": "guid-2", "title": "Sports" },
    ]);

    let response = app.post_bulk_ingest(&body).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["count"], 2);
    assert_eq!(body["rejected"].as_array().unwrap().len(), 1);
    assert!(body["rejected"][0]["reason"]
        .as_str()
        .unwrap()
        .contains("guid"));
    assert_eq!(app.vector_index.nb_points(), 2);
}

#[tokio::test]
async fn bulk_ingest_stops_at_the_first_failing_batch() {
    let mut configuration = test_configuration();
    configuration.ingestion.batch_size = 2;
    let app = spawn_app_with(configuration, InMemoryVectorIndex::failing_upserts_from(1)).await;

    let response = app.post_bulk_ingest(&tv_guide_items(7)).await;

    assert_eq!(response.status().as_u16(), 503);
    let body: JsonValue = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("2 items were already committed"));
    // The first batch stays committed, the ones after the failing one are never sent
    assert_eq!(app.vector_index.upserted_batches(), vec![2, 0]);
    assert_eq!(app.vector_index.nb_points(), 2);
}

#[tokio::test]
async fn bulk_ingest_of_an_empty_list_writes_nothing() {
    let app = spawn_app().await;

    let response = app.post_bulk_ingest(&json!([])).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: JsonValue = response.json().await.unwrap();
    assert_eq!(body["count"], 0);
    assert!(app.vector_index.upserted_batches().is_empty());
}
