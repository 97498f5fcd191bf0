use recommender_service::domain::entities::related_result::RelatedResult;
use serde_json::{json, Value as JsonValue};

use crate::helpers::{spawn_app, TestApp};

async fn ingest_tv_programs(app: &TestApp) {
    for (content_id, title, channel) in [
        ("A", "News", "1"),
        ("B", "News Update", "1"),
        ("C", "Sports", "2"),
    ] {
        let response = app
            .post_upsert(&json!({
                "content_id": content_id,
                "title": title,
                "channel": channel,
            }))
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }
}

async fn related_ids(app: &TestApp, content_id: &str, query: &str) -> Vec<String> {
    let response = app.get_related(content_id, query).await;
    assert_eq!(response.status().as_u16(), 200);

    let related: Vec<RelatedResult> = response.json().await.unwrap();
    related.into_iter().map(|r| r.content_id).collect()
}

#[tokio::test]
async fn related_never_returns_the_anchor() {
    // Arrange
    let app = spawn_app().await;
    ingest_tv_programs(&app).await;

    // Act
    let ids = related_ids(&app, "A", "k=5").await;

    // Assert
    assert!(!ids.contains(&"A".to_string()));
    assert_eq!(ids, vec!["B".to_string(), "C".to_string()]);
}

#[tokio::test]
async fn related_on_the_same_channel_only_returns_that_channel() {
    let app = spawn_app().await;
    ingest_tv_programs(&app).await;

    let ids = related_ids(&app, "A", "k=5&same_channel=true").await;

    assert_eq!(ids, vec!["B".to_string()]);
}

#[tokio::test]
async fn related_results_carry_the_item_metadata() {
    let app = spawn_app().await;
    let response = app
        .post_upsert(&json!({
            "content_id": "A",
            "title": "News",
            "channel": "1",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let response = app
        .post_upsert(&json!({
            "content_id": "B",
            "title": "News Update",
            "description": "Latest headlines",
            "channel": "1",
            "start_time": "2023-09-01T20:30:00+00:00",
        }))
        .await;
    assert_eq!(response.status().as_u16(), 200);

    let response = app.get_related("A", "").await;

    let body: JsonValue = response.json().await.unwrap();
    let first = &body[0];
    assert_eq!(first["content_id"], "B");
    assert_eq!(first["title"], "News Update");
    assert_eq!(first["channel"], "1");
    assert_eq!(first["start_time"], "2023-09-01T20:30:00+00:00");
    assert!(first["score"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn related_returns_at_most_k_results() {
    let app = spawn_app().await;
    ingest_tv_programs(&app).await;

    assert_eq!(related_ids(&app, "A", "k=1").await, vec!["B".to_string()]);
    assert!(related_ids(&app, "A", "k=0").await.is_empty());
    // Negative values are handled as 0
    assert!(related_ids(&app, "A", "k=-3").await.is_empty());
    // Values too large for the index are capped
    assert_eq!(related_ids(&app, "A", "k=99999999999").await.len(), 2);
}

#[tokio::test]
async fn related_of_an_unknown_item_is_a_404() {
    let app = spawn_app().await;
    ingest_tv_programs(&app).await;

    let response = app.get_related("unknown-id", "k=5").await;

    assert_eq!(response.status().as_u16(), 404);
    let body: JsonValue = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("unknown-id"));
}

#[tokio::test]
async fn related_rejects_an_invalid_same_channel_flag() {
    let app = spawn_app().await;
    ingest_tv_programs(&app).await;

    let response = app.get_related("A", "same_channel=maybe").await;

    assert_eq!(response.status().as_u16(), 400);
}
