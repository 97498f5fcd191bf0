use serde_json::json;

use crate::helpers::spawn_app;

#[tokio::test]
async fn upsert_returns_ok_and_stores_the_item() {
    let app = spawn_app().await;

    let response = app
        .post_upsert(&json!({
            "content_id": "epg-1",
            "title": "Evening news",
            "description": "Headlines of the day",
            "genres": ["news"],
            "cast": ["Jane Doe"],
            "channel": "5",
            "start_time": "2023-09-01T20:30:00+02:00",
        }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        app.vector_index.payload("epg-1"),
        Some(json!({
            "title": "Evening news",
            "description": "Headlines of the day",
            "channel": "5",
            "start_time": "2023-09-01T20:30:00+02:00",
        }))
    );
}

#[tokio::test]
async fn upsert_stores_an_integer_channel_as_a_string() {
    let app = spawn_app().await;

    let response = app
        .post_upsert(&json!({ "content_id": "epg-1", "title": "News", "channel": 5 }))
        .await;

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        app.vector_index.payload("epg-1"),
        Some(json!({ "title": "News", "channel": "5" }))
    );
}

#[tokio::test]
async fn upserting_the_same_id_twice_keeps_the_latest_item() {
    let app = spawn_app().await;

    for title in ["Evening news", "Late news"] {
        let response = app
            .post_upsert(&json!({ "content_id": "epg-1", "title": title }))
            .await;
        assert_eq!(response.status().as_u16(), 200);
    }

    assert_eq!(app.vector_index.nb_points(), 1);
    assert_eq!(
        app.vector_index.payload("epg-1"),
        Some(json!({ "title": "Late news" }))
    );
}

#[tokio::test]
async fn upsert_returns_a_400_when_the_item_is_invalid() {
    let app = spawn_app().await;
    let test_cases = vec![
        (json!({ "content_id": "  ", "title": "News" }), "blank id"),
        (
            json!({ "content_id": "epg-1", "title": "News", "start_time": "tonight" }),
            "invalid start time",
        ),
        (json!({ "content_id": "epg-1" }), "missing title"),
        (
            json!({ "content_id": "epg-1", "title": "News", "channel": [5] }),
            "list as channel",
        ),
    ];

    for (body, error_message) in test_cases {
        let response = app.post_upsert(&body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not fail with 400 Bad Request when the payload had a {}.",
            error_message
        );
    }
    assert_eq!(app.vector_index.nb_points(), 0);
}
