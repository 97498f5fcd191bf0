use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::index_point::{ScoredPoint, CHANNEL_KEY, START_TIME_KEY, TITLE_KEY};

/// An item recommended as related to an anchor item
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelatedResult {
    pub content_id: String,
    pub score: f32,
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub channel: Option<String>,
}

impl From<ScoredPoint> for RelatedResult {
    fn from(point: ScoredPoint) -> Self {
        let ScoredPoint { id, score, payload } = point;
        let text = |key: &str| payload.get(key).and_then(JsonValue::as_str).map(String::from);

        Self {
            title: text(TITLE_KEY),
            start_time: text(START_TIME_KEY),
            channel: payload.get(CHANNEL_KEY).and_then(channel_as_string),
            content_id: id,
            score,
        }
    }
}

/// Older points were ingested with integer channel ids: every channel is returned as a string
fn channel_as_string(channel: &JsonValue) -> Option<String> {
    match channel {
        JsonValue::Null => None,
        JsonValue::String(channel) => Some(channel.clone()),
        other => Some(other.to_string()),
    }
}
