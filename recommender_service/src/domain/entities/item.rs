use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use common::helper::error_chain_fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::services::signature::build_signature;

/// A catalog item (a TV program) that can be indexed and recommended
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Not stored, only handed to the signature builder
    pub genres: Option<Vec<String>>,
    /// Not stored, only handed to the signature builder
    pub cast: Option<Vec<String>>,
    pub channel: Option<String>,
    /// ISO-8601 timestamp
    pub start_time: Option<String>,
}

impl Item {
    /// Text from which the item embeddings are generated
    pub fn signature(&self) -> String {
        build_signature(
            Some(&self.title),
            self.description.as_deref(),
            self.genres.as_deref(),
            self.cast.as_deref(),
        )
    }
}

/// Item received on the single upsert route
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpsertItem {
    pub content_id: String,
    pub title: String,
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub cast: Option<Vec<String>>,
    /// A string, or an integer channel id stored as a string
    pub channel: Option<JsonValue>,
    pub start_time: Option<String>,
}

impl TryFrom<UpsertItem> for Item {
    type Error = ItemError;

    fn try_from(item: UpsertItem) -> Result<Self, Self::Error> {
        let id = parse_id(item.content_id)?;

        if let Some(start_time) = &item.start_time {
            if !is_iso_8601(start_time) {
                return Err(ItemError::InvalidStartTime {
                    id,
                    value: JsonValue::String(start_time.clone()),
                });
            }
        }

        let channel = parse_channel(&id, item.channel)?;

        Ok(Self {
            id,
            title: item.title,
            description: item.description,
            genres: item.genres,
            cast: item.cast,
            channel,
            start_time: item.start_time,
        })
    }
}

/// Item received on the bulk ingestion route, as exported by the TV guide feed
///
/// `startTime` is an epoch in seconds and `channelId` an integer. Both are kept as raw JSON
/// so that one malformed item is rejected on its own instead of failing the whole request.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIngestItem {
    pub guid: String,
    pub title: String,
    pub description: Option<String>,
    pub start_time: Option<JsonValue>,
    pub channel_id: Option<JsonValue>,
}

impl TryFrom<BulkIngestItem> for Item {
    type Error = ItemError;

    fn try_from(item: BulkIngestItem) -> Result<Self, Self::Error> {
        let id = parse_id(item.guid)?;

        let start_time = match item.start_time {
            None => None,
            Some(value) => match epoch_to_iso_8601(&value) {
                Some(start_time) => Some(start_time),
                None => return Err(ItemError::InvalidStartTime { id, value }),
            },
        };

        let channel = parse_channel(&id, item.channel_id)?;

        Ok(Self {
            id,
            title: item.title,
            description: item.description,
            genres: None,
            cast: None,
            channel,
            start_time,
        })
    }
}

impl BulkIngestItem {
    /// Reads one element of a bulk ingestion request
    ///
    /// A malformed element (missing `guid` or `title`, wrongly typed field) is reported
    /// on its own, with its `guid` when there is one.
    pub fn parse(value: JsonValue) -> Result<Item, ItemError> {
        let guid = value
            .get("guid")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();

        let item: BulkIngestItem =
            serde_json::from_value(value).map_err(|error| ItemError::Malformed {
                id: guid,
                reason: error.to_string(),
            })?;

        Item::try_from(item)
    }
}

fn parse_id(id: String) -> Result<String, ItemError> {
    if id.trim().is_empty() {
        return Err(ItemError::BlankId);
    }
    Ok(id)
}

/// Accepts RFC 3339 timestamps and offset-less ones (`2023-09-01T20:30:00`)
fn is_iso_8601(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok()
        || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}

/// Converts an epoch in seconds (integer, or integer in a string) to `YYYY-MM-DDTHH:MM:SS+00:00`
fn epoch_to_iso_8601(value: &JsonValue) -> Option<String> {
    let seconds = match value {
        JsonValue::Number(n) => n.as_i64()?,
        JsonValue::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };

    let start_time = Utc.timestamp_opt(seconds, 0).single()?;
    Some(start_time.to_rfc3339_opts(SecondsFormat::Secs, false))
}

fn parse_channel(id: &str, channel: Option<JsonValue>) -> Result<Option<String>, ItemError> {
    match channel {
        None | Some(JsonValue::Null) => Ok(None),
        Some(value) => match channel_to_string(&value) {
            Some(channel) => Ok(Some(channel)),
            None => Err(ItemError::InvalidChannel {
                id: id.to_string(),
                value,
            }),
        },
    }
}

fn channel_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[derive(thiserror::Error)]
pub enum ItemError {
    #[error("The item id must not be blank")]
    BlankId,
    #[error("Item {id} has an invalid start time: {value}")]
    InvalidStartTime { id: String, value: JsonValue },
    #[error("Item {id} has an invalid channel: {value}")]
    InvalidChannel { id: String, value: JsonValue },
    #[error("Malformed item {id}: {reason}")]
    Malformed { id: String, reason: String },
}

impl ItemError {
    /// Id of the rejected item, empty when the id itself was invalid
    pub fn item_id(&self) -> &str {
        match self {
            ItemError::BlankId => "",
            ItemError::InvalidStartTime { id, .. }
            | ItemError::InvalidChannel { id, .. }
            | ItemError::Malformed { id, .. } => id,
        }
    }
}

impl std::fmt::Debug for ItemError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
