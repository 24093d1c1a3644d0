//! Raw notification envelopes delivered by the eventing system.
//!
//! Two families exist:
//! - operation-log events (`{"detail": {"eventName": "PutItem", "requestParameters": ...}}`)
//!   which only reference the written item and need a store lookup;
//! - change-feed records (`{"eventName": "INSERT", "dynamodb": {"NewImage": ...}}`) which carry
//!   the full post-write image.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Error;

/// Top-level field holding the list of change-feed records in a batch delivery.
pub const RECORDS_FIELD: &str = "Records";

#[derive(Debug, Clone, PartialEq)]
pub enum EventEnvelope {
    OperationLog(OperationLogEvent),
    ChangeFeed(ChangeFeedRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOperation {
    PutItem,
    UpdateItem,
    BatchWriteItem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedChange {
    Insert,
    Modify,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogEvent {
    pub event_name: String,
    #[serde(default)]
    pub request_parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedRecord {
    pub event_name: String,
    #[serde(default)]
    pub dynamodb: Option<StreamPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamPayload {
    #[serde(rename = "NewImage", default)]
    pub new_image: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct OperationLogEnvelope {
    detail: OperationLogEvent,
}

impl EventEnvelope {
    pub fn parse(raw: &Value) -> Result<Self, Error> {
        if raw.get("detail").is_some() {
            return OperationLogEnvelope::deserialize(raw)
                .map(|envelope| Self::OperationLog(envelope.detail))
                .map_err(|e| Error::MalformedEvent(format!("operation-log envelope: {e}")));
        }
        if raw.get("dynamodb").is_some() || raw.get("eventName").is_some() {
            return ChangeFeedRecord::deserialize(raw)
                .map(Self::ChangeFeed)
                .map_err(|e| Error::MalformedEvent(format!("change-feed record: {e}")));
        }
        Err(Error::MalformedEvent(
            "neither an operation-log event nor a change-feed record".to_string(),
        ))
    }

    pub fn event_name(&self) -> &str {
        match self {
            Self::OperationLog(event) => &event.event_name,
            Self::ChangeFeed(record) => &record.event_name,
        }
    }
}

impl OperationLogEvent {
    pub fn operation(&self) -> Option<LogOperation> {
        match self.event_name.as_str() {
            "PutItem" => Some(LogOperation::PutItem),
            "UpdateItem" => Some(LogOperation::UpdateItem),
            "BatchWriteItem" => Some(LogOperation::BatchWriteItem),
            _ => None,
        }
    }
}

impl ChangeFeedRecord {
    pub fn change(&self) -> Option<FeedChange> {
        match self.event_name.as_str() {
            "INSERT" => Some(FeedChange::Insert),
            "MODIFY" => Some(FeedChange::Modify),
            _ => None,
        }
    }

    pub fn new_image(&self) -> Option<&Map<String, Value>> {
        self.dynamodb.as_ref().and_then(|payload| payload.new_image.as_ref())
    }
}

/// Records of a batch delivery, if `raw` is one.
pub fn batch_records(raw: &Value) -> Option<&Vec<Value>> {
    raw.get(RECORDS_FIELD).and_then(Value::as_array)
}
