//! Buffered ingestion records
//!
//! A [`Record`] is the unit moving through the shard pool: an id, an event
//! type tag, an owned JSON body and the UTC time it was admitted.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;

use crate::error::{Result, Error};

/// Kind of an ingestion record, serialized as the endpoint's `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum EventType {
    /// A new trace, or an upsert of an existing one
    TraceCreate,
    /// A new span
    SpanCreate,
    /// An update to an existing span (e.g. its end time)
    SpanUpdate,
    /// A point-in-time event
    EventCreate,
    /// A new model generation
    GenerationCreate,
    /// An update to an existing generation
    GenerationUpdate,
    /// A score attached to a trace or observation
    ScoreCreate,
    /// An SDK diagnostic log line
    SdkLog,
}

impl EventType {
    /// Get the wire tag of the event type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TraceCreate => "trace-create",
            Self::SpanCreate => "span-create",
            Self::SpanUpdate => "span-update",
            Self::EventCreate => "event-create",
            Self::GenerationCreate => "generation-create",
            Self::GenerationUpdate => "generation-update",
            Self::ScoreCreate => "score-create",
            Self::SdkLog => "sdk-log",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trace-create" => Ok(Self::TraceCreate),
            "span-create" => Ok(Self::SpanCreate),
            "span-update" => Ok(Self::SpanUpdate),
            "event-create" => Ok(Self::EventCreate),
            "generation-create" => Ok(Self::GenerationCreate),
            "generation-update" => Ok(Self::GenerationUpdate),
            "score-create" => Ok(Self::ScoreCreate),
            "sdk-log" => Ok(Self::SdkLog),
            _ => Err(Error::validation(format!("Unknown event type: {}", s))),
        }
    }
}

/// One buffered item awaiting delivery
///
/// Records are immutable once built; the shard pool only ever moves or drops
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: String,
    #[serde(rename = "type")]
    event_type: EventType,
    body: Value,
    timestamp: DateTime<Utc>,
}

impl Record {
    /// Build a record stamped with the current UTC time
    pub fn new(id: impl Into<String>, event_type: EventType, body: Value) -> Self {
        Self {
            id: id.into(),
            event_type,
            body,
            timestamp: Utc::now(),
        }
    }

    /// Build a record from any serializable payload
    ///
    /// The payload is converted into an owned JSON tree, so nothing the
    /// caller does to `body` afterwards can reach the buffered record.
    pub fn capture<T>(id: impl Into<String>, event_type: EventType, body: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        Ok(Self::new(id, event_type, body))
    }

    /// Record id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Event type tag
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// JSON body
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Admission time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
