//! Outbox artifacts before and after they are persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::events::{ConnectorEvent, Event};
use super::header::OutboxHeaders;
use crate::core::codec::{self, OutboxRecord};
use crate::error::OutboxError;

/// A translated transition that has not been written to the outbox yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEventData {
    /// Workflow the event belongs to; the outbox routes writes on it
    pub workflow_name: String,

    /// Encoded [`OutboxRecord`]
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
}

/// An event stored in the outbox, waiting to be published
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Assigned by the outbox when the event is written
    pub id: i64,

    pub workflow_name: String,

    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,

    /// When the outbox accepted the event
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    /// Attach the identity the outbox assigned on write
    pub fn from_data(id: i64, data: OutboxEventData, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            workflow_name: data.workflow_name,
            data: data.data,
            created_at,
        }
    }

    /// Decode the stored payload
    pub fn decode(&self) -> Result<OutboxRecord, OutboxError> {
        codec::decode(&self.data)
    }

    /// Rebuild the event as a string-typed connector notification
    pub fn to_connector_event(&self) -> Result<ConnectorEvent, OutboxError> {
        let record = self.decode()?;

        Ok(ConnectorEvent {
            id: self.id.to_string(),
            foreign_id: record.foreign_id,
            event_type: record.r#type.to_string(),
            headers: record.headers,
            created_at: self.created_at,
        })
    }

    /// Rebuild the event for native consumers.
    ///
    /// Native events carry numeric foreign IDs, so this fails for records whose
    /// foreign ID is not an integer; use [`Self::to_connector_event`] for those.
    pub fn to_event(&self) -> Result<Event, OutboxError> {
        let record = self.decode()?;
        let headers = OutboxHeaders::try_from(&record.headers)?;
        let foreign_id = record
            .foreign_id
            .parse::<i64>()
            .map_err(|_| OutboxError::NonNumericForeignId(record.foreign_id.clone()))?;

        Ok(Event {
            id: self.id,
            foreign_id,
            event_type: record.r#type,
            headers: headers.to_header_map(),
            created_at: self.created_at,
        })
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}
