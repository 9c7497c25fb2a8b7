//! Event schemas observed by consumers once an outbox event is published.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::header::Header;

/// A record status change as delivered to native consumers.
///
/// Events only say what happened; they do not carry the record's new state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique ID assigned by the event streamer
    pub id: i64,

    /// ID of the record in the record store's foreign system
    pub foreign_id: i64,

    /// Status code the record changed to
    #[serde(rename = "type")]
    pub event_type: i32,

    pub headers: BTreeMap<Header, String>,

    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Look up a header value
    pub fn header(&self, header: Header) -> Option<&str> {
        self.headers.get(&header).map(String::as_str)
    }
}

/// A string-typed event for systems whose identifiers and types are not numeric.
///
/// Every field except `created_at` is a string, so elements with string
/// identifiers and string-based types can be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorEvent {
    pub id: String,

    /// ID of the element the event relates to
    pub foreign_id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    pub headers: BTreeMap<String, String>,

    pub created_at: DateTime<Utc>,
}
