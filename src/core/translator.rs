//! Translation of a record state transition into an outbox artifact.
//!
//! Runs inside the unit of work that persists the transition, so it does no I/O
//! and holds no state: every call builds its output from its arguments alone.

use crate::domain::{OutboxEventData, OutboxHeaders, RunState, WireRecord};
use crate::error::OutboxError;

use super::codec::{self, OutboxRecord};
use super::topic::{DelimitedTopics, TopicNamer};

/// Builds outbox payloads with an injected topic namer
#[derive(Debug, Clone, Default)]
pub struct Translator<T = DelimitedTopics> {
    topics: T,

    /// Largest payload the encoder will write
    max_payload_bytes: Option<usize>,
}

impl<T: TopicNamer> Translator<T> {
    pub fn new(topics: T) -> Self {
        Self {
            topics,
            max_payload_bytes: None,
        }
    }

    /// Refuse to encode payloads larger than `limit` bytes
    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = Some(limit);
        self
    }

    pub fn topics(&self) -> &T {
        &self.topics
    }

    /// Metadata for a record moving out of `previous_run_state`
    pub fn headers(&self, record: &WireRecord, previous_run_state: RunState) -> OutboxHeaders {
        OutboxHeaders {
            workflow_name: record.workflow_name.clone(),
            foreign_id: record.foreign_id.clone(),
            topic: self.topics.topic(&record.workflow_name, record.status),
            run_id: record.run_id.clone(),
            run_state: record.run_state,
            previous_run_state,
        }
    }

    /// The message that gets encoded into the outbox payload
    pub fn message(&self, record: &WireRecord, previous_run_state: RunState) -> OutboxRecord {
        OutboxRecord {
            foreign_id: record.foreign_id.clone(),
            r#type: record.status,
            headers: self.headers(record, previous_run_state).to_wire_map(),
        }
    }

    /// Translate a transition into the artifact the outbox store persists.
    ///
    /// `previous_run_state` is passed through as given, including
    /// [`RunState::Unknown`] for a record's first transition. Encoding errors are
    /// returned to the caller, who owns retrying the whole unit of work.
    pub fn translate(
        &self,
        record: &WireRecord,
        previous_run_state: RunState,
    ) -> Result<OutboxEventData, OutboxError> {
        let message = self.message(record, previous_run_state);
        let data = codec::encode(&message, self.max_payload_bytes)?;

        Ok(OutboxEventData {
            workflow_name: record.workflow_name.clone(),
            data,
        })
    }
}

/// Translate with the default topic naming and no payload limit
pub fn record_to_outbox_event_data(
    record: &WireRecord,
    previous_run_state: RunState,
) -> Result<OutboxEventData, OutboxError> {
    Translator::new(DelimitedTopics::default()).translate(record, previous_run_state)
}
