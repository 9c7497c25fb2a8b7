//! workflow-outbox - Transactional outbox translation for workflow records
//!
//! When a workflow record changes status, the change is translated into an
//! outbox payload inside the same unit of work that persists it. A publisher
//! later delivers the payload to the event stream.
//!
//! # Architecture
//!
//! - A record transition plus the run state it left is translated into an
//!   `OutboxEventData`: the workflow name and a protobuf-encoded message
//! - The message carries the foreign ID, the new status and six fixed headers
//!   (`workflow_name`, `foreign_id`, `topic`, `run_id`, `run_state`,
//!   `previous_run_state`)
//! - The outbox store assigns an ID and timestamp, producing an `OutboxEvent`
//! - Publishers decode stored events into `Event` or `ConnectorEvent`
//!
//! # Modules
//!
//! - `core`: Translator, payload codec, topic naming, outbox store
//! - `domain`: Data structures (WireRecord, Header, OutboxEvent, Event)
//! - `config`: Configuration loading
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Queue a transition
//! workflow-outbox translate --input record.json --previous-run-state 1
//!
//! # Inspect and acknowledge
//! workflow-outbox pending
//! workflow-outbox ack 1
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod error;

// Re-export main types at crate root for convenience
pub use crate::core::{record_to_outbox_event_data, JsonlOutbox, OutboxStore, TopicNamer, Translator};
pub use domain::{
    ConnectorEvent, Event, Header, OutboxEvent, OutboxEventData, OutboxHeaders, RunState,
    WireRecord,
};
pub use error::OutboxError;
