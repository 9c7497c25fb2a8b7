//! Core outbox logic.
//!
//! This module contains:
//! - Translator: Record transition to outbox payload
//! - Codec: Protobuf payload schema
//! - Topic: Topic derivation
//! - OutboxStore: Append-only outbox persistence

pub mod codec;
pub mod outbox_store;
pub mod topic;
pub mod translator;

// Re-export commonly used types
pub use codec::OutboxRecord;
pub use outbox_store::{JsonlOutbox, OutboxStore};
pub use topic::{topic, DelimitedTopics, TopicNamer};
pub use translator::{record_to_outbox_event_data, Translator};
