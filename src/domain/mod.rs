//! Domain types for workflow outbox events.
//!
//! This module contains the core data structures:
//! - Header: The closed metadata vocabulary
//! - WireRecord: The transitioning record
//! - Outbox: Artifacts before and after persistence
//! - Events: What consumers receive after publishing

pub mod events;
pub mod header;
pub mod outbox;
pub mod record;

// Re-export commonly used types
pub use events::{ConnectorEvent, Event};
pub use header::{Header, OutboxHeaders};
pub use outbox::{OutboxEvent, OutboxEventData};
pub use record::{RunState, WireRecord};
