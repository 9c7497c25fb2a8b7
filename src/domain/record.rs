//! The record contract consumed by the outbox translator.
//!
//! A `WireRecord` is produced by the record store when a record changes status.
//! The translator only reads it.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OutboxError;

/// A workflow record as it crosses the record store boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireRecord {
    /// Name of the workflow that owns the record
    pub workflow_name: String,

    /// Record identifier assigned by the record store
    pub id: String,

    /// Identifier of the external entity this record represents
    pub foreign_id: String,

    /// Status code the record transitioned to
    pub status: i32,

    /// Identifier of the current run
    pub run_id: String,

    /// State of the current run
    pub run_state: RunState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    /// Free-form metadata owned by the record store
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, String>,
}

impl WireRecord {
    /// Create a record with no timestamps or metadata
    pub fn new(
        workflow_name: impl Into<String>,
        id: impl Into<String>,
        foreign_id: impl Into<String>,
        status: i32,
        run_id: impl Into<String>,
        run_state: RunState,
    ) -> Self {
        Self {
            workflow_name: workflow_name.into(),
            id: id.into(),
            foreign_id: foreign_id.into(),
            status,
            run_id: run_id.into(),
            run_state,
            created_at: None,
            updated_at: None,
            meta: BTreeMap::new(),
        }
    }

    /// Check the fields the outbox relies on for routing
    pub fn validate(&self) -> Result<(), OutboxError> {
        if self.workflow_name.trim().is_empty() {
            return Err(OutboxError::InvalidRecord(
                "workflow_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// State of a single run of a workflow record.
///
/// Codes are stable and appear on the wire as base-10 strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RunState {
    /// No run yet; used as the previous state of a record's first transition
    #[default]
    Unknown,
    Initiated,
    Running,
    Paused,
    Cancelled,
    Completed,
    DataDeleted,
    RequestedDataDeleted,
}

impl RunState {
    /// Integer code of this state
    pub fn code(&self) -> i32 {
        match self {
            RunState::Unknown => 0,
            RunState::Initiated => 1,
            RunState::Running => 2,
            RunState::Paused => 3,
            RunState::Cancelled => 4,
            RunState::Completed => 5,
            RunState::DataDeleted => 6,
            RunState::RequestedDataDeleted => 7,
        }
    }
}

impl TryFrom<i32> for RunState {
    type Error = OutboxError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(RunState::Unknown),
            1 => Ok(RunState::Initiated),
            2 => Ok(RunState::Running),
            3 => Ok(RunState::Paused),
            4 => Ok(RunState::Cancelled),
            5 => Ok(RunState::Completed),
            6 => Ok(RunState::DataDeleted),
            7 => Ok(RunState::RequestedDataDeleted),
            other => Err(OutboxError::InvalidRunState(other)),
        }
    }
}

impl From<RunState> for i32 {
    fn from(state: RunState) -> Self {
        state.code()
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Unknown => "unknown",
            RunState::Initiated => "initiated",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Cancelled => "cancelled",
            RunState::Completed => "completed",
            RunState::DataDeleted => "data_deleted",
            RunState::RequestedDataDeleted => "requested_data_deleted",
        };
        f.write_str(name)
    }
}
