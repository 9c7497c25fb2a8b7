//! Header vocabulary for outbox payload metadata.
//!
//! Consumers filter and route on these keys, so the set is closed: metadata is
//! only ever built through [`OutboxHeaders`], which has exactly one field per key.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::record::RunState;
use crate::error::OutboxError;

/// A metadata key carried in every outbox payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Header {
    /// Name of the workflow the record belongs to
    WorkflowName,

    /// Identifier of the external entity the record represents
    ForeignId,

    /// Topic derived from the workflow name and the new status
    Topic,

    /// Identifier of the run that produced the transition
    RunId,

    /// Run state after the transition
    RunState,

    /// Run state before the transition
    PreviousRunState,
}

impl Header {
    /// Every header, in wire order
    pub const ALL: [Header; 6] = [
        Header::WorkflowName,
        Header::ForeignId,
        Header::Topic,
        Header::RunId,
        Header::RunState,
        Header::PreviousRunState,
    ];

    /// The wire key for this header
    pub fn as_str(&self) -> &'static str {
        match self {
            Header::WorkflowName => "workflow_name",
            Header::ForeignId => "foreign_id",
            Header::Topic => "topic",
            Header::RunId => "run_id",
            Header::RunState => "run_state",
            Header::PreviousRunState => "previous_run_state",
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Header {
    type Err = OutboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Header::ALL
            .into_iter()
            .find(|h| h.as_str() == s)
            .ok_or_else(|| OutboxError::UnknownHeader(s.to_string()))
    }
}

/// The complete metadata set for one state transition.
///
/// Run states are kept typed and only formatted as base-10 strings when the
/// map is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxHeaders {
    pub workflow_name: String,
    pub foreign_id: String,
    pub topic: String,
    pub run_id: String,
    pub run_state: RunState,
    pub previous_run_state: RunState,
}

impl OutboxHeaders {
    /// Value for a single header, as it appears on the wire
    pub fn get(&self, header: Header) -> String {
        match header {
            Header::WorkflowName => self.workflow_name.clone(),
            Header::ForeignId => self.foreign_id.clone(),
            Header::Topic => self.topic.clone(),
            Header::RunId => self.run_id.clone(),
            Header::RunState => self.run_state.code().to_string(),
            Header::PreviousRunState => self.previous_run_state.code().to_string(),
        }
    }

    /// Typed-key view, as delivered on [`crate::domain::Event`]
    pub fn to_header_map(&self) -> BTreeMap<Header, String> {
        Header::ALL.into_iter().map(|h| (h, self.get(h))).collect()
    }

    /// String-keyed view, as encoded into the payload
    pub fn to_wire_map(&self) -> BTreeMap<String, String> {
        Header::ALL
            .into_iter()
            .map(|h| (h.as_str().to_string(), self.get(h)))
            .collect()
    }
}

impl TryFrom<&BTreeMap<String, String>> for OutboxHeaders {
    type Error = OutboxError;

    fn try_from(map: &BTreeMap<String, String>) -> Result<Self, Self::Error> {
        for key in map.keys() {
            key.parse::<Header>()?;
        }

        let field = |header: Header| {
            map.get(header.as_str())
                .cloned()
                .ok_or(OutboxError::MissingHeader(header))
        };
        let run_state = |header: Header| -> Result<RunState, OutboxError> {
            let raw = field(header)?;
            let code = raw
                .parse::<i32>()
                .map_err(|_| OutboxError::InvalidHeaderValue { header, value: raw })?;
            RunState::try_from(code)
        };

        Ok(Self {
            workflow_name: field(Header::WorkflowName)?,
            foreign_id: field(Header::ForeignId)?,
            topic: field(Header::Topic)?,
            run_id: field(Header::RunId)?,
            run_state: run_state(Header::RunState)?,
            previous_run_state: run_state(Header::PreviousRunState)?,
        })
    }
}
