//! Errors raised while building or reading outbox payloads.

use thiserror::Error;

use crate::domain::Header;

/// Errors from the outbox translation boundary
#[derive(Debug, Error)]
pub enum OutboxError {
    /// The message could not be serialized; no artifact was produced
    #[error("Failed to encode outbox payload: {0}")]
    Encoding(#[from] prost::EncodeError),

    #[error("Failed to decode outbox payload: {0}")]
    Decoding(#[from] prost::DecodeError),

    #[error("Invalid run state code: {0}")]
    InvalidRunState(i32),

    #[error("Unknown header: {0}")]
    UnknownHeader(String),

    #[error("Missing header: {0}")]
    MissingHeader(Header),

    #[error("Invalid value for header {header}: {value:?}")]
    InvalidHeaderValue { header: Header, value: String },

    #[error("Foreign ID is not numeric: {0:?}")]
    NonNumericForeignId(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
