//! Binary payload schema for outbox events.
//!
//! The payload is a protobuf message so publishers outside this crate can read it:
//!
//! ```text
//! message OutboxRecord {
//!   string foreign_id = 1;
//!   int32 type = 2;
//!   map<string, string> headers = 3;
//! }
//! ```
//!
//! Headers are held in a `BTreeMap`, so map entries are always written in key
//! order and identical messages encode to identical bytes.

use std::collections::BTreeMap;

use bytes::BufMut;
use prost::Message;

use crate::error::OutboxError;

/// The encoded body of an outbox event
#[derive(Clone, PartialEq, Message)]
pub struct OutboxRecord {
    /// Foreign ID of the record that changed status
    #[prost(string, tag = "1")]
    pub foreign_id: String,

    /// Status code the record changed to
    #[prost(int32, tag = "2")]
    pub r#type: i32,

    #[prost(btree_map = "string, string", tag = "3")]
    pub headers: BTreeMap<String, String>,
}

/// Encode a record, optionally refusing payloads larger than `max_bytes`
pub fn encode(record: &OutboxRecord, max_bytes: Option<usize>) -> Result<Vec<u8>, OutboxError> {
    let mut buf = Vec::with_capacity(record.encoded_len());

    match max_bytes {
        Some(limit) => {
            let mut bounded = (&mut buf).limit(limit);
            record.encode(&mut bounded)?;
        }
        None => record.encode(&mut buf)?,
    }

    Ok(buf)
}

/// Decode a payload written by [`encode`]
pub fn decode(data: &[u8]) -> Result<OutboxRecord, OutboxError> {
    Ok(OutboxRecord::decode(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OutboxRecord {
        OutboxRecord {
            foreign_id: "cust-42".to_string(),
            r#type: 3,
            headers: [
                ("topic".to_string(), "onboarding-3".to_string()),
                ("run_id".to_string(), "run-7".to_string()),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn test_wire_layout() {
        let record = OutboxRecord {
            foreign_id: "a".to_string(),
            r#type: 3,
            headers: BTreeMap::new(),
        };

        let data = encode(&record, None).unwrap();
        // field 1 (len-delimited) "a", field 2 (varint) 3
        assert_eq!(data, vec![0x0a, 0x01, b'a', 0x10, 0x03]);
    }

    #[test]
    fn test_decode_encoded_payload() {
        let record = sample();
        let data = encode(&record, None).unwrap();
        assert_eq!(decode(&data).unwrap(), record);
    }

    #[test]
    fn test_limit_at_exact_size_succeeds() {
        let record = sample();
        let len = record.encoded_len();
        let data = encode(&record, Some(len)).unwrap();
        assert_eq!(data.len(), len);
    }

    #[test]
    fn test_limit_below_size_fails() {
        let record = sample();
        let len = record.encoded_len();
        let result = encode(&record, Some(len - 1));
        assert!(matches!(result, Err(OutboxError::Encoding(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(&[0xff, 0xff, 0xff]);
        assert!(matches!(result, Err(OutboxError::Decoding(_))));
    }
}
