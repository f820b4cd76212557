//! Boundary to the page-parsing collaborator.
//!
//! Turning a raw forum payload into a structured [`PostRecord`] is someone
//! else's job; the dispatch loop only depends on the [`PostParser`] trait.
//! The shipped [`JsonPostParser`] covers the JSON payload shape; a DOM
//! scraper would slot in behind the same trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A parsed forum post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostRecord {
    pub id: i64,
    pub creation_time: DateTime<Utc>,
    pub author: String,
    pub topic_id: i64,
    pub topic_subforum_id: i64,
    pub body: String,
}

/// Raised when the expected structure is absent from the payload.
#[derive(Debug, Error)]
#[error("failed to parse post payload: {0}")]
pub struct ParseError(pub String);

/// Parses a raw payload into a [`PostRecord`].
pub trait PostParser: Send + Sync {
    fn parse(&self, raw: &str) -> std::result::Result<PostRecord, ParseError>;
}

/// Parser for JSON post payloads.
pub struct JsonPostParser;

impl PostParser for JsonPostParser {
    fn parse(&self, raw: &str) -> std::result::Result<PostRecord, ParseError> {
        serde_json::from_str(raw).map_err(|e| ParseError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_payload() {
        let raw = r#"{
            "id": 9000001,
            "creation_time": "2026-08-01T12:00:00Z",
            "author": "peppy",
            "topic_id": 555,
            "topic_subforum_id": 52,
            "body": "hello world"
        }"#;

        let post = JsonPostParser.parse(raw).unwrap();
        assert_eq!(post.id, 9_000_001);
        assert_eq!(post.author, "peppy");
        assert_eq!(post.topic_subforum_id, 52);
    }

    #[test]
    fn test_parse_missing_field_fails() {
        let raw = r#"{"id": 1}"#;
        let err = JsonPostParser.parse(raw).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_record_roundtrip() {
        let raw = r#"{
            "id": 2,
            "creation_time": "2026-08-01T12:00:00Z",
            "author": "a",
            "topic_id": 1,
            "topic_subforum_id": 1,
            "body": "b"
        }"#;
        let post = JsonPostParser.parse(raw).unwrap();
        let json = serde_json::to_string(&post).unwrap();
        let restored = JsonPostParser.parse(&json).unwrap();
        assert_eq!(post, restored);
    }
}
