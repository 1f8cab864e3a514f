//! Wire types for the document Q&A backend
//!
//! Field names mirror the backend's JSON contract. The backend issues
//! integer ids; the client treats every id as an opaque string and uses a
//! tolerant (de)serializer so both representations round-trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serde adapter for ids that may arrive as JSON numbers or strings.
///
/// Values that parse as integers are written back as numbers so requests
/// match what the backend handed out.
pub(crate) mod opaque_id {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Str(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match IdRepr::deserialize(deserializer)? {
            IdRepr::Num(n) => n.to_string(),
            IdRepr::Str(s) => s,
        })
    }

    pub fn serialize<S>(value: &str, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(value),
        }
    }
}

/// Same adapter for optional ids.
pub(crate) mod opaque_id_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Num(i64),
        Str(String),
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt = Option::<IdRepr>::deserialize(deserializer)?;
        Ok(opt.map(|repr| match repr {
            IdRepr::Num(n) => n.to_string(),
            IdRepr::Str(s) => s,
        }))
    }

    pub fn serialize<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => super::opaque_id::serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}

/// Feedback marker attached to an answered question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    /// Positive marker ("up" on the wire)
    Up,
    /// Negative marker ("down" on the wire)
    Down,
}

/// One chat session as returned by `GET /api/chat/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Opaque session id
    #[serde(with = "opaque_id")]
    pub id: String,
    /// Display title; `None`/placeholder until the first exchange
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_title: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp
    pub updated_at: DateTime<Utc>,
    /// Preview text of the most recent question, if any exchange exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Timestamp of the most recent exchange, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<DateTime<Utc>>,
}

/// One stored question/answer pair from
/// `GET /api/chat/sessions/{id}/history`.
///
/// Expands client-side into two ordered messages (user then assistant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Opaque exchange id
    #[serde(with = "opaque_id")]
    pub id: String,
    /// The user's question text
    pub query: String,
    /// The assistant's answer text
    pub response: String,
    /// When the exchange was stored
    pub created_at: DateTime<Utc>,
    /// Correlation id used to submit feedback for this exchange
    #[serde(default, with = "opaque_id_opt", skip_serializing_if = "Option::is_none")]
    pub query_id: Option<String>,
    /// Previously recorded feedback marker, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

/// One citation attached to an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationRecord {
    /// Opaque citation id
    #[serde(with = "opaque_id")]
    pub id: String,
    /// Source document filename
    pub filename: String,
    /// Page number within the source document
    pub page: i64,
    /// Section heading, when the chunker recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// External link to the source, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Retrieval score
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Name of the collection the source belongs to
    pub collection_name: String,
    /// Short excerpt from the cited chunk
    pub snippet: String,
}

/// Request body for `POST /api/ask`.
///
/// The tuning fields are a snapshot of the caller's settings at send time;
/// `None` lets the backend fall back to the server-side preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequestBody {
    /// The question text
    pub question: String,
    /// Session the exchange belongs to
    #[serde(with = "opaque_id")]
    pub session_id: String,
    /// Number of retrieval results to use
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Generation temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Diversity/relevance balance for retrieval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmr_lambda: Option<f64>,
}

/// Response body for `POST /api/ask`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponseBody {
    /// The generated answer text
    pub answer: String,
    /// Citations backing the answer
    #[serde(default)]
    pub citations: Vec<CitationRecord>,
    /// Suggested follow-up questions
    #[serde(default)]
    pub followups: Vec<String>,
    /// Correlation id for later feedback submission
    #[serde(with = "opaque_id")]
    pub query_id: String,
}

/// Request body for `PATCH /api/chat/sessions/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameBody {
    /// New display title
    pub session_title: String,
}

/// Request body for `POST /api/queries/{query_id}/feedback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackBody {
    /// The marker to record
    pub feedback: Feedback,
}

/// Request body for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Response body for `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token to attach to subsequent calls
    pub token: String,
    /// The authenticated user
    pub user: UserRecord,
}

/// User record as returned by login and `GET /api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    /// Opaque user id
    #[serde(with = "opaque_id")]
    pub id: String,
    /// Account email
    pub email: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Role string ("user", "admin", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_record_accepts_integer_ids() {
        let json = r#"{
            "id": 42,
            "session_title": "New Chat",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:05:00Z",
            "last_message": "hello",
            "last_message_at": "2024-05-01T10:05:00Z"
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.last_message.as_deref(), Some("hello"));
    }

    #[test]
    fn test_session_record_accepts_string_ids() {
        let json = r#"{
            "id": "sess-abc",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:05:00Z"
        }"#;
        let record: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "sess-abc");
        assert!(record.session_title.is_none());
        assert!(record.last_message_at.is_none());
    }

    #[test]
    fn test_ask_request_serializes_numeric_session_id_as_number() {
        let body = AskRequestBody {
            question: "why".to_string(),
            session_id: "7".to_string(),
            top_k: Some(8),
            temperature: None,
            mmr_lambda: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["session_id"], serde_json::json!(7));
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_feedback_wire_values() {
        assert_eq!(serde_json::to_string(&Feedback::Up).unwrap(), "\"up\"");
        assert_eq!(serde_json::to_string(&Feedback::Down).unwrap(), "\"down\"");
        let fb: Feedback = serde_json::from_str("\"down\"").unwrap();
        assert_eq!(fb, Feedback::Down);
    }

    #[test]
    fn test_exchange_record_optional_fields_default() {
        let json = r#"{
            "id": 3,
            "query": "q",
            "response": "a",
            "created_at": "2024-05-01T10:00:00Z"
        }"#;
        let record: ExchangeRecord = serde_json::from_str(json).unwrap();
        assert!(record.query_id.is_none());
        assert!(record.feedback.is_none());
    }

    #[test]
    fn test_ask_response_defaults_empty_collections() {
        let json = r#"{"answer": "text", "query_id": 9}"#;
        let body: AskResponseBody = serde_json::from_str(json).unwrap();
        assert!(body.citations.is_empty());
        assert!(body.followups.is_empty());
        assert_eq!(body.query_id, "9");
    }
}
